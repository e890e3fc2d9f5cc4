use serde::Deserialize;

/// Response of `spreadsheets.values.get`.
#[derive(Debug, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct ValueRange {
    pub range: String,
    /// Missing entirely when the range is empty.
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

/// Response of `files.get` restricted to the fields we request.
#[derive(Debug, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct DriveFile {
    pub modified_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_range() {
        let values: ValueRange =
            serde_json::from_str(r#"{"range": "Metadata!A1:B1000", "majorDimension": "ROWS"}"#)
                .unwrap();

        assert!(values.values.is_empty());
    }

    #[test]
    fn value_range() {
        let values: ValueRange = serde_json::from_str(
            r#"{
                "range": "'2026 Events'!A1:E3",
                "majorDimension": "ROWS",
                "values": [["Date", "Event Name"], ["3/5/2026", "Prayer meeting"], []]
            }"#,
        )
        .unwrap();

        assert_eq!(values.values.len(), 3);
        assert_eq!(values.values[1], ["3/5/2026", "Prayer meeting"]);
    }

    #[test]
    fn drive_file() {
        let file: DriveFile =
            serde_json::from_str(r#"{"modifiedTime": "2026-03-01T10:00:00.000Z"}"#).unwrap();

        assert_eq!(file.modified_time, "2026-03-01T10:00:00.000Z");
    }
}

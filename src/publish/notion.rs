//! Publishing of rendered calendars to Notion pages.
//!
//! The calendar replaces the content of the target page: a single `html` code block holding the
//! rendered fragment is appended, then the blocks the page held before are deleted. The page is
//! expected to be dedicated to the calendar. A failed append leaves the previous calendar in place;
//! blocks left over by a failed delete are removed by the next run.

use super::Publisher;
use crate::calendar::metadata::CalendarMetadata;
use crate::calendar::CalendarTarget;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Maximum number of characters in a single rich text object.
const MAX_TEXT_LENGTH: usize = 2000;

/// Maximum number of rich text objects in a single block.
const MAX_TEXT_SEGMENTS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    /// Error while making a http request.
    #[error("failure requesting remote resource: {0}")]
    Request(#[from] reqwest::Error),

    /// Error while building http headers.
    #[error("encountered invalid HTTP header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    /// Error when `NOTION_TOKEN` environment variable is not set.
    #[error("missing required environment variable `NOTION_TOKEN`")]
    MissingToken,

    /// The rendered calendar doesn't fit into a single code block.
    #[error("calendar is too large for a Notion code block ({0} characters)")]
    TooLarge(usize),
}

#[derive(Debug, Deserialize)]
struct BlockList {
    results: Vec<Block>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Block {
    id: String,
}

/// Block operations used to replace the content of a page.
#[async_trait]
trait PageBlocks: Send + Sync {
    async fn list_children(&self, block_id: &str) -> Result<Vec<Block>, NotionError>;

    async fn append_children(&self, block_id: &str, children: Value) -> Result<(), NotionError>;

    async fn delete_block(&self, block_id: &str) -> Result<(), NotionError>;
}

/// Thin client for the Notion blocks API.
#[derive(Debug)]
struct NotionClient {
    client: reqwest::Client,
}

impl NotionClient {
    fn new(token: &str) -> Result<NotionClient, NotionError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert("notion-version", HeaderValue::from_static(NOTION_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(NotionClient { client })
    }
}

#[async_trait]
impl PageBlocks for NotionClient {
    async fn list_children(&self, block_id: &str) -> Result<Vec<Block>, NotionError> {
        let url = format!("{NOTION_API}/blocks/{block_id}/children");
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("page_size", "100")]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("start_cursor", cursor)]);
            }

            let page = request
                .send()
                .await?
                .error_for_status()?
                .json::<BlockList>()
                .await?;

            blocks.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => return Ok(blocks),
            }
        }
    }

    async fn append_children(&self, block_id: &str, children: Value) -> Result<(), NotionError> {
        self.client
            .patch(format!("{NOTION_API}/blocks/{block_id}/children"))
            .json(&json!({ "children": children }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), NotionError> {
        self.client
            .delete(format!("{NOTION_API}/blocks/{block_id}"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Appends `block` to the page, then deletes the blocks the page held before, waiting `delay`
/// before each delete. Returns the number of deleted blocks.
async fn replace_children<B>(
    blocks: &B,
    page_id: &str,
    block: Value,
    delay: Duration,
) -> Result<usize, NotionError>
where
    B: PageBlocks + ?Sized,
{
    let existing = blocks.list_children(page_id).await?;

    blocks.append_children(page_id, json!([block])).await?;

    for child in &existing {
        tokio::time::sleep(delay).await;
        blocks.delete_block(&child.id).await?;
    }

    Ok(existing.len())
}

/// Publishes calendars to the Notion page of their target.
#[derive(Debug)]
pub struct NotionPublisher {
    client: NotionClient,
    delay: Duration,
}

impl NotionPublisher {
    /// Creates a new publisher using the integration token from the `NOTION_TOKEN` environment
    /// variable. `delay` is waited between block deletions.
    pub fn new(delay: Duration) -> Result<NotionPublisher> {
        let token = std::env::var("NOTION_TOKEN").map_err(|_| NotionError::MissingToken)?;
        Ok(NotionPublisher::with_token(&token, delay)?)
    }

    pub fn with_token(token: &str, delay: Duration) -> Result<NotionPublisher, NotionError> {
        Ok(NotionPublisher {
            client: NotionClient::new(token)?,
            delay,
        })
    }
}

#[async_trait]
impl Publisher for NotionPublisher {
    async fn publish(
        &self,
        target: &CalendarTarget,
        html: &str,
        metadata: &CalendarMetadata,
        modified_time: &str,
    ) -> Result<()> {
        let block = code_block(html, &caption(metadata, modified_time))?;

        let replaced =
            replace_children(&self.client, &target.notion_page, block, self.delay).await?;
        log::debug!(
            "replaced {} blocks of Notion page {}",
            replaced,
            target.notion_page
        );

        log::info!("published calendar {target} to Notion");
        Ok(())
    }
}

fn caption(metadata: &CalendarMetadata, modified_time: &str) -> String {
    if modified_time.is_empty() {
        format!("Updated on {}", metadata.updated)
    } else {
        format!(
            "Updated on {} (sheet modified {})",
            metadata.updated, modified_time
        )
    }
}

/// Builds an `html` code block. Notion limits the length of a rich text object, so the content
/// is split into several.
fn code_block(html: &str, caption: &str) -> Result<Value, NotionError> {
    let segments = split_text(html, MAX_TEXT_LENGTH);

    if segments.len() > MAX_TEXT_SEGMENTS {
        return Err(NotionError::TooLarge(html.chars().count()));
    }

    let rich_text: Vec<Value> = segments.into_iter().map(text).collect();

    Ok(json!({
        "object": "block",
        "type": "code",
        "code": {
            "language": "html",
            "rich_text": rich_text,
            "caption": [text(caption)],
        }
    }))
}

fn text(content: &str) -> Value {
    json!({ "type": "text", "text": { "content": content } })
}

/// Splits `s` into pieces of at most `max_chars` characters.
fn split_text(s: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = s;

    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        let (piece, tail) = rest.split_at(end);
        pieces.push(piece);
        rest = tail;
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// A fake page which records block operations.
    #[derive(Default)]
    struct RecordedPage {
        children: Vec<&'static str>,
        fail_append: bool,
        fail_delete: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordedPage {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageBlocks for RecordedPage {
        async fn list_children(&self, block_id: &str) -> Result<Vec<Block>, NotionError> {
            self.calls.lock().unwrap().push(format!("list {block_id}"));
            Ok(self
                .children
                .iter()
                .map(|id| Block { id: id.to_string() })
                .collect())
        }

        async fn append_children(
            &self,
            block_id: &str,
            children: Value,
        ) -> Result<(), NotionError> {
            self.calls.lock().unwrap().push(format!(
                "append {block_id} {}",
                children.as_array().map(Vec::len).unwrap_or_default()
            ));
            if self.fail_append {
                return Err(NotionError::TooLarge(0));
            }
            Ok(())
        }

        async fn delete_block(&self, block_id: &str) -> Result<(), NotionError> {
            self.calls.lock().unwrap().push(format!("delete {block_id}"));
            if self.fail_delete == Some(block_id) {
                return Err(NotionError::TooLarge(0));
            }
            Ok(())
        }
    }

    fn block() -> Value {
        code_block("<main></main>", "Updated on 3/5/2026").unwrap()
    }

    #[tokio::test]
    async fn appends_before_deleting_old_blocks() {
        let page = RecordedPage {
            children: vec!["a", "b"],
            ..Default::default()
        };

        let deleted = replace_children(&page, "page", block(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(
            page.calls(),
            ["list page", "append page 1", "delete a", "delete b"]
        );
    }

    #[tokio::test]
    async fn failed_append_keeps_old_blocks() {
        let page = RecordedPage {
            children: vec!["a", "b"],
            fail_append: true,
            ..Default::default()
        };

        let result = replace_children(&page, "page", block(), Duration::ZERO).await;

        assert!(result.is_err());
        assert_eq!(page.calls(), ["list page", "append page 1"]);
    }

    #[tokio::test]
    async fn failed_delete_stops_after_append() {
        let page = RecordedPage {
            children: vec!["a", "b", "c"],
            fail_delete: Some("b"),
            ..Default::default()
        };

        let result = replace_children(&page, "page", block(), Duration::ZERO).await;

        assert!(result.is_err());
        assert_eq!(
            page.calls(),
            ["list page", "append page 1", "delete a", "delete b"]
        );
    }

    #[tokio::test]
    async fn waits_between_deletes() {
        let page = RecordedPage {
            children: vec!["a", "b"],
            ..Default::default()
        };

        let started = tokio::time::Instant::now();
        replace_children(&page, "page", block(), Duration::from_millis(20))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn empty_page() {
        let page = RecordedPage::default();

        let deleted = replace_children(&page, "page", block(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(page.calls(), ["list page", "append page 1"]);
    }

    #[test]
    fn split_text_on_char_boundaries() {
        assert_eq!(split_text("", 3), Vec::<&str>::new());
        assert_eq!(split_text("abcdefg", 3), ["abc", "def", "g"]);
        assert_eq!(split_text("主日崇拜聚會", 4), ["主日崇拜", "聚會"]);
    }

    #[test]
    fn code_block_segments() {
        let html = "x".repeat(MAX_TEXT_LENGTH + 1);
        let block = code_block(&html, "Updated on 3/5/2026").unwrap();

        let rich_text = block["code"]["rich_text"].as_array().unwrap();
        assert_eq!(rich_text.len(), 2);
        assert_eq!(
            rich_text[1]["text"]["content"].as_str(),
            Some("x")
        );
        assert_eq!(block["code"]["language"], "html");
        assert_eq!(
            block["code"]["caption"][0]["text"]["content"],
            "Updated on 3/5/2026"
        );
    }

    #[test]
    fn code_block_too_large() {
        let html = "x".repeat(MAX_TEXT_LENGTH * MAX_TEXT_SEGMENTS + 1);

        assert!(matches!(
            code_block(&html, ""),
            Err(NotionError::TooLarge(_))
        ));
    }

    #[test]
    fn captions() {
        let metadata = CalendarMetadata::fallback(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());

        assert_eq!(caption(&metadata, ""), "Updated on 3/5/2026");
        assert_eq!(
            caption(&metadata, "2026-03-01T10:00:00Z"),
            "Updated on 3/5/2026 (sheet modified 2026-03-01T10:00:00Z)"
        );
    }
}

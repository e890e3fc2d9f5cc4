pub mod models;
pub mod records;

use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use http::Extensions;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION};
use reqwest::{Request, Response, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use std::sync::Arc;
use std::time::Duration;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";

const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/drive.metadata.readonly",
];

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Error while authenticating with google.
    #[error("failed to authenticate: {0}")]
    GCloudAuth(#[from] google_cloud_auth::error::Error),

    /// Error while making a http request.
    #[error("failure requesting remote resource: {0}")]
    Request(#[from] reqwest::Error),

    /// Error while executing some middleware code.
    #[error("request middleware failed with: {0}")]
    RequestMiddleware(#[from] reqwest_middleware::Error),

    /// Error while building http headers.
    #[error("encountered invalid HTTP header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    /// Error while building a request URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// Error while parsing a JSON response.
    #[error("failed to parse response as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Error while obtaining an authentication token.
    #[error("failed to obtain authentication token: {0}")]
    Token(String),
}

impl From<ClientError> for reqwest_middleware::Error {
    fn from(err: ClientError) -> Self {
        reqwest_middleware::Error::Middleware(anyhow::Error::new(err))
    }
}

struct AuthMiddleware {
    token_source: Arc<dyn TokenSource>,
}

impl AuthMiddleware {
    fn new(token_source: Arc<dyn TokenSource>) -> AuthMiddleware {
        AuthMiddleware { token_source }
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self
            .token_source
            .token()
            .await
            .map_err(|err| ClientError::Token(err.to_string()))?;

        let mut header = HeaderValue::try_from(token).map_err(ClientError::from)?;
        header.set_sensitive(true);
        req.headers_mut().insert(AUTHORIZATION, header);
        next.run(req, extensions).await
    }
}

/// Read-only client for the Google Sheets and Drive APIs.
#[derive(Debug)]
pub struct GoogleSheetsClient {
    client: ClientWithMiddleware,
}

impl GoogleSheetsClient {
    /// Create a new client. Service account credentials are looked up from the environment,
    /// either via the GOOGLE_APPLICATION_CREDENTIALS variable pointing to the json key file
    /// generated in the google cloud console or via the GOOGLE_APPLICATION_CREDENTIALS_JSON
    /// variable containing the content of said json file.
    pub async fn new() -> Result<GoogleSheetsClient, ClientError> {
        let config = google_cloud_auth::project::Config::default().with_scopes(&SCOPES);

        let token_source = DefaultTokenSourceProvider::new(config)
            .await?
            .token_source();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_str("gzip")?);

        let client = ClientBuilder::new(
            reqwest::Client::builder()
                .default_headers(headers)
                .timeout(Duration::from_secs(10))
                .build()?,
        )
        .with(AuthMiddleware::new(token_source))
        .build();

        Ok(GoogleSheetsClient { client })
    }

    /// Fetches the cell values of `range` (A1 notation, e.g. `Events!A1:E`) as rows of strings.
    /// Trailing empty cells are omitted by the API, so rows may have different lengths.
    pub async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, ClientError> {
        let url = values_url(spreadsheet_id, range)?;

        let values = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<models::ValueRange>()
            .await?;

        log::debug!("fetched {} rows from {}", values.values.len(), values.range);

        Ok(values.values)
    }

    /// Fetches the last modification time of a spreadsheet as an RFC 3339 string.
    pub async fn get_modified_time(&self, spreadsheet_id: &str) -> Result<String, ClientError> {
        let url = file_url(spreadsheet_id)?;

        let file = self
            .client
            .get(url)
            .query(&[("fields", "modifiedTime")])
            .send()
            .await?
            .error_for_status()?
            .json::<models::DriveFile>()
            .await?;

        Ok(file.modified_time)
    }
}

/// Builds the URL of a `spreadsheets.values.get` request. Tab names may contain spaces and
/// non-ASCII characters, so the range is added as an encoded path segment.
fn values_url(spreadsheet_id: &str, range: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(SHEETS_API).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;

    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(SHEETS_API.to_owned()))?
        .extend([spreadsheet_id, "values", range]);

    Ok(url)
}

fn file_url(file_id: &str) -> Result<Url, ClientError> {
    let mut url =
        Url::parse(DRIVE_FILES_API).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;

    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(DRIVE_FILES_API.to_owned()))?
        .push(file_id);

    Ok(url)
}

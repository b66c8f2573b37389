//! HTTP gateway to a Philomena-style booru search API.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::searchbot::error::SearchError;
use crate::searchbot::query::TagQuery;

const USER_AGENT: &str = "Boorubot for Telegram";

/// File extensions treated as video containers when picking media.
const VIDEO_TYPES: &[&str] = &["webm", "mp4"];

/// Scaled representations of one image result.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Representations {
    pub full: String,
    pub medium: String,
    pub large: String,
}

/// One image result from the search API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ImageResult {
    pub id: i64,
    pub score: i64,
    pub representations: Representations,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    images: Vec<ImageResult>,
}

/// A representation chosen for delivery to the chat surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Media {
    Still(String),
    Video(String),
}

impl Media {
    pub fn url(&self) -> &str {
        match self {
            Self::Still(url) | Self::Video(url) => url,
        }
    }
}

impl ImageResult {
    /// Pick a playable representation for the chat surface.
    ///
    /// Full-resolution video containers are swapped for the medium
    /// representation to avoid oversized or unsupported uploads; stills
    /// use the large representation.
    pub fn display_media(&self) -> Media {
        let extension = self
            .representations
            .full
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();

        if VIDEO_TYPES.contains(&extension.as_str()) {
            Media::Video(self.representations.medium.clone())
        } else {
            Media::Still(self.representations.large.clone())
        }
    }
}

/// Backend seam for the engine: tag search and reverse image search.
pub trait SearchBackend {
    fn search_tags(
        &self,
        query: &TagQuery,
    ) -> impl Future<Output = Result<Vec<ImageResult>, SearchError>> + Send;

    fn search_reverse(
        &self,
        image_url: &str,
        distance: f64,
    ) -> impl Future<Output = Result<Vec<ImageResult>, SearchError>> + Send;
}

/// Connection settings for the live API client.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// API hostname without scheme or trailing slash.
    pub host: String,
    /// API key; empty means anonymous access.
    pub api_key: String,
    /// Content-filter id attached to every request.
    pub filter_id: u32,
    /// Emit warn-level logs for failed API calls.
    pub verbose_errors: bool,
    pub timeout: std::time::Duration,
    pub proxy: Option<String>,
}

/// Live API client. Every call is a fresh round trip: no retries, no cache.
pub struct PhilomenaClient {
    settings: GatewaySettings,
    client: reqwest::Client,
}

impl PhilomenaClient {
    pub fn new(settings: GatewaySettings) -> Result<Self, String> {
        let mut builder = reqwest::Client::builder().timeout(settings.timeout);

        if let Some(ref proxy) = settings.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| format!("Invalid proxy: {e}"))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, kind: &str) -> String {
        format!("https://{}/api/v1/json/search/{}", self.settings.host, kind)
    }

    fn map_error(&self, context: &str, message: String) -> SearchError {
        if self.settings.verbose_errors {
            warn!("API error ({context}): {message}");
        }
        SearchError::Api(message)
    }

    async fn read_images(&self, context: &str, response: reqwest::Response) -> Result<Vec<ImageResult>, SearchError> {
        let status = response.status();
        debug!("{context} response status: {status}");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SearchError::NoMatch);
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_error(context, format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(self.map_error(context, format!("API error {status}: {body}")));
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| self.map_error(context, format!("failed to parse response: {e}")))?;

        if parsed.images.is_empty() {
            return Err(SearchError::NoMatch);
        }

        Ok(parsed.images)
    }
}

impl SearchBackend for PhilomenaClient {
    /// Read-style query against the `images` endpoint.
    async fn search_tags(&self, query: &TagQuery) -> Result<Vec<ImageResult>, SearchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.expression()),
            ("per_page", query.options.per_page.to_string()),
            ("page", query.options.page.to_string()),
            ("sf", query.options.sort_field.clone()),
            ("sd", query.options.sort_dir.clone()),
            ("filter_id", self.settings.filter_id.to_string()),
        ];
        if !self.settings.api_key.is_empty() {
            params.push(("key", self.settings.api_key.clone()));
        }

        let response = self
            .client
            .get(self.endpoint("images"))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.map_error("images", e.to_string()))?;

        self.read_images("images", response).await
    }

    /// Submit-style query against the `reverse` endpoint, body-encoded.
    async fn search_reverse(&self, image_url: &str, distance: f64) -> Result<Vec<ImageResult>, SearchError> {
        let mut body = format!(
            "url={}&distance={}",
            urlencoding::encode(image_url),
            distance
        );
        if !self.settings.api_key.is_empty() {
            body.push_str(&format!("&key={}", urlencoding::encode(&self.settings.api_key)));
        }

        let response = self
            .client
            .post(self.endpoint("reverse"))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .query(&[("filter_id", self.settings.filter_id.to_string())])
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_error("reverse", e.to_string()))?;

        self.read_images("reverse", response).await
    }
}

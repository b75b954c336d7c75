//! Earthquake feed client.
//!
//! Provides async HTTP access to the USGS summary feeds.
//! Uses reqwest with rustls for TLS.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::errors::FetchError;
use crate::models::{FeatureCollection, SeismicEvent};

/// Default request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakemap/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
pub const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Time window of the feed being viewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Hour,
    #[default]
    Day,
    Week,
}

impl TimeRange {
    /// Every range, in selector order.
    pub const ALL: [Self; 3] = [Self::Hour, Self::Day, Self::Week];

    /// Form value and CLI spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }

    /// Label shown in the time-range selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hour => "Past hour",
            Self::Day => "Past day",
            Self::Week => "Past week",
        }
    }

    /// Summary feed file name for this range.
    #[must_use]
    pub const fn feed_name(self) -> &'static str {
        match self {
            Self::Hour => "all_hour",
            Self::Day => "all_day",
            Self::Week => "all_week",
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            _ => Err(format!("unknown time range: {s} (expected: hour, day, week)")),
        }
    }
}

/// Anything that can produce a batch of events for a time range.
///
/// The controller is generic over this so loads can be scripted in tests.
///
/// The controller cancels a superseded load by aborting its task, so an
/// implementation never has to notice supersession itself. A source that
/// gives up on its own (a dropped upstream channel, a shutdown) reports
/// [`FetchError::Cancelled`], which leaves the store untouched and is never
/// shown to the user. [`FeedClient`] has no such path.
pub trait FeedSource: Send + Sync + 'static {
    fn load(
        &self,
        range: TimeRange,
    ) -> impl Future<Output = Result<Vec<SeismicEvent>, FetchError>> + Send;
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: USGS_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Client for the USGS summary feeds.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    base_url: String,
}

impl FeedClient {
    /// Create a new feed client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL for a time range.
    #[must_use]
    pub fn endpoint(&self, range: TimeRange) -> String {
        format!(
            "{}/earthquakes/feed/v1.0/summary/{}.geojson",
            self.base_url,
            range.feed_name()
        )
    }

    /// Fetch and normalize the feed for a time range.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the feed answers with a
    /// non-success status, or the body is not a feature collection.
    #[instrument(skip(self), fields(range = range.as_str()))]
    pub async fn fetch(&self, range: TimeRange) -> Result<Vec<SeismicEvent>, FetchError> {
        let url = self.endpoint(range);

        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.bytes().await?;
        let feed: FeatureCollection = serde_json::from_slice(&body)?;
        feed.validate()?;

        if let Some(meta) = &feed.metadata {
            debug!(
                title = meta.title.as_deref().unwrap_or("untitled"),
                reported = ?meta.count,
                "feed metadata"
            );
        }

        let events = feed.into_events();
        debug!("fetched {} events", events.len());
        Ok(events)
    }
}

impl FeedSource for FeedClient {
    fn load(
        &self,
        range: TimeRange,
    ) -> impl Future<Output = Result<Vec<SeismicEvent>, FetchError>> + Send {
        self.fetch(range)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Round, RoundId, Stop, StopId},
    error::{ApiError, ErrorCode},
    protocol::{DistributionRow, TourneeRow, ValidatedAtPatch},
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub mod query;
pub mod subscriber;

pub use query::Query;

pub const DEFAULT_API_BASE_URL: &str = "https://api.neotech.fr";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} answered HTTP {status}: {error}")]
    Status {
        endpoint: String,
        status: u16,
        error: ApiError,
    },
    #[error("could not decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// True when the failure comes from the network or an unavailable upstream
    /// rather than from the data itself.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ClientError::Transport { .. } => true,
            ClientError::Status { error, .. } => error.code == ErrorCode::Unavailable,
            _ => false,
        }
    }
}

/// Tour/stop data as the driver app needs it.
#[async_trait]
pub trait RoundDataProvider: Send + Sync {
    async fn list_rounds(&self) -> Result<Vec<Round>, ClientError>;
    /// Stops of `round_id` in delivery order. An empty list is a valid answer.
    async fn list_stops(&self, round_id: RoundId) -> Result<Vec<Stop>, ClientError>;
    async fn mark_stop_validated(
        &self,
        stop_id: StopId,
        validated_at: DateTime<Utc>,
    ) -> Result<(), ClientError>;
}

/// Thin client over a PostgREST endpoint.
#[derive(Clone)]
pub struct PostgrestClient {
    http: Client,
    base_url: Url,
}

impl PostgrestClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.trim()).map_err(|err| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "expected an http(s) url".into(),
            });
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, table: &str, query: &Query) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot append table path".into(),
            })?
            .pop_if_empty()
            .push(table);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.params());
        }
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        query: &Query,
    ) -> Result<(Url, RequestBuilder), ClientError> {
        let url = self.endpoint(table, query)?;
        let builder = self
            .http
            .request(method, url.clone())
            .header(header::ACCEPT, "application/json");
        Ok((url, builder))
    }

    async fn send(url: &Url, builder: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let endpoint = url.to_string();
        let response = builder
            .send()
            .await
            .map_err(|err| ClientError::transport(&endpoint, err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            endpoint,
            status: status.as_u16(),
            error: ApiError::from_response(status.as_u16(), &body),
        })
    }

    /// `GET /<table>?<query>`, decoding the JSON array PostgREST returns.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, ClientError> {
        let (url, builder) = self.request(Method::GET, table, query)?;
        debug!(endpoint = %url, "postgrest select");
        let response = Self::send(&url, builder).await?;
        response.json::<Vec<T>>().await.map_err(|err| ClientError::Decode {
            endpoint: url.to_string(),
            message: err.to_string(),
        })
    }

    pub async fn select_first<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Option<T>, ClientError> {
        Ok(self.select(table, query).await?.into_iter().next())
    }

    /// `PATCH /<table>?<query>` with `Prefer: return=minimal`.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        table: &str,
        query: &Query,
        body: &B,
    ) -> Result<(), ClientError> {
        let (url, builder) = self.request(Method::PATCH, table, query)?;
        let builder = builder.header("Prefer", "return=minimal").json(body);
        debug!(endpoint = %url, "postgrest patch");
        Self::send(&url, builder).await?;
        Ok(())
    }
}

#[async_trait]
impl RoundDataProvider for PostgrestClient {
    async fn list_rounds(&self) -> Result<Vec<Round>, ClientError> {
        let rows: Vec<TourneeRow> = self.select("tournee", &Query::new()).await?;
        Ok(rows.into_iter().map(Round::from).collect())
    }

    async fn list_stops(&self, round_id: RoundId) -> Result<Vec<Stop>, ClientError> {
        let query = Query::new().eq("tournee_id", round_id).order_asc("ordre");
        let rows: Vec<DistributionRow> = self.select("distribution", &query).await?;
        Ok(rows.into_iter().map(Stop::from).collect())
    }

    async fn mark_stop_validated(
        &self,
        stop_id: StopId,
        validated_at: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let query = Query::new().eq("id", stop_id);
        self.patch("distribution", &query, &ValidatedAtPatch { validated_at })
            .await?;
        info!(stop_id = stop_id.0, %validated_at, "stop validation recorded");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

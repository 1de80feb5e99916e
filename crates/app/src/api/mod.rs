//! Client for the warranty backend.
//!
//! # Endpoints
//!
//! - `GET /get_warranties?user_id=<key>`: warranties recorded for the account
//! - `POST /warranties`: save a warranty
//! - `GET /get_recommendation?user_id=<key>`: suggested products
//! - `GET /health`: liveness
//!
//! Every account-scoped call takes a [`Session`], so requests can only be made
//! for an account whose key has been resolved.

mod payload;

pub use payload::{
    DEFAULT_COVERAGE_DAYS, DEFAULT_ICON, PayloadError, Recommendation, WarrantyPayload,
};

use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use thiserror::Error;
use url::Url;
use warranty_core::{
    Classification, LocalAccountKey, StatusBreakdown, StatusPolicy, Warranty,
};

use crate::config::ApiConfig;
use crate::session::Session;
use payload::{RecommendationsResponse, SubmitWarranty, WarrantiesResponse};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Warranties fetched for an account.
#[derive(Debug, Clone, Default)]
pub struct WarrantyListing {
    /// Records that passed validation, in backend order.
    pub warranties: Vec<Warranty>,
    /// Number of records skipped as invalid.
    pub rejected: usize,
}

impl WarrantyListing {
    /// Classify every warranty as of `now`.
    pub fn classified<'a>(
        &'a self,
        now: NaiveDate,
        policy: &'a StatusPolicy,
    ) -> impl Iterator<Item = (&'a Warranty, Classification)> + 'a {
        self.warranties
            .iter()
            .map(move |warranty| (warranty, warranty.classify(now, policy)))
    }

    /// Status counts as of `now`.
    #[must_use]
    pub fn breakdown(&self, now: NaiveDate, policy: &StatusPolicy) -> StatusBreakdown {
        self.classified(now, policy)
            .map(|(_, classification)| classification.status)
            .collect()
    }
}

/// Warranty backend client.
#[derive(Debug, Clone)]
pub struct WarrantyApiClient {
    inner: Arc<WarrantyApiClientInner>,
}

#[derive(Debug)]
struct WarrantyApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl WarrantyApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        // Joining onto a base without a trailing slash would drop its last segment
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(WarrantyApiClientInner { client, base_url }),
        })
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Fetch the account's warranties.
    ///
    /// Invalid records are skipped and counted in [`WarrantyListing::rejected`].
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not a warranty list.
    #[tracing::instrument(skip(self, session), fields(account_key = %session.account_key()))]
    pub async fn fetch_warranties(&self, session: &Session) -> Result<WarrantyListing, ApiError> {
        let url = self.account_endpoint("get_warranties", session.account_key())?;
        let body: WarrantiesResponse = self.get(url).await?;

        let mut listing = WarrantyListing::default();
        for (index, raw) in body.warranties.into_iter().enumerate() {
            let parsed = serde_json::from_value::<WarrantyPayload>(raw)
                .map_err(|e| e.to_string())
                .and_then(|payload| Warranty::try_from(payload).map_err(|e| e.to_string()));
            match parsed {
                Ok(warranty) => listing.warranties.push(warranty),
                Err(reason) => {
                    tracing::info!(index, reason = %reason, "Skipping invalid warranty record");
                    listing.rejected += 1;
                }
            }
        }

        tracing::debug!(
            accepted = listing.warranties.len(),
            rejected = listing.rejected,
            "Fetched warranties"
        );
        Ok(listing)
    }

    /// Save a warranty for the account.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[tracing::instrument(skip(self, session, warranty), fields(account_key = %session.account_key()))]
    pub async fn submit_warranty(
        &self,
        session: &Session,
        warranty: &Warranty,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("warranties")?;
        let body = SubmitWarranty {
            user_id: session.account_key(),
            warranty,
        };

        let response = self.inner.client.post(url).json(&body).send().await?;
        if response.status().is_success() {
            tracing::info!(product = %warranty.product(), "Warranty submitted");
            return Ok(());
        }

        Err(Self::parse_error(response).await)
    }

    /// Fetch product recommendations for the account.
    ///
    /// An account with no history yields an empty list. Malformed items are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body cannot be parsed.
    #[tracing::instrument(skip(self, session), fields(account_key = %session.account_key()))]
    pub async fn fetch_recommendations(
        &self,
        session: &Session,
    ) -> Result<Vec<Recommendation>, ApiError> {
        let url = self.account_endpoint("get_recommendation", session.account_key())?;
        let body: RecommendationsResponse = self.get(url).await?;

        if body.recommendations.is_empty()
            && let Some(message) = &body.message
        {
            tracing::debug!(message = %message, "No recommendations");
        }
        let (recommendations, rejected) = body.into_recommendations();
        tracing::debug!(
            accepted = recommendations.len(),
            rejected,
            "Fetched recommendations"
        );
        Ok(recommendations)
    }

    /// Check whether the backend is up.
    ///
    /// # Errors
    ///
    /// Returns error only if the backend could not be reached at all.
    pub async fn health(&self) -> Result<bool, ApiError> {
        let url = self.endpoint("health")?;
        let response = self.inner.client.get(url).send().await?;
        let healthy = response.status().is_success();
        if !healthy {
            tracing::warn!(status = response.status().as_u16(), "Backend unhealthy");
        }
        Ok(healthy)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn account_endpoint(&self, path: &str, account_key: LocalAccountKey) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("user_id", &account_key.to_string());
        Ok(url)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.inner.client.get(url).send().await?;
        Self::handle_response(response).await
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Turn an error response into [`ApiError::Status`].
    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        // The backend reports errors as {"error": "..."}
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(text);

        ApiError::Status { status, message }
    }
}

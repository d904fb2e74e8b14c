use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use crate::config::ClientSettings;
use crate::data_models::SearchResponse;
use crate::query::build_url;

/// Any way a fetch can fail. All variants are handled the same by the session.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("search service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search service answered with status {0}")]
    Status(StatusCode),

    #[error("malformed search response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The remote search operation: one query in, one page of results out.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &[(&'static str, String)]) -> Result<SearchResponse, FetchError>;
}

pub struct HttpSearchService {
    client: reqwest::Client,
    server: Url,
    endpoint: String,
}

impl HttpSearchService {
    pub fn new(
        server: Url,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            server,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, FetchError> {
        Self::new(
            settings.server_host.clone(),
            settings.endpoint.clone(),
            settings.timeout,
        )
    }

    pub fn url_for(&self, query: &[(&'static str, String)]) -> Url {
        build_url(&self.server, &self.endpoint, query)
    }
}

#[async_trait]
impl SearchService for HttpSearchService {
    async fn search(&self, query: &[(&'static str, String)]) -> Result<SearchResponse, FetchError> {
        let url = self.url_for(query);
        log::debug!("GET {url}");

        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = res.bytes().await?;
        let response = serde_json::from_slice::<SearchResponse>(&body)?;
        Ok(response)
    }
}

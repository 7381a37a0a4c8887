use async_trait::async_trait;
use lexcite_core::{
    api::SourceApi,
    config::Config,
    events::{AuthEvent, EventBus},
    ExpandRequest, ExpandedSource, Section,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

const USER_AGENT: &str = concat!("lexcite-client/", env!("CARGO_PKG_VERSION"));

/// Client for the document API's section and source-expansion endpoints.
pub struct LexClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
    auth_events: Option<EventBus<AuthEvent>>,
}

impl LexClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            auth_events: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = Self {
            http: builder.build().unwrap_or_default(),
            ..Self::new(&config.api_url)
        };
        if config.api_token.is_empty() {
            client
        } else {
            client.with_token(&config.api_token)
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Publish `AuthEvent::Unauthorized` here whenever the backend answers 401.
    pub fn with_auth_events(mut self, events: EventBus<AuthEvent>) -> Self {
        self.auth_events = Some(events);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one section. A 404 is a miss, not an error.
    pub async fn get_section(&self, document_id: &str, section_id: &str) -> Result<Option<Section>> {
        let path = format!(
            "/documents/{}/sections/{}",
            urlencoding::encode(document_id),
            urlencoding::encode(section_id)
        );
        let resp = self
            .send(self.http.get(format!("{}{path}", self.base_url)), &path)
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(document_id, section_id, "section not found");
            return Ok(None);
        }
        let resp = check_status(resp, &path).await?;
        decode(resp, &path).await.map(Some)
    }

    /// Ask the backend to widen a truncated excerpt.
    pub async fn expand_source(&self, request: &ExpandRequest) -> Result<ExpandedSource> {
        let path = format!(
            "/documents/{}/expand-source",
            urlencoding::encode(&request.document_id)
        );
        let resp = self
            .send(
                self.http
                    .post(format!("{}{path}", self.base_url))
                    .json(request),
                &path,
            )
            .await?;
        let resp = check_status(resp, &path).await?;
        decode(resp, &path).await
    }

    async fn send(&self, req: RequestBuilder, path: &str) -> Result<Response> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req.send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "document API rejected credentials");
            if let Some(events) = &self.auth_events {
                events.emit(AuthEvent::Unauthorized {
                    path: path.to_string(),
                });
            }
            return Err(ClientError::Unauthorized {
                path: path.to_string(),
            });
        }
        Ok(resp)
    }
}

async fn check_status(resp: Response, path: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        path: path.to_string(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(resp: Response, path: &str) -> Result<T> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
        path: path.to_string(),
        source,
    })
}

#[async_trait]
impl SourceApi for LexClient {
    async fn fetch_section(
        &self,
        document_id: &str,
        section_id: &str,
    ) -> anyhow::Result<Option<Section>> {
        Ok(self.get_section(document_id, section_id).await?)
    }

    async fn expand_source(&self, request: &ExpandRequest) -> anyhow::Result<ExpandedSource> {
        Ok(LexClient::expand_source(self, request).await?)
    }
}

// HTTP implementation of the chat endpoints

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tutorly_types::{HistoryPage, PreviewDto, SocketToken, ThreadId, UserId};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::traits::ChatApi;

#[derive(Serialize)]
struct GetOrCreateChatBody {
    other_user_id: UserId,
}

/// Chat API client (reqwest, JSON bodies, bearer auth)
pub struct HttpChatApi {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpChatApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidToken)?,
            );
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        // Url::join drops the last path segment unless the base ends with '/'
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn history_url(
        &self,
        thread_id: ThreadId,
        limit: usize,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<Url> {
        let mut url = self.endpoint(&format!("chats/{}/messages/", thread_id))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(before) = created_before {
                query.append_pair(
                    "created_before",
                    &before.to_rfc3339_opts(SecondsFormat::Micros, true),
                );
            }
        }
        Ok(url)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Chat API returned {}: {}", status, body);
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_previews(&self) -> Result<Vec<PreviewDto>> {
        let url = self.endpoint("chats/previews/")?;
        let response = self.http_client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn fetch_history(
        &self,
        thread_id: ThreadId,
        limit: usize,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<HistoryPage> {
        let url = self.history_url(thread_id, limit, created_before)?;
        tracing::debug!("Fetching history: {}", url);
        let response = self.http_client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn mark_read(&self, thread_id: ThreadId) -> Result<()> {
        let url = self.endpoint(&format!("chats/{}/mark-read/", thread_id))?;
        let response = self.http_client.post(url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn get_or_create_chat(&self, other_user_id: UserId) -> Result<PreviewDto> {
        let url = self.endpoint("chats/get-or-create/")?;
        let response = self
            .http_client
            .post(url)
            .json(&GetOrCreateChatBody { other_user_id })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn socket_token(&self) -> Result<String> {
        let url = self.endpoint("chats/socket-token/")?;
        let response = self.http_client.post(url).send().await?;
        let token: SocketToken = Self::decode(response).await?;
        Ok(token.access_token)
    }
}

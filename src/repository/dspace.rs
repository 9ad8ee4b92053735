//! `reqwest`-backed [`RepositoryClient`] implementation talking to a DSpace
//! REST API: a single `Client` built once with the configured timeout,
//! reused across calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tokio::sync::RwLock;

use super::{CollectionRef, MetadataEntry, PostedBitstream, PostedItem, RepositoryClient, RepositoryClientError};

/// A DSpace REST API client. Login happens once per batch; the session
/// token (if any) is cached for the lifetime of the client.
#[derive(Clone)]
pub struct DSpaceClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
    token: Arc<RwLock<Option<String>>>,
}

impl DSpaceClient {
    pub fn new(base_url: &str, user: &str, password: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build DSpace HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            password: password.to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().await.as_ref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RepositoryClientError> {
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryClientError::HttpError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RepositoryClient for DSpaceClient {
    async fn login(&self) -> Result<(), RepositoryClientError> {
        let request = self
            .client
            .post(self.url("login"))
            .json(&json!({"user": self.user, "password": self.password}));

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RepositoryClientError::Timeout
            } else {
                RepositoryClientError::Other(e.to_string())
            }
        })?;
        let response = Self::check_status(response).await?;

        if let Some(token) = response
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
        {
            *self.token.write().await = Some(token);
        }

        Ok(())
    }

    async fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> Result<CollectionRef, RepositoryClientError> {
        let builder = self
            .client
            .get(self.url(&format!("handle/{handle}")));
        let builder = self.authorized(builder).await;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RepositoryClientError::Timeout
            } else {
                RepositoryClientError::Other(e.to_string())
            }
        })?;
        let response = Self::check_status(response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RepositoryClientError::Other(e.to_string()))?;
        let uuid = body
            .get("uuid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RepositoryClientError::HttpError {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: format!("collection '{handle}' has no uuid in response"),
            })?
            .to_string();

        Ok(CollectionRef { uuid })
    }

    async fn create_item(
        &self,
        collection_uuid: &str,
        metadata: &[MetadataEntry],
    ) -> Result<PostedItem, RepositoryClientError> {
        let builder = self
            .client
            .post(self.url(&format!("collections/{collection_uuid}/items")))
            .json(&json!({ "metadata": metadata }));
        let builder = self.authorized(builder).await;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RepositoryClientError::Timeout
            } else {
                RepositoryClientError::Other(e.to_string())
            }
        })?;
        let response = Self::check_status(response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RepositoryClientError::Other(e.to_string()))?;
        Ok(PostedItem {
            uuid: field_str(&body, "uuid")?,
            handle: field_str(&body, "handle")?,
            last_modified: field_str(&body, "lastModified")?,
        })
    }

    async fn attach_bitstream(
        &self,
        item_uuid: &str,
        name: &str,
        description: Option<&str>,
        content: Vec<u8>,
    ) -> Result<PostedBitstream, RepositoryClientError> {
        let mut url = format!(
            "{}?name={}",
            self.url(&format!("items/{item_uuid}/bitstreams")),
            urlencoding_escape(name)
        );
        if let Some(description) = description {
            url.push_str(&format!("&description={}", urlencoding_escape(description)));
        }

        let builder = self.client.post(url).body(content);
        let builder = self.authorized(builder).await;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RepositoryClientError::Timeout
            } else {
                RepositoryClientError::Other(e.to_string())
            }
        })?;
        let response = Self::check_status(response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RepositoryClientError::Other(e.to_string()))?;
        Ok(PostedBitstream {
            uuid: field_str(&body, "uuid")?,
            checksum: body.get("checkSum").cloned().unwrap_or(serde_json::Value::Null),
        })
    }

    async fn delete_bitstream(&self, uuid: &str) -> Result<(), RepositoryClientError> {
        let builder = self.client.delete(self.url(&format!("bitstreams/{uuid}")));
        let builder = self.authorized(builder).await;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RepositoryClientError::Timeout
            } else {
                RepositoryClientError::Other(e.to_string())
            }
        })?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete_item(&self, uuid: &str) -> Result<(), RepositoryClientError> {
        let builder = self.client.delete(self.url(&format!("items/{uuid}")));
        let builder = self.authorized(builder).await;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RepositoryClientError::Timeout
            } else {
                RepositoryClientError::Other(e.to_string())
            }
        })?;
        Self::check_status(response).await?;
        Ok(())
    }
}

fn field_str(body: &serde_json::Value, field: &str) -> Result<String, RepositoryClientError> {
    body.get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| RepositoryClientError::Other(format!("response missing field '{field}'")))
}

fn urlencoding_escape(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

//! Object Reader: opens a URI-addressed byte stream for metadata
//! JSON and bitstream payloads. Supports local filesystem paths, `s3://`
//! object storage, and `http(s)://` URLs.

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;
use url::Url;

/// Error opening a URI, distinguishable from a network/HTTP-status error so
/// bitstream-open failures classify separately from bitstream-post ones.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("not found or unreadable: '{0}'")]
    NotFound(String),
    #[error("unsupported URI scheme in '{0}'")]
    UnsupportedScheme(String),
}

/// Reads the full contents addressed by a URI. One call per object; the
/// returned bytes are fully buffered, consumed within the caller's scope.
#[async_trait]
pub trait ObjectReader: Send + Sync {
    async fn open(&self, uri: &str) -> Result<Vec<u8>, OpenError>;
}

/// Default reader backed by the local filesystem, S3, and an HTTP client.
pub struct DefaultObjectReader {
    http: reqwest::Client,
    s3: Option<S3Client>,
}

impl DefaultObjectReader {
    pub fn new(http: reqwest::Client, s3: Option<S3Client>) -> Self {
        Self { http, s3 }
    }
}

#[async_trait]
impl ObjectReader for DefaultObjectReader {
    async fn open(&self, uri: &str) -> Result<Vec<u8>, OpenError> {
        if let Ok(parsed) = Url::parse(uri) {
            match parsed.scheme() {
                "http" | "https" => return open_http(&self.http, uri).await,
                "s3" => return open_s3(self.s3.as_ref(), &parsed).await,
                "file" => {
                    return open_local(parsed.path()).await;
                }
                other => return Err(OpenError::UnsupportedScheme(other.to_string())),
            }
        }
        // No recognizable scheme: treat it as a local filesystem path.
        open_local(uri).await
    }
}

async fn open_local(path: &str) -> Result<Vec<u8>, OpenError> {
    tokio::fs::read(path)
        .await
        .map_err(|_| OpenError::NotFound(path.to_string()))
}

async fn open_http(client: &reqwest::Client, uri: &str) -> Result<Vec<u8>, OpenError> {
    let response = client
        .get(uri)
        .send()
        .await
        .map_err(|_| OpenError::NotFound(uri.to_string()))?;
    if !response.status().is_success() {
        return Err(OpenError::NotFound(uri.to_string()));
    }
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|_| OpenError::NotFound(uri.to_string()))
}

async fn open_s3(client: Option<&S3Client>, parsed: &Url) -> Result<Vec<u8>, OpenError> {
    let client = client.ok_or_else(|| OpenError::NotFound(parsed.to_string()))?;
    let bucket = parsed.host_str().ok_or_else(|| OpenError::NotFound(parsed.to_string()))?;
    let key = parsed.path().trim_start_matches('/');
    let output = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|_| OpenError::NotFound(parsed.to_string()))?;
    let bytes = output
        .body
        .collect()
        .await
        .map_err(|_| OpenError::NotFound(parsed.to_string()))?;
    Ok(bytes.into_bytes().to_vec())
}

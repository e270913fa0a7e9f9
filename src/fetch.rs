//! HTTP fetch collaborator and the `{status_code, status_txt, data}` envelope
//! that wraps every nsqd/nsqlookupd API response.

use crate::error::FetchError;
use async_trait::async_trait;
use serde::{
    de::DeserializeOwned,
    Deserialize,
};

/// Fetches the raw body of one API path. The trait is the seam that lets the
/// resolver and collector be exercised without a network.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Production fetcher: plain GET against `http://<address>/<path>`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, address: &str) -> Self {
        Self {
            base_url: format!("http://{address}"),
            client,
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ApiResponse<T> {
    pub status_code: i64,
    #[serde(default)]
    pub status_txt: String,
    #[serde(default)]
    pub data: T,
}

/// Fetch `path` and unwrap its envelope. An embedded non-200 `status_code` is
/// an application-level error even when the HTTP exchange succeeded.
pub async fn fetch_api<T, F>(fetcher: &F, path: &str) -> Result<T, FetchError>
where
    T: DeserializeOwned + Default,
    F: Fetch + ?Sized,
{
    let body = fetcher.fetch(path).await?;
    let response: ApiResponse<T> = serde_json::from_slice(&body)?;

    if response.status_code != 200 {
        return Err(FetchError::Api(response.status_code));
    }

    Ok(response.data)
}

//! HTTP client for a hosted document-store service.

use super::{DocumentStore, StoreError, VersionedDocument};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Remote document store speaking a small JSON protocol:
/// GET/PUT `{base}/v1/{collection}/{id}` with a version envelope.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    version: i64,
    body: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PutRequest<'a> {
    expected_version: Option<i64>,
    body: &'a Value,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    version: i64,
}

impl RemoteStore {
    /// Create a remote store client for the given base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/v1/{}/{}", self.base_url, collection, id)
    }

    fn classify_status(status: reqwest::StatusCode) -> Option<backoff::Error<StoreError>> {
        if status.as_u16() == 429 {
            return Some(backoff::Error::transient(StoreError::RateLimited));
        }
        if status.is_server_error() {
            return Some(backoff::Error::transient(StoreError::Http {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        None
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn fetch(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        let url = self.document_url(collection, id);
        debug!("Fetching document {}/{}", collection, id);

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(StoreError::Network(e.to_string())))?;

            let status = response.status();
            if status.as_u16() == 404 {
                return Ok(None);
            }
            if let Some(err) = Self::classify_status(status) {
                return Err(err);
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(StoreError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            let envelope = response
                .json::<DocumentEnvelope>()
                .await
                .map_err(|e| backoff::Error::permanent(StoreError::Serde(e.to_string())))?;
            Ok(Some(VersionedDocument {
                body: envelope.body,
                version: envelope.version,
            }))
        })
        .await
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: Value,
        expected: Option<i64>,
    ) -> Result<i64, StoreError> {
        let url = self.document_url(collection, id);
        debug!("Writing document {}/{}", collection, id);

        // No retry here: once a CAS write lands, a blind second attempt
        // reports a spurious conflict. The coordinator records the failure
        // and the caller decides whether to refetch and retry.
        let response = self
            .client
            .put(&url)
            .json(&PutRequest {
                expected_version: expected,
                body: &body,
            })
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 409 {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        if status.as_u16() == 429 {
            return Err(StoreError::RateLimited);
        }
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                message: if status.is_server_error() {
                    "Server error".to_string()
                } else {
                    "Client error".to_string()
                },
            });
        }

        let put_response = response
            .json::<PutResponse>()
            .await
            .map_err(|e| StoreError::Serde(e.to_string()))?;
        Ok(put_response.version)
    }

    async fn list(
        &self,
        collection: &str,
        id_prefix: &str,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError> {
        let url = format!("{}/v1/{}", self.base_url, collection);

        #[derive(Debug, Deserialize)]
        struct ListEntry {
            id: String,
            version: i64,
            body: Value,
        }

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("prefix", id_prefix)])
                .send()
                .await
                .map_err(|e| backoff::Error::transient(StoreError::Network(e.to_string())))?;

            let status = response.status();
            if let Some(err) = Self::classify_status(status) {
                return Err(err);
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(StoreError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            let entries = response
                .json::<Vec<ListEntry>>()
                .await
                .map_err(|e| backoff::Error::permanent(StoreError::Serde(e.to_string())))?;
            Ok(entries
                .into_iter()
                .map(|e| {
                    (
                        e.id,
                        VersionedDocument {
                            body: e.body,
                            version: e.version,
                        },
                    )
                })
                .collect())
        })
        .await
    }
}

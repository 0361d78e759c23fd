//! HTTP client for the validator REST surface.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use sparts_ledger::{HistoryReader, LedgerResult, StateRecord};
use sparts_protocol::{
    endpoints, BatchList, BatchStatusKind, BatchStatusResponse, BlockJson, BlockListResponse,
    BlockResponse, ErrorResponse, StateItem, StateListResponse, StateResponse, SubmitResponse,
    BATCH_CONTENT_TYPE,
};
use sparts_types::{BlockRef, EntityFamily, ErrorKind, LedgerAddress};
use tokio::time::{sleep, Instant};

use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};

/// What `submit` hands back: the batches to poll and the validator's link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchStatusHandle {
    pub batch_ids: Vec<String>,
    pub link: String,
}

/// Commit state of one submitted batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Committed,
    Invalid {
        kind: Option<ErrorKind>,
        message: String,
    },
    Pending,
    Unknown,
}

/// The only component that talks to the validator.
///
/// Every request carries the configured timeout. A 404 on a state read is an
/// ordinary "absent" answer; transport failures and other non-2xx answers are
/// [`SdkError::Unavailable`] and are never retried here.
#[derive(Clone, Debug)]
pub struct LedgerClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl LedgerClient {
    pub fn new(config: ClientConfig) -> SdkResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SdkError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// POST a batch list; returns the handle to poll.
    pub async fn submit(&self, batches: &BatchList) -> SdkResult<BatchStatusHandle> {
        let body = batches.encode()?;
        let response = self
            .http
            .post(self.url(endpoints::BATCHES))
            .header(reqwest::header::CONTENT_TYPE, BATCH_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(unavailable)?;
        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let message = error_message(response).await;
            return Err(SdkError::Invalid {
                batch_id: batches.batch_ids().join(","),
                kind: ErrorKind::InvalidPayload,
                message,
            });
        }
        let submitted: SubmitResponse = self.decode(response).await?;
        tracing::debug!(batches = batches.batches.len(), link = %submitted.link, "batches submitted");
        Ok(BatchStatusHandle {
            batch_ids: batches.batch_ids(),
            link: submitted.link,
        })
    }

    /// Bytes stored at `address`, or `None` if nothing is.
    pub async fn read(&self, address: &LedgerAddress) -> SdkResult<Option<Vec<u8>>> {
        let body: Option<StateResponse> = self
            .get_optional(&endpoints::state_entry(address.as_str()), &[])
            .await?;
        Ok(body.map(|b| b.data))
    }

    /// Every entry under an address prefix.
    pub async fn list(&self, prefix: &str) -> SdkResult<Vec<StateItem>> {
        let body: Option<StateListResponse> = self
            .get_optional(endpoints::STATE, &[("address", prefix.to_string())])
            .await?;
        Ok(body.map(|b| b.data).unwrap_or_default())
    }

    /// Number of the newest block.
    pub async fn block_height(&self) -> SdkResult<BlockRef> {
        let body: Option<BlockListResponse> = self
            .get_optional(endpoints::BLOCKS, &[("limit", "1".to_string())])
            .await?;
        body.and_then(|b| b.data.into_iter().next())
            .map(|block| block.block_num())
            .ok_or_else(|| SdkError::Decode("validator reported no blocks".into()))
    }

    pub async fn block(&self, block_num: BlockRef) -> SdkResult<Option<BlockJson>> {
        let body: Option<BlockResponse> = self
            .get_optional(&endpoints::block(block_num.height()), &[])
            .await?;
        Ok(body.map(|b| b.data))
    }

    pub async fn batch_status(&self, batch_id: &str) -> SdkResult<BatchStatus> {
        let body: Option<BatchStatusResponse> = self
            .get_optional(endpoints::BATCH_STATUSES, &[("id", batch_id.to_string())])
            .await?;
        let Some(entry) = body.and_then(|b| b.data.into_iter().find(|e| e.id == batch_id)) else {
            return Ok(BatchStatus::Unknown);
        };
        Ok(match entry.status {
            BatchStatusKind::Committed => BatchStatus::Committed,
            BatchStatusKind::Pending => BatchStatus::Pending,
            BatchStatusKind::Unknown => BatchStatus::Unknown,
            BatchStatusKind::Invalid => {
                let first = entry.invalid_transactions.into_iter().next();
                BatchStatus::Invalid {
                    kind: first.as_ref().and_then(|t| t.kind),
                    message: first.map(|t| t.message).unwrap_or_else(|| "batch invalid".into()),
                }
            }
        })
    }

    /// Poll until every batch of `handle` is committed.
    ///
    /// An invalid batch fails with the validator's reason; running past
    /// `commit_timeout` fails as unavailable.
    pub async fn wait_for_commit(&self, handle: &BatchStatusHandle) -> SdkResult<()> {
        let started = Instant::now();
        for batch_id in &handle.batch_ids {
            loop {
                match self.batch_status(batch_id).await? {
                    BatchStatus::Committed => break,
                    BatchStatus::Invalid { kind, message } => {
                        return Err(SdkError::Invalid {
                            batch_id: batch_id.clone(),
                            kind: kind.unwrap_or(ErrorKind::InvalidPayload),
                            message,
                        })
                    }
                    BatchStatus::Pending | BatchStatus::Unknown => {}
                }
                if started.elapsed() >= self.config.commit_timeout {
                    return Err(SdkError::CommitTimeout {
                        batch_id: batch_id.clone(),
                        waited_ms: started.elapsed().as_millis(),
                    });
                }
                sleep(self.config.commit_poll_interval).await;
            }
        }
        Ok(())
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SdkResult<Option<T>> {
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(unavailable)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.decode(response).await.map(Some)
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> SdkResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            tracing::warn!(%status, error = %message, "validator request failed");
            return Err(SdkError::Unavailable(format!("{status}: {message}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| SdkError::Decode(e.to_string()))
    }
}

fn unavailable(err: reqwest::Error) -> SdkError {
    let reason = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };
    tracing::warn!(error = %reason, "validator unreachable");
    SdkError::Unavailable(reason)
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => status.canonical_reason().unwrap_or("error").to_string(),
    }
}

/// History is scraped from blocks: the version of `address` written at block
/// `n` is the transaction in block `n` that outputs `address` and whose
/// payload is stamped `cur_block = n`.
#[async_trait]
impl HistoryReader for LedgerClient {
    async fn current(&self, address: &LedgerAddress) -> LedgerResult<Option<Vec<u8>>> {
        self.read(address).await.map_err(SdkError::into_rejected)
    }

    async fn payload_at(&self, address: &LedgerAddress, block: BlockRef) -> LedgerResult<Option<Vec<u8>>> {
        let Some(found) = self.block(block).await.map_err(SdkError::into_rejected)? else {
            return Ok(None);
        };
        for transaction in found.transactions() {
            if !transaction.header.outputs.contains(address) {
                continue;
            }
            let Ok(family) = EntityFamily::from_wire_name(&transaction.header.family_name) else {
                continue;
            };
            match StateRecord::decode(family, &transaction.payload) {
                Ok(record) if record.cur_block == block && record.address() == *address => {
                    return Ok(Some(transaction.payload.clone()));
                }
                _ => continue,
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_client() -> LedgerClient {
        // Port 9 (discard) is closed on test hosts; connections are refused.
        let config = ClientConfig {
            request_timeout: Duration::from_secs(2),
            ..ClientConfig::default().with_base_url("http://127.0.0.1:9")
        };
        LedgerClient::new(config).unwrap()
    }

    #[test]
    fn urls_join_base_and_path() {
        let client = LedgerClient::new(ClientConfig::default().with_base_url("http://v:8008/")).unwrap();
        assert_eq!(client.url("/state"), "http://v:8008/state");
    }

    #[tokio::test]
    async fn unreachable_validator_is_unavailable_not_rejected() {
        let client = unreachable_client();
        let address = LedgerAddress::derive(EntityFamily::Part, "p1");
        let err = client.read(&address).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerUnavailable);

        let err = client.current(&address).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerUnavailable);
    }

    /// Serve `app` on an ephemeral local port; returns its base URL.
    async fn stub(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn assert_unavailable(err: SdkError) {
        let kind = err.kind();
        assert_eq!(kind, ErrorKind::LedgerUnavailable, "{err}");
        assert!(!kind.is_ledger_rejection());
        assert!(matches!(err, SdkError::Unavailable(_)));
    }

    #[tokio::test]
    async fn server_errors_are_unavailable_not_rejected() {
        let app = axum::Router::new().fallback(|| async {
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "state tree offline")
        });
        let client = LedgerClient::new(ClientConfig::default().with_base_url(stub(app).await)).unwrap();
        let address = LedgerAddress::derive(EntityFamily::Part, "p1");

        assert_unavailable(client.read(&address).await.unwrap_err());
        assert_unavailable(client.list(&LedgerAddress::family_prefix(EntityFamily::Part)).await.unwrap_err());
        assert_unavailable(client.block_height().await.unwrap_err());
        assert_unavailable(client.submit(&BatchList::default()).await.unwrap_err());

        let err = client.current(&address).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerUnavailable);
    }

    #[tokio::test]
    async fn stalled_validator_times_out_as_unavailable() {
        let app = axum::Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        });
        let config = ClientConfig {
            request_timeout: Duration::from_millis(200),
            ..ClientConfig::default().with_base_url(stub(app).await)
        };
        let client = LedgerClient::new(config).unwrap();
        let address = LedgerAddress::derive(EntityFamily::Part, "p1");

        let started = std::time::Instant::now();
        assert_unavailable(client.read(&address).await.unwrap_err());
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_unavailable(client.list("").await.unwrap_err());
    }

    #[tokio::test]
    async fn unreachable_submit_is_unavailable() {
        let client = unreachable_client();
        let err = client.submit(&BatchList::default()).await.unwrap_err();
        assert!(matches!(err, SdkError::Unavailable(_)));
    }
}

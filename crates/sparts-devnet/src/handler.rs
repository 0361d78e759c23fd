use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::Deserialize;

use sparts_protocol::{
    endpoints, BatchList, BatchStatusResponse, BlockListResponse, BlockResponse, ErrorResponse,
    StateItem, StateListResponse, StateResponse, SubmitResponse, BATCH_CONTENT_TYPE,
};
use sparts_types::{BlockRef, LedgerAddress, ADDRESS_LEN};

use crate::chain::DevnetChain;
use crate::config::DevnetConfig;
use crate::error::{DevnetError, DevnetResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<DevnetChain>,
    pub config: Arc<DevnetConfig>,
}

impl IntoResponse for DevnetError {
    fn into_response(self) -> Response {
        let (status, title) = match &self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            Self::BadRequest(_) | Self::Protocol(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            Self::State(_) | Self::Io(_) | Self::Config(_) | Self::LockPoisoned | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
            }
        };
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = ErrorResponse::new(status.as_u16(), title, self.to_string());
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlocksQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BatchStatusQuery {
    pub id: Option<String>,
}

/// `GET /state/{address}`
pub async fn get_state(
    State(app): State<AppState>,
    Path(address): Path<String>,
) -> DevnetResult<Json<StateResponse>> {
    let address = LedgerAddress::parse(&address).map_err(|e| DevnetError::BadRequest(e.to_string()))?;
    let data = app
        .chain
        .state_entry(&address)?
        .ok_or_else(|| DevnetError::NotFound(format!("no state at {address}")))?;
    Ok(Json(StateResponse {
        data,
        head: app.chain.head()?,
    }))
}

/// `GET /state?address={prefix}`
pub async fn list_state(
    State(app): State<AppState>,
    Query(query): Query<StateQuery>,
) -> DevnetResult<Json<StateListResponse>> {
    let prefix = query.address.unwrap_or_default();
    if prefix.len() > ADDRESS_LEN
        || !prefix.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(DevnetError::BadRequest(format!("invalid address prefix `{prefix}`")));
    }
    let data = app
        .chain
        .list_state(&prefix)?
        .into_iter()
        .map(|entry| StateItem {
            address: entry.address,
            data: entry.data,
        })
        .collect();
    Ok(Json(StateListResponse {
        data,
        head: app.chain.head()?,
    }))
}

/// `GET /blocks?limit={n}`, newest first.
pub async fn list_blocks(
    State(app): State<AppState>,
    Query(query): Query<BlocksQuery>,
) -> DevnetResult<Json<BlockListResponse>> {
    let page = app.config.block_page_limit;
    let limit = query.limit.unwrap_or(page).clamp(1, page.max(1));
    Ok(Json(BlockListResponse {
        data: app.chain.blocks(limit)?,
    }))
}

/// `GET /blocks/{block_num}`
pub async fn get_block(
    State(app): State<AppState>,
    Path(block_num): Path<String>,
) -> DevnetResult<Json<BlockResponse>> {
    let block_num: BlockRef = block_num
        .parse()
        .map_err(|e: sparts_types::TypeError| DevnetError::BadRequest(e.to_string()))?;
    let block = app
        .chain
        .block(block_num)?
        .ok_or_else(|| DevnetError::NotFound(format!("no block {block_num}")))?;
    Ok(Json(BlockResponse { data: block }))
}

/// `POST /batches` with a binary batch list body.
pub async fn submit_batches(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> DevnetResult<(StatusCode, Json<SubmitResponse>)> {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        if content_type.as_bytes() != BATCH_CONTENT_TYPE.as_bytes() {
            return Err(DevnetError::BadRequest(format!(
                "batches must be sent as {BATCH_CONTENT_TYPE}"
            )));
        }
    }
    let list = BatchList::decode(&body)?;
    if list.batches.is_empty() {
        return Err(DevnetError::BadRequest("batch list is empty".into()));
    }
    let ids = list.batch_ids().join(",");

    let chain = Arc::clone(&app.chain);
    tokio::task::spawn_blocking(move || chain.submit(&list))
        .await
        .map_err(|e| DevnetError::Internal(e.to_string()))??;

    let link = format!("{}?id={ids}", endpoints::BATCH_STATUSES);
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { link })))
}

/// `GET /batch_statuses?id={id,id,...}`
pub async fn batch_statuses(
    State(app): State<AppState>,
    Query(query): Query<BatchStatusQuery>,
) -> DevnetResult<Json<BatchStatusResponse>> {
    let ids: Vec<&str> = query
        .id
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(DevnetError::BadRequest("at least one batch id is required".into()));
    }
    let data = ids
        .into_iter()
        .map(|id| app.chain.batch_status(id))
        .collect::<DevnetResult<Vec<_>>>()?;
    Ok(Json(BatchStatusResponse { data }))
}

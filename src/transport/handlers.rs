use super::protocol::*;
use crate::error::{ChordError, Result};
use crate::node::ChordNode;
use crate::service::ChordService;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

fn status_of(error: &ChordError) -> StatusCode {
    match error {
        ChordError::Validation(_) => StatusCode::BAD_REQUEST,
        ChordError::Isolated | ChordError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
        ChordError::Communication { .. } | ChordError::RingUnreachable { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn reply<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            tracing::debug!("Request failed: {}", e);
            (
                status_of(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                    unresolved: match e {
                        ChordError::RingUnreachable { id, hops } => Some(Unresolved { id, hops }),
                        _ => None,
                    },
                }),
            )
                .into_response()
        }
    }
}

fn ack(result: Result<()>) -> Response {
    reply(result.map(|()| AckResponse { success: true }))
}

// --- Ring contract ---

pub async fn handle_ping(Extension(node): Extension<Arc<ChordNode>>) -> Response {
    ack(node.ping().await)
}

pub async fn handle_find_successor(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<IdRequest>,
) -> Response {
    reply(node.find_successor(req.id).await)
}

pub async fn handle_lookup_step(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<IdRequest>,
) -> Response {
    reply(node.lookup_step(req.id).await)
}

pub async fn handle_notify(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<CandidateRequest>,
) -> Response {
    reply(node.notify(req.candidate).await)
}

pub async fn handle_notify_and_copy(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<CandidateRequest>,
) -> Response {
    reply(node.notify_and_copy_entries(req.candidate).await)
}

pub async fn handle_insert_entry(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<EntryRequest>,
) -> Response {
    ack(node.insert_entry(req.entry).await)
}

pub async fn handle_insert_replicas(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<EntriesRequest>,
) -> Response {
    ack(node.insert_replicas(req.entries).await)
}

pub async fn handle_remove_entry(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<EntryRequest>,
) -> Response {
    ack(node.remove_entry(req.entry).await)
}

pub async fn handle_remove_replicas(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<RemoveReplicasRequest>,
) -> Response {
    ack(node.remove_replicas(req.sender, req.entries).await)
}

pub async fn handle_replace_replicas(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<ReplaceReplicasRequest>,
) -> Response {
    ack(node
        .replace_replicas(req.range_start, req.owner, req.entries)
        .await)
}

pub async fn handle_retrieve_entries(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<IdRequest>,
) -> Response {
    reply(node.retrieve_entries(req.id).await)
}

pub async fn handle_leaves_network(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<LeavesNetworkRequest>,
) -> Response {
    ack(node.leaves_network(req.departing).await)
}

// --- Public surface ---

pub async fn handle_status(Extension(node): Extension<Arc<ChordNode>>) -> Response {
    (StatusCode::OK, Json(node.info().await)).into_response()
}

fn encode_value(value: &serde_json::Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ChordError::Validation(e.to_string()))
}

pub async fn handle_put(
    Extension(service): Extension<ChordService>,
    Json(req): Json<KeyValueRequest>,
) -> Response {
    let value = match encode_value(&req.value) {
        Ok(value) => value,
        Err(e) => return reply::<AckResponse>(Err(e)),
    };
    ack(service.insert(&req.key, &value).await)
}

pub async fn handle_delete(
    Extension(service): Extension<ChordService>,
    Json(req): Json<KeyValueRequest>,
) -> Response {
    let value = match encode_value(&req.value) {
        Ok(value) => value,
        Err(e) => return reply::<AckResponse>(Err(e)),
    };
    ack(service.remove(&req.key, &value).await)
}

pub async fn handle_get(
    Extension(service): Extension<ChordService>,
    Path(key): Path<String>,
) -> Response {
    let result = service.retrieve(&key).await.map(|values| {
        let values = values
            .iter()
            .filter_map(|raw| match serde_json::from_slice(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Skipping non-JSON value under {}: {}", key, e);
                    None
                }
            })
            .collect();
        GetResponse {
            key: key.clone(),
            values,
        }
    });
    reply(result)
}

/// Routes serving both the ring contract and the public key/value surface.
pub fn router(node: Arc<ChordNode>) -> Router {
    let service = ChordService::new(node.clone());

    Router::new()
        // Ring contract
        .route(ENDPOINT_PING, post(handle_ping))
        .route(ENDPOINT_FIND_SUCCESSOR, post(handle_find_successor))
        .route(ENDPOINT_LOOKUP_STEP, post(handle_lookup_step))
        .route(ENDPOINT_NOTIFY, post(handle_notify))
        .route(ENDPOINT_NOTIFY_AND_COPY, post(handle_notify_and_copy))
        .route(ENDPOINT_INSERT_ENTRY, post(handle_insert_entry))
        .route(ENDPOINT_INSERT_REPLICAS, post(handle_insert_replicas))
        .route(ENDPOINT_REMOVE_ENTRY, post(handle_remove_entry))
        .route(ENDPOINT_REMOVE_REPLICAS, post(handle_remove_replicas))
        .route(ENDPOINT_REPLACE_REPLICAS, post(handle_replace_replicas))
        .route(ENDPOINT_RETRIEVE_ENTRIES, post(handle_retrieve_entries))
        .route(ENDPOINT_LEAVES_NETWORK, post(handle_leaves_network))
        // Public
        .route(ENDPOINT_STATUS, get(handle_status))
        .route(ENDPOINT_PUT, post(handle_put))
        .route(ENDPOINT_DELETE, post(handle_delete))
        .route(ENDPOINT_GET, get(handle_get))
        .layer(Extension(node))
        .layer(Extension(service))
}

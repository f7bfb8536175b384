//! Ring Wire Protocol
//!
//! Endpoints and Data Transfer Objects used when nodes talk to each other
//! over HTTP, plus the small client-facing key/value surface.
//!
//! Every internal call is a `POST` with a JSON body. Successful calls answer
//! with the operation's result serialized directly; failures answer with a
//! non-2xx status and an `ErrorResponse`.

use crate::ring::{Entry, Identifier, NodeRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// --- Internal ring endpoints ---

pub const ENDPOINT_PING: &str = "/chord/ping";
pub const ENDPOINT_FIND_SUCCESSOR: &str = "/chord/find_successor";
/// One hop of an iterative lookup.
pub const ENDPOINT_LOOKUP_STEP: &str = "/chord/lookup_step";
pub const ENDPOINT_NOTIFY: &str = "/chord/notify";
/// Join-time notify that also transfers entries.
pub const ENDPOINT_NOTIFY_AND_COPY: &str = "/chord/notify_and_copy";
pub const ENDPOINT_INSERT_ENTRY: &str = "/chord/insert_entry";
pub const ENDPOINT_INSERT_REPLICAS: &str = "/chord/insert_replicas";
pub const ENDPOINT_REMOVE_ENTRY: &str = "/chord/remove_entry";
pub const ENDPOINT_REMOVE_REPLICAS: &str = "/chord/remove_replicas";
/// Full-range replica reconciliation pushed by an owner.
pub const ENDPOINT_REPLACE_REPLICAS: &str = "/chord/replace_replicas";
pub const ENDPOINT_RETRIEVE_ENTRIES: &str = "/chord/retrieve_entries";
pub const ENDPOINT_LEAVES_NETWORK: &str = "/chord/leaves_network";

// --- Public endpoints ---

/// Snapshot of the node's ring view.
pub const ENDPOINT_STATUS: &str = "/status";
/// Client write: routes the value to the node responsible for the key.
pub const ENDPOINT_PUT: &str = "/put";
/// Client delete of one exact key/value pair.
pub const ENDPOINT_DELETE: &str = "/delete";
/// Client read of every value stored under a key.
pub const ENDPOINT_GET: &str = "/get/:key";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct IdRequest {
    pub id: Identifier,
}

/// Carries the node that believes it is the callee's predecessor.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateRequest {
    pub candidate: NodeRef,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryRequest {
    pub entry: Entry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntriesRequest {
    pub entries: HashSet<Entry>,
}

/// An empty `entries` set asks the callee to prune `(callee, sender]`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveReplicasRequest {
    pub sender: Identifier,
    pub entries: HashSet<Entry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplaceReplicasRequest {
    pub range_start: Identifier,
    pub owner: Identifier,
    pub entries: HashSet<Entry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeavesNetworkRequest {
    pub departing: NodeRef,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Set when the callee could not resolve the responsible node, so the
    /// caller can rebuild the same error instead of a communication failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<Unresolved>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Unresolved {
    pub id: Identifier,
    pub hops: usize,
}

/// Client write or delete. The value is an arbitrary JSON document.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyValueRequest {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub values: Vec<serde_json::Value>,
}

//! Request/response payloads carried over `shardlog-wire`'s opaque byte
//! envelopes. `shardlog-wire` only frames and pipelines bytes; this
//! module is where those bytes get meaning.

use serde::{Deserialize, Serialize};
use shardlog_core::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Append { payload: Vec<u8> },
    MultiAppend { payloads: Vec<Vec<u8>> },
    Get { id: i64, len: i64, snapshot: i64 },
    Update { id: i64, payload: Vec<u8> },
    Invalidate { id: i64 },
    BeginSnapshot,
    EndSnapshot { tail: i64 },
    NumRecords,

    AddNode { payload: Vec<u8> },
    GetNode { id: i64, len: i64, snapshot: i64 },
    UpdateNode { id: i64, payload: Vec<u8> },
    DeleteNode { id: i64 },
    AddLink { id1: i64, id2: i64, link_type: i64, payload: Vec<u8> },
    UpdateLink { id1: i64, id2: i64, link_type: i64, payload: Vec<u8> },
    DeleteLink { id1: i64, id2: i64, link_type: i64 },
    GetLink { id1: i64, id2: i64, link_type: i64, snapshot: i64 },
    MultigetLink { id1: i64, link_type: i64, id2s: Vec<i64>, snapshot: i64 },
    GetLinkList { id1: i64, link_type: i64, snapshot: i64 },
    GetLinkListRange { id1: i64, link_type: i64, min_seq: i64, max_seq: i64, snapshot: i64 },
    CountLinks { id1: i64, link_type: i64, snapshot: i64 },
    Traverse {
        id1: i64,
        link_type: i64,
        depth: u32,
        breadth: u32,
        snapshot: Vec<i64>,
        visited: Vec<i64>,
    },

    InsertValues { bytes: Vec<u8> },
    InsertValuesBlock { bytes: Vec<u8> },
    GetRange { start_ts: i64, end_ts: i64, snapshot: i64 },
    GetRangeLatest { start_ts: i64, snapshot: i64 },
    GetNearestValue { ts: i64, snapshot: i64 },
    GetNearestValueLatest { ts: i64, snapshot: i64 },
    ComputeDiff { start_ts: i64, end_ts: i64, snapshot: i64 },
    NumEntries,

    GetSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Id(i64),
    Ids(Vec<i64>),
    Bytes(Vec<u8>),
    Bool(bool),
    Count(i64),
    Tails(Vec<i64>),
    Link(Option<Vec<u8>>),
    Links(Vec<(i64, Vec<u8>)>),
    OptionalLinks(Vec<Option<Vec<u8>>>),
    Points(Vec<(i64, f64)>),
    Point(Option<(i64, f64)>),
    Diff(Option<f64>),
    Edges(Vec<(i64, i64)>),
    Unit,
    Error(String),
}

pub fn encode_request(req: &Request) -> Result<Vec<u8>> {
    bincode::serialize(req).map_err(|e| Error::ArgumentError(format!("request encode failed: {e}")))
}

pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    bincode::deserialize(bytes).map_err(|e| Error::ArgumentError(format!("request decode failed: {e}")))
}

pub fn encode_response(resp: &Response) -> Result<Vec<u8>> {
    bincode::serialize(resp).map_err(|e| Error::ArgumentError(format!("response encode failed: {e}")))
}

pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    bincode::deserialize(bytes).map_err(|e| Error::ArgumentError(format!("response decode failed: {e}")))
}

/// Turn a core error into the wire's `Error` response variant.
pub fn error_response(err: &Error) -> Response {
    Response::Error(err.to_string())
}

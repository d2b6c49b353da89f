//! Turns the opaque byte payloads `shardlog-wire::serve` hands to a
//! `Handler` into calls against this process's services, and their
//! results back into `protocol::Response` bytes. One `Dispatch` is built
//! per server process and wraps it as a `shardlog_wire::Handler` via
//! [`Dispatch::into_handler`].

use crate::graph::GraphService;
use crate::logstore::LogStoreService;
use crate::protocol::{self, Request, Response};
use crate::timeseries::TimeseriesService;
use crate::traversal::TraversalService;
use shardlog_coordinator::Coordinator;
use shardlog_core::{GlobalId, Result};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub struct Dispatch {
    logstore: Arc<LogStoreService>,
    graph: Arc<GraphService>,
    timeseries: Arc<TimeseriesService>,
    traversal: Arc<TraversalService>,
    coordinator: Arc<Coordinator>,
}

impl Dispatch {
    pub fn new(
        logstore: Arc<LogStoreService>,
        graph: Arc<GraphService>,
        timeseries: Arc<TimeseriesService>,
        traversal: Arc<TraversalService>,
        coordinator: Arc<Coordinator>,
    ) -> Self {
        Dispatch {
            logstore,
            graph,
            timeseries,
            traversal,
            coordinator,
        }
    }

    pub async fn handle(&self, payload: Vec<u8>) -> Vec<u8> {
        let response = match protocol::decode_request(&payload) {
            Ok(req) => self.dispatch(req).await.unwrap_or_else(|e| protocol::error_response(&e)),
            Err(e) => protocol::error_response(&e),
        };
        protocol::encode_response(&response).unwrap_or_else(|_| {
            protocol::encode_response(&Response::Error("response encode failed".to_string()))
                .expect("encoding an Error response must not itself fail")
        })
    }

    async fn dispatch(&self, req: Request) -> Result<Response> {
        match req {
            Request::Append { payload } => {
                let id = self.logstore.append(&payload)?;
                Ok(Response::Id(id.get() as i64))
            }
            Request::MultiAppend { payloads } => {
                let refs: Vec<&[u8]> = payloads.iter().map(|p| p.as_slice()).collect();
                let ids = self.logstore.multi_append(&refs)?;
                Ok(Response::Ids(ids.into_iter().map(|i| i.get() as i64).collect()))
            }
            Request::Get { id, len, snapshot } => {
                let bytes = self.logstore.get(GlobalId::new(id as u64), len as u64, snapshot as u64)?;
                Ok(Response::Bytes(bytes))
            }
            Request::Update { id, payload } => {
                self.logstore.update(GlobalId::new(id as u64), &payload)?;
                Ok(Response::Unit)
            }
            Request::Invalidate { id } => {
                let ok = self.logstore.invalidate(GlobalId::new(id as u64))?;
                Ok(Response::Bool(ok))
            }
            Request::NumRecords => Ok(Response::Count(self.logstore.num_records() as i64)),

            Request::BeginSnapshot => {
                let pending = self.logstore.shard().begin_snapshot();
                Ok(Response::Id(pending.tail() as i64))
            }
            Request::EndSnapshot { tail } => {
                let pending = shardlog_storage::PendingSnapshot::from_tail(tail as u64);
                let done = self.logstore.shard().end_snapshot(pending);
                Ok(Response::Bool(done.tail() == tail as u64))
            }

            Request::AddNode { payload } => Ok(Response::Id(self.graph.add_node(&payload)? as i64)),
            Request::GetNode { id, len, snapshot } => Ok(Response::Bytes(self.graph.get_node(
                id as u64,
                len as u64,
                snapshot as u64,
            )?)),
            Request::UpdateNode { id, payload } => {
                self.graph.update_node(id as u64, &payload)?;
                Ok(Response::Unit)
            }
            Request::DeleteNode { id } => Ok(Response::Bool(self.graph.delete_node(id as u64)?)),
            Request::AddLink { id1, id2, link_type, payload } => {
                Ok(Response::Bool(self.graph.add_link(id1, id2, link_type, payload)?))
            }
            Request::UpdateLink { id1, id2, link_type, payload } => {
                Ok(Response::Bool(self.graph.update_link(id1, id2, link_type, payload)?))
            }
            Request::DeleteLink { id1, id2, link_type } => {
                Ok(Response::Bool(self.graph.delete_link(id1, id2, link_type)?))
            }
            Request::GetLink { id1, id2, link_type, snapshot } => Ok(Response::Link(
                self.graph.get_link(id1, id2, link_type, snapshot as u64),
            )),
            Request::MultigetLink { id1, link_type, id2s, snapshot } => Ok(Response::OptionalLinks(
                self.graph.multiget_link(id1, link_type, &id2s, snapshot as u64),
            )),
            Request::GetLinkList { id1, link_type, snapshot } => Ok(Response::Links(
                self.graph.get_link_list(id1, link_type, snapshot as u64),
            )),
            Request::GetLinkListRange { id1, link_type, min_seq, max_seq, snapshot } => {
                Ok(Response::Links(self.graph.get_link_list_range(
                    id1,
                    link_type,
                    min_seq as u64,
                    max_seq as u64,
                    snapshot as u64,
                )))
            }
            Request::CountLinks { id1, link_type, snapshot } => {
                Ok(Response::Count(self.graph.count_links(id1, link_type, snapshot as u64) as i64))
            }
            Request::Traverse { id1, link_type, depth, breadth, snapshot, visited } => {
                let snapshot: Vec<u64> = snapshot.into_iter().map(|s| s as u64).collect();
                let mut visited: HashSet<i64> = visited.into_iter().collect();
                let edges = self
                    .traversal
                    .traverse(id1, link_type, depth, breadth, &snapshot, &mut visited)
                    .await?;
                Ok(Response::Edges(edges))
            }

            Request::InsertValues { bytes } => {
                Ok(Response::Ids(self.timeseries.insert_values(&bytes)?.into_iter().map(|i| i as i64).collect()))
            }
            Request::InsertValuesBlock { bytes } => {
                Ok(Response::Id(self.timeseries.insert_values_block(&bytes)? as i64))
            }
            Request::GetRange { start_ts, end_ts, snapshot } => Ok(Response::Points(
                self.timeseries
                    .get_range(start_ts, end_ts, snapshot as u64)?
                    .into_iter()
                    .map(|p| (p.timestamp, p.value))
                    .collect(),
            )),
            Request::GetRangeLatest { start_ts, snapshot } => Ok(Response::Points(
                self.timeseries
                    .get_range_latest(start_ts, snapshot as u64)?
                    .into_iter()
                    .map(|p| (p.timestamp, p.value))
                    .collect(),
            )),
            Request::GetNearestValue { ts, snapshot } => Ok(Response::Point(
                self.timeseries.get_nearest_value(ts, snapshot as u64)?.map(|p| (p.timestamp, p.value)),
            )),
            Request::GetNearestValueLatest { ts, snapshot } => Ok(Response::Point(
                self.timeseries
                    .get_nearest_value_latest(ts, snapshot as u64)?
                    .map(|p| (p.timestamp, p.value)),
            )),
            Request::ComputeDiff { start_ts, end_ts, snapshot } => {
                Ok(Response::Diff(self.timeseries.compute_diff(start_ts, end_ts, snapshot as u64)?))
            }
            Request::NumEntries => Ok(Response::Count(self.timeseries.num_entries() as i64)),

            Request::GetSnapshot => {
                let tails = self.coordinator.force_snapshot()?;
                Ok(Response::Tails(tails.into_iter().map(|t| t as i64).collect()))
            }
        }
    }

    /// Adapt this dispatcher to the `Fn(Vec<u8>) -> Future<Output = Vec<u8>>`
    /// shape `shardlog_wire::serve` expects.
    pub fn into_handler(self: Arc<Self>) -> shardlog_wire::Handler {
        Arc::new(move |payload: Vec<u8>| {
            let this = Arc::clone(&self);
            Box::pin(async move { this.handle(payload).await }) as Pin<Box<dyn Future<Output = Vec<u8>> + Send>>
        })
    }
}

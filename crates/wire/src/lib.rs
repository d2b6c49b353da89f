//! Framed request/response RPC transport: one frame per request, one
//! frame per response, replies on a connection arrive in the order their
//! requests were sent.
//!
//! Dispatch is split into a non-blocking send half and a blocking recv
//! half so a caller can pipeline several requests ahead of their
//! replies. This crate owns the framing and connection plumbing only;
//! `shardlog-engine` owns what the request and response payloads
//! actually mean for each service.

mod client;
mod framing;
mod server;

pub use client::Connection;
pub use framing::{read_frame, write_frame, MAX_FRAME_LEN};
pub use server::{serve, Handler};

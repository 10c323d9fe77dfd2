//! Wire types for the frame-rpc bridge.
//!
//! Shared by both sides of a connection; the caller and the receiver agree on
//! nothing but the shape of [`RpcMessage`].

pub mod correlation;
pub mod message;

pub use correlation::{CorrelationId, CorrelationIds};
pub use message::{Cancel, ErrorReply, Request, Response, RpcMessage};

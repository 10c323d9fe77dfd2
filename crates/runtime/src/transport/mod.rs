//! Message transport adapter.
//!
//! The only layer that touches the cross-context messaging primitive. A
//! context owns one port: a [`Transport`] for fire-and-forget posting and a
//! single stream of inbound [`MessageEvent`]s that the bridge listener drains.
//!
//! Delivery carries no acknowledgement. Posting to a context that no longer
//! exists is silently dropped, mirroring `postMessage` on a closed window;
//! only a closed local port is an error.

mod memory;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;

pub use memory::MessageBus;

/// Identity of a messaging context (a window or an embedded frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowRef(u64);

impl WindowRef {
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for WindowRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "window#{}", self.0)
	}
}

/// One inbound delivery: the posted data and the context that posted it.
#[derive(Debug, Clone)]
pub struct MessageEvent {
	pub source: WindowRef,
	pub data: Value,
}

/// Send half of a messaging port.
pub trait Transport: Send + Sync {
	/// Identity of the context this port belongs to.
	fn window(&self) -> WindowRef;

	/// Posts `data` to `target` without waiting for delivery.
	fn post_message(&self, target: WindowRef, data: Value) -> Result<()>;
}

/// A port split into its send half and its inbound event stream.
pub struct TransportParts {
	pub sender: Arc<dyn Transport>,
	pub events: mpsc::UnboundedReceiver<MessageEvent>,
}

impl TransportParts {
	pub fn window(&self) -> WindowRef {
		self.sender.window()
	}
}

#[cfg(test)]
mod tests;

//! Error types for the bridge runtime.

use serde_json::Value;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the bridge.
#[derive(Debug, Error)]
pub enum Error {
	/// No reply arrived within the call's timeout window.
	#[error("Timeout: call to '{method}' received no reply within {timeout_ms}ms")]
	Timeout { method: String, timeout_ms: u64 },

	/// The receiver answered with an error reply.
	#[error("{message}")]
	Remote {
		/// Error text from the receiving side, verbatim.
		message: String,
		/// Structured detail attached by the receiver (if any).
		details: Option<Value>,
	},

	/// The local messaging port is closed; nothing can be posted.
	#[error("Transport closed")]
	TransportClosed,

	/// Pending-call channel dropped without a settlement.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// The bridge was disposed before or while the call was pending.
	#[error("Bridge disposed")]
	Disposed,

	/// Invalid argument provided to a bridge operation.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Invalid or unreadable configuration.
	#[error("Configuration error: {0}")]
	Config(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}

	/// Returns true if the call failed on the receiving side.
	pub fn is_remote(&self) -> bool {
		matches!(self, Error::Remote { .. })
	}

	/// Returns the structured detail of a remote error.
	pub fn details(&self) -> Option<&Value> {
		match self {
			Error::Remote { details, .. } => details.as_ref(),
			_ => None,
		}
	}
}

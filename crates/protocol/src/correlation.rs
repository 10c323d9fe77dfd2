//! Correlation ids linking a request to its reply.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Opaque token linking a request to its eventual reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CorrelationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CorrelationId {
	fn from(value: &str) -> Self {
		Self(Arc::from(value))
	}
}

impl From<String> for CorrelationId {
	fn from(value: String) -> Self {
		Self(Arc::from(value))
	}
}

/// Generates correlation ids as `<wall-clock millis>-<counter>` (hex).
///
/// The counter is monotonic per generator, so ids handed out by one
/// generator never collide while their calls are pending.
#[derive(Debug, Default)]
pub struct CorrelationIds {
	counter: AtomicU64,
}

impl CorrelationIds {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn next(&self) -> CorrelationId {
		let seq = self.counter.fetch_add(1, Ordering::Relaxed);
		let millis = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis() as u64)
			.unwrap_or_default();
		CorrelationId::from(format!("{millis:x}-{seq:x}"))
	}
}

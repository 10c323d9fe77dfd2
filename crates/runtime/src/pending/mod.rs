//! Pending-call registry.
//!
//! Single source of truth for in-flight calls on the caller side. Each entry
//! is settled exactly once: by a matching reply ([`PendingCalls::settle`]),
//! by its timer, by [`PendingCalls::reject_all`], or dropped silently via
//! [`PendingCalls::forget`]. Entries are removed under the registry lock
//! before their outcome is delivered, so a late reply racing a firing timer
//! finds nothing to settle.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use frame_rpc_protocol::CorrelationId;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::error::{Error, Result};

/// Outcome delivered to the waiting caller.
pub type Outcome = Result<Value>;

struct PendingCall {
	tx: oneshot::Sender<Outcome>,
	timer: AbortHandle,
}

/// Registry of calls awaiting a reply, keyed by correlation id.
#[derive(Default)]
pub struct PendingCalls {
	calls: Mutex<HashMap<CorrelationId, PendingCall>>,
}

impl PendingCalls {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Registers a call and starts its timeout timer.
	///
	/// Must be called from within a tokio runtime. Fails if `id` is already
	/// pending.
	pub fn register(
		self: &Arc<Self>,
		id: CorrelationId,
		method: &str,
		timeout: Duration,
	) -> Result<oneshot::Receiver<Outcome>> {
		let mut calls = self.calls.lock();
		if calls.contains_key(&id) {
			return Err(Error::InvalidArgument(format!("correlation id already pending: {id}")));
		}

		let (tx, rx) = oneshot::channel();
		let registry: Weak<Self> = Arc::downgrade(self);
		let timer_id = id.clone();
		let method = method.to_string();
		let timer = tokio::spawn(async move {
			tokio::time::sleep(timeout).await;
			if let Some(registry) = registry.upgrade() {
				registry.expire(&timer_id, method, timeout);
			}
		});

		calls.insert(
			id,
			PendingCall {
				tx,
				timer: timer.abort_handle(),
			},
		);
		Ok(rx)
	}

	/// Settles a pending call. Returns `false` (and does nothing) when `id`
	/// is unknown, e.g. a duplicate or late reply.
	pub fn settle(&self, id: &CorrelationId, outcome: Outcome) -> bool {
		let Some(call) = self.calls.lock().remove(id) else {
			tracing::debug!(%id, "ignoring reply for unknown or settled call");
			return false;
		};
		call.timer.abort();
		if call.tx.send(outcome).is_err() {
			tracing::debug!(%id, "caller stopped waiting before settlement");
		}
		true
	}

	/// Removes a call without delivering an outcome.
	pub fn forget(&self, id: &CorrelationId) -> bool {
		match self.calls.lock().remove(id) {
			Some(call) => {
				call.timer.abort();
				true
			}
			None => false,
		}
	}

	/// Rejects every pending call with the error produced by `reason`.
	pub fn reject_all(&self, reason: impl Fn() -> Error) -> usize {
		let drained: Vec<_> = self.calls.lock().drain().collect();
		let count = drained.len();
		for (_, call) in drained {
			call.timer.abort();
			let _ = call.tx.send(Err(reason()));
		}
		count
	}

	pub fn contains(&self, id: &CorrelationId) -> bool {
		self.calls.lock().contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.calls.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.calls.lock().is_empty()
	}

	fn expire(&self, id: &CorrelationId, method: String, timeout: Duration) {
		let Some(call) = self.calls.lock().remove(id) else {
			return;
		};
		tracing::debug!(%id, %method, "call timed out");
		let _ = call.tx.send(Err(Error::Timeout {
			method,
			timeout_ms: timeout.as_millis() as u64,
		}));
	}
}

/// Drop guard that forgets a pending call when its future is abandoned.
pub(crate) struct PendingGuard {
	id: CorrelationId,
	calls: Arc<PendingCalls>,
	completed: bool,
}

impl PendingGuard {
	pub(crate) fn new(id: CorrelationId, calls: Arc<PendingCalls>) -> Self {
		Self {
			id,
			calls,
			completed: false,
		}
	}

	pub(crate) fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for PendingGuard {
	fn drop(&mut self) {
		if !self.completed && self.calls.forget(&self.id) {
			tracing::debug!(id = %self.id, "removed abandoned call");
		}
	}
}

#[cfg(test)]
mod tests;

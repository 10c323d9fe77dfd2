//! Call stub factory.
//!
//! A [`Stub`] turns method calls on a named target into correlated requests:
//!
//! 1. Caller invokes `stub.invoke(method, args)`
//! 2. A fresh correlation id is generated and a pending call registered
//! 3. The request is posted to the stub's destination context
//! 4. The returned future settles once: reply, error reply, or timeout
//!
//! Stubs are cached per `(destination, target, timeout)` by [`StubFactory`],
//! so repeated lookups share one instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use frame_rpc_protocol::{CorrelationId, CorrelationIds, RpcMessage};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::pending::{PendingCalls, PendingGuard};
use crate::transport::{Transport, WindowRef};

/// Caller-side state shared by every stub of one bridge.
pub(crate) struct Caller {
	pub(crate) transport: Arc<dyn Transport>,
	pub(crate) pending: Arc<PendingCalls>,
	ids: CorrelationIds,
	cancel_on_timeout: bool,
	disposed: AtomicBool,
}

impl Caller {
	pub(crate) fn new(transport: Arc<dyn Transport>, cancel_on_timeout: bool) -> Self {
		Self {
			transport,
			pending: PendingCalls::new(),
			ids: CorrelationIds::new(),
			cancel_on_timeout,
			disposed: AtomicBool::new(false),
		}
	}

	pub(crate) fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::SeqCst)
	}

	/// Marks the caller disposed; returns false if it already was.
	pub(crate) fn mark_disposed(&self) -> bool {
		!self.disposed.swap(true, Ordering::SeqCst)
	}

	fn post_cancel(&self, dest: WindowRef, id: CorrelationId) {
		let notice = RpcMessage::cancel(id);
		let posted = notice
			.to_value()
			.map_err(Error::from)
			.and_then(|value| self.transport.post_message(dest, value));
		if let Err(e) = posted {
			tracing::debug!(id = %notice.correlation_id(), error = %e, "failed to post cancel notice");
		}
	}
}

struct StubInner {
	caller: Arc<Caller>,
	dest: WindowRef,
	target: String,
	timeout: Duration,
}

/// Proxy for one target on one destination context.
#[derive(Clone)]
pub struct Stub {
	inner: Arc<StubInner>,
}

impl std::fmt::Debug for Stub {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Stub")
			.field("dest", &self.inner.dest)
			.field("target", &self.inner.target)
			.field("timeout", &self.inner.timeout)
			.finish()
	}
}

impl Stub {
	pub fn target(&self) -> &str {
		&self.inner.target
	}

	pub fn destination(&self) -> WindowRef {
		self.inner.dest
	}

	pub fn timeout(&self) -> Duration {
		self.inner.timeout
	}

	/// Returns true if both handles refer to the same cached stub.
	pub fn ptr_eq(&self, other: &Stub) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Calls `method` with positional `args` and awaits its reply.
	///
	/// Never panics on transport trouble: a closed port resolves to
	/// [`Error::TransportClosed`], a disposed bridge to [`Error::Disposed`].
	pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
		let StubInner {
			caller,
			dest,
			target,
			timeout,
		} = &*self.inner;

		if caller.is_disposed() {
			return Err(Error::Disposed);
		}

		let id = caller.ids.next();
		let request = RpcMessage::request(id.clone(), method, args, target.as_str()).to_value()?;
		let rx = caller.pending.register(id.clone(), method, *timeout)?;
		let mut guard = PendingGuard::new(id.clone(), Arc::clone(&caller.pending));

		tracing::debug!(%id, method, target = %target, dest = %dest, "sending request");
		caller.transport.post_message(*dest, request)?;

		let outcome = rx.await.map_err(|_| Error::ChannelClosed).and_then(|r| r);
		guard.complete();

		if let Err(err) = &outcome {
			if err.is_timeout() && caller.cancel_on_timeout {
				caller.post_cancel(*dest, id);
			}
		}
		outcome
	}

	/// Typed wrapper around [`invoke`](Self::invoke).
	///
	/// `args` serializing to an array (tuples, vectors) is spread into
	/// positional arguments, `()` means no arguments, and any other value is
	/// passed as the single argument.
	pub async fn call<A, R>(&self, method: &str, args: A) -> Result<R>
	where
		A: Serialize,
		R: DeserializeOwned,
	{
		let args = match serde_json::to_value(args)? {
			Value::Array(items) => items,
			Value::Null => Vec::new(),
			single => vec![single],
		};
		let result = self.invoke(method, args).await?;
		Ok(serde_json::from_value(result)?)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StubKey {
	dest: WindowRef,
	target: String,
	timeout: Duration,
}

/// Idempotent stub factory.
pub(crate) struct StubFactory {
	caller: Arc<Caller>,
	default_timeout: Duration,
	cache: DashMap<StubKey, Stub>,
}

impl StubFactory {
	pub(crate) fn new(caller: Arc<Caller>, default_timeout: Duration) -> Self {
		Self {
			caller,
			default_timeout,
			cache: DashMap::new(),
		}
	}

	pub(crate) fn stub(&self, dest: WindowRef, target: &str, timeout: Option<Duration>) -> Stub {
		let key = StubKey {
			dest,
			target: target.to_string(),
			timeout: timeout.unwrap_or(self.default_timeout),
		};
		let inner = StubInner {
			caller: Arc::clone(&self.caller),
			dest: key.dest,
			target: key.target.clone(),
			timeout: key.timeout,
		};
		self.cache
			.entry(key)
			.or_insert_with(|| Stub { inner: Arc::new(inner) })
			.clone()
	}

	pub(crate) fn len(&self) -> usize {
		self.cache.len()
	}

	pub(crate) fn clear(&self) {
		self.cache.clear();
	}
}

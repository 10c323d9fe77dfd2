//! Bridge: one endpoint of a cross-context RPC connection.
//!
//! A [`Bridge`] owns everything for one messaging port: the caller side
//! (stubs and the pending-call registry) and the receiver side (the
//! cascading dispatcher). It installs a single listener that routes every
//! inbound message to exactly one path:
//!
//! - foreign traffic is ignored
//! - requests are dispatched on their own task and answered to their sender
//! - responses and errors settle the matching pending call
//! - cancel notices abort the matching in-flight dispatch
//!
//! [`Bridge::dispose`] tears all of this down explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use frame_rpc_protocol::{CorrelationId, Request, RpcMessage};
use futures_util::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::BridgeConfig;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::identity::ChannelId;
use crate::remote::JsonRpcModules;
use crate::stub::{Caller, Stub, StubFactory};
use crate::transport::{MessageEvent, TransportParts, WindowRef};

type InFlightKey = (WindowRef, CorrelationId);

/// Abort handle of one running dispatch, tagged so a finishing task only
/// removes its own entry.
struct InFlight {
	seq: u64,
	handle: AbortHandle,
}

struct BridgeInner {
	config: BridgeConfig,
	caller: Arc<Caller>,
	stubs: StubFactory,
	dispatcher: Arc<Dispatcher>,
	events: Mutex<Option<mpsc::UnboundedReceiver<MessageEvent>>>,
	listener: Mutex<Option<JoinHandle<()>>>,
	in_flight: Arc<DashMap<InFlightKey, InFlight>>,
	dispatch_seq: AtomicU64,
}

/// One endpoint of the bridge. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Bridge {
	inner: Arc<BridgeInner>,
}

impl Bridge {
	/// Creates a bridge over `parts`. Call [`listen`](Self::listen) to start
	/// receiving.
	pub fn new(parts: TransportParts, config: BridgeConfig) -> Result<Self> {
		config.validate()?;

		let TransportParts { sender, events } = parts;
		let caller = Arc::new(Caller::new(sender, config.cancel_on_timeout));
		let stubs = StubFactory::new(Arc::clone(&caller), config.default_timeout());

		let dispatcher = Arc::new(Dispatcher::new());
		if let Some(remote) = &config.remote {
			dispatcher.set_remote_modules(Arc::new(JsonRpcModules::from_config(remote)?));
		}

		Ok(Self {
			inner: Arc::new(BridgeInner {
				config,
				caller,
				stubs,
				dispatcher,
				events: Mutex::new(Some(events)),
				listener: Mutex::new(None),
				in_flight: Arc::new(DashMap::new()),
				dispatch_seq: AtomicU64::new(0),
			}),
		})
	}

	/// Identity of this bridge's own context.
	pub fn window(&self) -> WindowRef {
		self.inner.caller.transport.window()
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.inner.config
	}

	/// Receiver-side handler registry.
	pub fn dispatcher(&self) -> &Dispatcher {
		&self.inner.dispatcher
	}

	/// Installs the inbound listener. Idempotent: later calls do nothing.
	///
	/// Must be called from within a tokio runtime.
	pub fn listen(&self) {
		let mut listener = self.inner.listener.lock();
		if listener.is_some() || self.is_disposed() {
			return;
		}
		let Some(mut events) = self.inner.events.lock().take() else {
			return;
		};

		let weak: Weak<BridgeInner> = Arc::downgrade(&self.inner);
		let window = self.window();
		*listener = Some(tokio::spawn(async move {
			while let Some(event) = events.recv().await {
				let Some(inner) = weak.upgrade() else {
					break;
				};
				inner.route(event);
			}
			tracing::debug!(%window, "bridge listener stopped");
		}));
		tracing::debug!(%window, "bridge listening");
	}

	pub fn is_listening(&self) -> bool {
		self.inner.listener.lock().is_some()
	}

	/// Stub for `target` on the context `dest`, using the default timeout.
	pub fn stub(&self, dest: WindowRef, target: &str) -> Stub {
		self.inner.stubs.stub(dest, target, None)
	}

	/// Stub for `target` on `dest` with a per-stub timeout.
	pub fn stub_with_timeout(&self, dest: WindowRef, target: &str, timeout: Duration) -> Stub {
		self.inner.stubs.stub(dest, target, Some(timeout))
	}

	/// Stub for `target` on the context registered as `channel`.
	pub fn channel_stub(&self, channel: &ChannelId, target: &str) -> Result<Stub> {
		let dest = self
			.inner
			.dispatcher
			.endpoints()
			.window(channel)
			.ok_or_else(|| Error::InvalidArgument(format!("unknown channel: {channel}")))?;
		Ok(self.stub(dest, target))
	}

	/// Number of distinct cached stubs.
	pub fn cached_stubs(&self) -> usize {
		self.inner.stubs.len()
	}

	/// Calls awaiting a reply.
	pub fn pending_calls(&self) -> usize {
		self.inner.caller.pending.len()
	}

	/// Inbound requests still being dispatched.
	pub fn in_flight(&self) -> usize {
		self.inner.in_flight.len()
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.caller.is_disposed()
	}

	/// Stops listening, rejects pending calls with [`Error::Disposed`],
	/// aborts in-flight dispatches and drops cached stubs. Idempotent.
	pub fn dispose(&self) {
		if !self.inner.caller.mark_disposed() {
			return;
		}

		if let Some(listener) = self.inner.listener.lock().take() {
			listener.abort();
		}
		self.inner.events.lock().take();

		let rejected = self.inner.caller.pending.reject_all(|| Error::Disposed);
		for entry in self.inner.in_flight.iter() {
			entry.value().handle.abort();
		}
		let aborted = self.inner.in_flight.len();
		self.inner.in_flight.clear();
		self.inner.stubs.clear();

		tracing::debug!(window = %self.window(), rejected, aborted, "bridge disposed");
	}
}

impl BridgeInner {
	fn route(&self, event: MessageEvent) {
		let MessageEvent { source, data } = event;
		let Some(message) = RpcMessage::classify(&data) else {
			tracing::trace!(%source, "ignoring non-rpc message");
			return;
		};

		match message {
			RpcMessage::Request(request) => self.spawn_dispatch(source, request),
			RpcMessage::Response(response) => {
				self.caller
					.pending
					.settle(&response.correlation_id, Ok(response.result));
			}
			RpcMessage::Error(reply) => {
				self.caller.pending.settle(
					&reply.correlation_id,
					Err(Error::Remote {
						message: reply.message,
						details: reply.details,
					}),
				);
			}
			RpcMessage::Cancel(cancel) => {
				if let Some((_, running)) = self.in_flight.remove(&(source, cancel.correlation_id.clone())) {
					running.handle.abort();
					tracing::debug!(%source, id = %cancel.correlation_id, "cancelled in-flight call");
				}
			}
		}
	}

	fn spawn_dispatch(&self, source: WindowRef, request: Request) {
		let id = request.correlation_id.clone();
		let key: InFlightKey = (source, id.clone());
		let dispatcher = Arc::clone(&self.dispatcher);
		let transport = Arc::clone(&self.caller.transport);
		let in_flight = Arc::clone(&self.in_flight);

		let (handle, registration) = AbortHandle::new_pair();
		let seq = self.dispatch_seq.fetch_add(1, Ordering::Relaxed);
		match self.in_flight.entry(key.clone()) {
			Entry::Occupied(_) => {
				tracing::debug!(%source, %id, "ignoring duplicate request already in flight");
				return;
			}
			Entry::Vacant(slot) => {
				slot.insert(InFlight { seq, handle });
			}
		}
		let work = Abortable::new(async move { dispatcher.dispatch(source, request).await }, registration);

		tokio::spawn(async move {
			let outcome = work.await;
			in_flight.remove_if(&key, |_, running| running.seq == seq);

			let reply = match outcome {
				Ok(Ok(result)) => RpcMessage::response(id, result),
				Ok(Err(err)) => RpcMessage::error(id, err.message, err.details),
				Err(_) => {
					tracing::debug!(%source, id = %key.1, "dispatch aborted, no reply sent");
					return;
				}
			};

			let posted = reply
				.to_value()
				.map_err(Error::from)
				.and_then(|value| transport.post_message(source, value));
			if let Err(e) = posted {
				tracing::warn!(%source, id = %reply.correlation_id(), error = %e, "failed to post reply");
			}
		});
	}
}

//! Cascading dispatcher.
//!
//! Resolves an incoming request through a fixed sequence of tiers and runs
//! the first handler that exposes the requested method:
//!
//! 1. [`Tier::Channel`]: handler registered for the sender's channel identity
//! 2. [`Tier::Global`]: handler applied to every sender
//! 3. [`Tier::Local`]: host capability object
//! 4. [`Tier::Remote`]: network-backed module named by the request's `target`
//!
//! A tier claims a call only when its object exists and
//! [`Handler::has_method`] returns true. When no tier claims the call the
//! dispatcher answers with a method-not-found error; it never retries.

mod handler;

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use frame_rpc_protocol::Request;
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;

pub use handler::{CallFuture, Handler, HandlerError, MethodTable};

use crate::identity::{ChannelId, EndpointRegistry};
use crate::remote::RemoteModules;
use crate::transport::WindowRef;

/// Outcome of one dispatched request.
pub type Reply = Result<Value, HandlerError>;

/// Resolution tier, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
	Channel,
	Global,
	Local,
	Remote,
}

impl fmt::Display for Tier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Tier::Channel => "channel",
			Tier::Global => "global",
			Tier::Local => "local",
			Tier::Remote => "remote",
		})
	}
}

/// The handler chosen for a call.
#[derive(Clone)]
pub struct Resolved {
	pub tier: Tier,
	pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for Resolved {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolved").field("tier", &self.tier).finish()
	}
}

/// Receiver side of the bridge: handler tiers plus endpoint identities.
#[derive(Default)]
pub struct Dispatcher {
	endpoints: EndpointRegistry,
	channel_handlers: DashMap<ChannelId, Arc<dyn Handler>>,
	global: RwLock<Option<Arc<dyn Handler>>>,
	local: RwLock<Option<Arc<dyn Handler>>>,
	remote: RwLock<Option<Arc<dyn RemoteModules>>>,
	remote_cache: DashMap<String, Option<Arc<dyn Handler>>>,
}

impl Dispatcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry consulted to identify senders.
	pub fn endpoints(&self) -> &EndpointRegistry {
		&self.endpoints
	}

	/// Registers the tier-1 handler for `identity`, replacing any previous one.
	pub fn register_handler(&self, identity: impl Into<ChannelId>, handler: Arc<dyn Handler>) {
		let identity = identity.into();
		tracing::debug!(%identity, "registered channel handler");
		self.channel_handlers.insert(identity, handler);
	}

	/// Sets the tier-2 handler.
	pub fn register_global_handler(&self, handler: Arc<dyn Handler>) {
		*self.global.write() = Some(handler);
	}

	pub fn clear_global_handler(&self) {
		*self.global.write() = None;
	}

	/// Removes the tier-1 handler for `identity`.
	pub fn unregister(&self, identity: &ChannelId) -> bool {
		self.channel_handlers.remove(identity).is_some()
	}

	/// Sets the tier-3 host capability object.
	pub fn set_local_capabilities(&self, capabilities: Arc<dyn Handler>) {
		*self.local.write() = Some(capabilities);
	}

	/// Sets the tier-4 module factory and drops previously cached modules.
	pub fn set_remote_modules(&self, modules: Arc<dyn RemoteModules>) {
		*self.remote.write() = Some(modules);
		self.remote_cache.clear();
	}

	/// Finds the handler that would serve `method` for a message from `source`.
	pub fn resolve(&self, source: WindowRef, method: &str, target: &str) -> Option<Resolved> {
		let claims = |tier: Tier, handler: Option<Arc<dyn Handler>>| {
			handler
				.filter(|h| h.has_method(method))
				.map(|handler| Resolved { tier, handler })
		};

		let channel_handler = self
			.endpoints
			.resolve(source)
			.and_then(|id| self.channel_handlers.get(&id).map(|entry| Arc::clone(entry.value())));

		claims(Tier::Channel, channel_handler)
			.or_else(|| claims(Tier::Global, self.global.read().clone()))
			.or_else(|| claims(Tier::Local, self.local.read().clone()))
			.or_else(|| {
				if target.is_empty() {
					return None;
				}
				claims(Tier::Remote, self.remote_module(target))
			})
	}

	/// Resolves and runs one request, producing exactly one reply.
	pub async fn dispatch(&self, source: WindowRef, request: Request) -> Reply {
		let Request {
			correlation_id,
			method,
			args,
			target,
		} = request;

		let Some(resolved) = self.resolve(source, &method, &target) else {
			tracing::debug!(%correlation_id, %method, %target, "no handler for method");
			return Err(method_not_found(&method, &target));
		};

		tracing::debug!(%correlation_id, %method, tier = %resolved.tier, "dispatching call");
		// Handlers may panic while building their future (property getters,
		// eager closures) as well as while it runs.
		let handler = &resolved.handler;
		let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(&method, args))) {
			Ok(call) => AssertUnwindSafe(call).catch_unwind().await,
			Err(panic) => Err(panic),
		};
		outcome.unwrap_or_else(|panic| {
			let reason = panic_reason(panic.as_ref());
			tracing::error!(%correlation_id, %method, %reason, "handler panicked");
			Err(HandlerError::new(format!("Handler for '{method}' panicked: {reason}")))
		})
	}

	fn remote_module(&self, name: &str) -> Option<Arc<dyn Handler>> {
		if let Some(cached) = self.remote_cache.get(name) {
			return cached.value().clone();
		}
		let factory = self.remote.read().clone()?;
		let module = factory.module(name);
		if module.is_none() {
			tracing::debug!(module = name, "remote module not available");
		}
		self.remote_cache.insert(name.to_string(), module.clone());
		module
	}
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
	panic
		.downcast_ref::<&str>()
		.map(|s| s.to_string())
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic".to_string())
}

fn method_not_found(method: &str, target: &str) -> HandlerError {
	let message = if target.is_empty() {
		format!("Method '{method}' not found in any handler")
	} else {
		format!("Method '{method}' not found in any handler (target '{target}')")
	};
	HandlerError::new(message)
}

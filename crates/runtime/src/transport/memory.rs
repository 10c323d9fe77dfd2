//! In-process message bus connecting any number of contexts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{MessageEvent, Transport, TransportParts, WindowRef};
use crate::error::{Error, Result};

/// Routes posted messages between contexts living in one process.
///
/// Each [`open`](Self::open) creates a new context, the way a page creates
/// iframes; [`close`](Self::close) tears one down.
pub struct MessageBus {
	inboxes: DashMap<WindowRef, mpsc::UnboundedSender<MessageEvent>>,
	next_window: AtomicU64,
}

impl MessageBus {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			inboxes: DashMap::new(),
			next_window: AtomicU64::new(1),
		})
	}

	/// Opens a new context and returns its port.
	pub fn open(self: &Arc<Self>) -> TransportParts {
		let window = WindowRef::new(self.next_window.fetch_add(1, Ordering::SeqCst));
		let (tx, events) = mpsc::unbounded_channel();
		self.inboxes.insert(window, tx);
		tracing::debug!(%window, "opened bus context");

		TransportParts {
			sender: Arc::new(BusPort {
				window,
				bus: Arc::clone(self),
			}),
			events,
		}
	}

	/// Closes a context. Messages posted to it afterwards are dropped and
	/// its own port can no longer post.
	pub fn close(&self, window: WindowRef) -> bool {
		let closed = self.inboxes.remove(&window).is_some();
		if closed {
			tracing::debug!(%window, "closed bus context");
		}
		closed
	}

	pub fn is_open(&self, window: WindowRef) -> bool {
		self.inboxes.contains_key(&window)
	}

	fn deliver(&self, source: WindowRef, target: WindowRef, data: Value) {
		let Some(inbox) = self.inboxes.get(&target).map(|entry| entry.value().clone()) else {
			tracing::debug!(%source, %target, "dropping message for unknown context");
			return;
		};
		if inbox.send(MessageEvent { source, data }).is_err() {
			tracing::debug!(%source, %target, "dropping message for context with no listener");
		}
	}
}

struct BusPort {
	window: WindowRef,
	bus: Arc<MessageBus>,
}

impl Transport for BusPort {
	fn window(&self) -> WindowRef {
		self.window
	}

	fn post_message(&self, target: WindowRef, data: Value) -> Result<()> {
		if !self.bus.is_open(self.window) {
			return Err(Error::TransportClosed);
		}
		self.bus.deliver(self.window, target, data);
		Ok(())
	}
}

//! Source identity resolution.
//!
//! Maps the sender of an inbound message to the logical channel it was
//! registered under, so the dispatcher can pick a channel-specific handler.
//! Endpoints come and go at runtime, so every lookup scans the live registry.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::transport::WindowRef;

/// Logical identity of a registered endpoint (e.g. one per embedded guest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(Arc<str>);

impl ChannelId {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ChannelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ChannelId {
	fn from(value: &str) -> Self {
		Self(Arc::from(value))
	}
}

impl From<String> for ChannelId {
	fn from(value: String) -> Self {
		Self(Arc::from(value))
	}
}

/// Live registry of known endpoints.
#[derive(Default)]
pub struct EndpointRegistry {
	endpoints: DashMap<ChannelId, WindowRef>,
}

impl EndpointRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or replaces) the window behind `id`.
	pub fn register(&self, id: impl Into<ChannelId>, window: WindowRef) -> Option<WindowRef> {
		let id = id.into();
		tracing::debug!(%id, %window, "registered endpoint");
		self.endpoints.insert(id, window)
	}

	pub fn remove(&self, id: &ChannelId) -> Option<WindowRef> {
		self.endpoints.remove(id).map(|(_, window)| window)
	}

	pub fn window(&self, id: &ChannelId) -> Option<WindowRef> {
		self.endpoints.get(id).map(|entry| *entry.value())
	}

	pub fn contains(&self, id: &ChannelId) -> bool {
		self.endpoints.contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.endpoints.len()
	}

	pub fn is_empty(&self) -> bool {
		self.endpoints.is_empty()
	}

	/// Returns the logical id registered for `source`, if any.
	pub fn resolve(&self, source: WindowRef) -> Option<ChannelId> {
		self.endpoints
			.iter()
			.find(|entry| *entry.value() == source)
			.map(|entry| entry.key().clone())
	}
}

use serde_json::json;

use super::*;
use crate::error::Error;

#[tokio::test]
async fn test_post_delivers_with_source_identity() {
	let bus = MessageBus::new();
	let host = bus.open();
	let mut guest = bus.open();

	host.sender.post_message(guest.window(), json!({"hello": "guest"})).unwrap();

	let event = guest.events.recv().await.unwrap();
	assert_eq!(event.source, host.window());
	assert_eq!(event.data, json!({"hello": "guest"}));
}

#[tokio::test]
async fn test_messages_arrive_in_post_order() {
	let bus = MessageBus::new();
	let host = bus.open();
	let mut guest = bus.open();

	for n in 0..3 {
		host.sender.post_message(guest.window(), json!(n)).unwrap();
	}
	for n in 0..3 {
		assert_eq!(guest.events.recv().await.unwrap().data, json!(n));
	}
}

#[test]
fn test_post_to_unknown_context_is_dropped() {
	let bus = MessageBus::new();
	let host = bus.open();

	let result = host.sender.post_message(WindowRef::new(9_999), json!({}));
	assert!(result.is_ok());
}

#[test]
fn test_closed_port_cannot_post() {
	let bus = MessageBus::new();
	let host = bus.open();
	let guest = bus.open();

	assert!(bus.close(host.window()));
	assert!(!bus.close(host.window()));

	let err = host.sender.post_message(guest.window(), json!({})).unwrap_err();
	assert!(matches!(err, Error::TransportClosed));
}

#[tokio::test]
async fn test_post_to_closed_context_is_dropped() {
	let bus = MessageBus::new();
	let host = bus.open();
	let mut guest = bus.open();

	bus.close(guest.window());
	host.sender.post_message(guest.window(), json!({})).unwrap();

	assert!(guest.events.recv().await.is_none());
}

#[test]
fn test_window_refs_are_distinct() {
	let bus = MessageBus::new();
	let a = bus.open();
	let b = bus.open();
	assert_ne!(a.window(), b.window());
	assert_eq!(a.window().to_string(), format!("window#{}", a.window().raw()));
}

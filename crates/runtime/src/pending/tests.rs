use std::time::Duration;

use serde_json::json;

use super::*;

const LONG: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_settle_resolves_and_removes() {
	let calls = PendingCalls::new();
	let id = CorrelationId::from("c-1");
	let rx = calls.register(id.clone(), "add", LONG).unwrap();
	assert!(calls.contains(&id));

	assert!(calls.settle(&id, Ok(json!(3))));
	assert!(calls.is_empty());
	assert_eq!(rx.await.unwrap().unwrap(), json!(3));
}

#[tokio::test]
async fn test_settle_is_idempotent() {
	let calls = PendingCalls::new();
	let id = CorrelationId::from("c-1");
	let rx = calls.register(id.clone(), "add", LONG).unwrap();

	assert!(calls.settle(&id, Ok(json!("first"))));
	assert!(!calls.settle(&id, Ok(json!("second"))));
	assert_eq!(rx.await.unwrap().unwrap(), json!("first"));
}

#[test]
fn test_settle_unknown_id_is_noop() {
	let calls = PendingCalls::new();
	assert!(!calls.settle(&CorrelationId::from("never"), Ok(json!(null))));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
	let calls = PendingCalls::new();
	let id = CorrelationId::from("c-1");
	let _rx = calls.register(id.clone(), "add", LONG).unwrap();

	let err = calls.register(id, "add", LONG).unwrap_err();
	assert!(matches!(err, Error::InvalidArgument(_)));
	assert_eq!(calls.len(), 1);
}

#[tokio::test]
async fn test_timeout_rejects_and_removes() {
	let calls = PendingCalls::new();
	let id = CorrelationId::from("c-1");
	let rx = calls.register(id.clone(), "slow", Duration::from_millis(20)).unwrap();

	let err = rx.await.unwrap().unwrap_err();
	assert!(err.is_timeout());
	assert!(err.to_string().contains("'slow'"));
	assert!(!calls.contains(&id));

	// A reply that shows up after the timeout finds nothing to settle.
	assert!(!calls.settle(&id, Ok(json!("late"))));
}

#[tokio::test]
async fn test_settled_call_does_not_time_out() {
	let calls = PendingCalls::new();
	let id = CorrelationId::from("c-1");
	let rx = calls.register(id.clone(), "fast", Duration::from_millis(20)).unwrap();
	calls.settle(&id, Ok(json!(1)));

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(rx.await.unwrap().unwrap(), json!(1));
}

#[tokio::test]
async fn test_reject_all_drains_registry() {
	let calls = PendingCalls::new();
	let a = calls.register("a".into(), "m", LONG).unwrap();
	let b = calls.register("b".into(), "m", LONG).unwrap();

	assert_eq!(calls.reject_all(|| Error::Disposed), 2);
	assert!(calls.is_empty());
	assert!(matches!(a.await.unwrap(), Err(Error::Disposed)));
	assert!(matches!(b.await.unwrap(), Err(Error::Disposed)));
}

#[tokio::test]
async fn test_guard_forgets_abandoned_call() {
	let calls = PendingCalls::new();
	let id = CorrelationId::from("c-1");
	let _rx = calls.register(id.clone(), "m", LONG).unwrap();

	drop(PendingGuard::new(id.clone(), Arc::clone(&calls)));
	assert!(!calls.contains(&id));
}

#[tokio::test]
async fn test_completed_guard_leaves_registry_alone() {
	let calls = PendingCalls::new();
	let id = CorrelationId::from("c-1");
	let _rx = calls.register(id.clone(), "m", LONG).unwrap();

	let mut guard = PendingGuard::new(id.clone(), Arc::clone(&calls));
	guard.complete();
	drop(guard);
	assert!(calls.contains(&id));
}

//! Handler objects consulted by the dispatch cascade.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Boxed future returned by [`Handler::call`].
pub type CallFuture = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>;

/// Failure raised by a handler; becomes an error reply on the wire.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
	pub message: String,
	pub details: Option<Value>,
}

impl HandlerError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			details: None,
		}
	}

	pub fn with_details(mut self, details: Value) -> Self {
		self.details = Some(details);
		self
	}
}

impl From<String> for HandlerError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

impl From<&str> for HandlerError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

impl From<serde_json::Error> for HandlerError {
	fn from(err: serde_json::Error) -> Self {
		Self::new(err.to_string())
	}
}

/// Bridge errors raised while a handler calls further out (e.g. a host
/// handler forwarding to another guest) keep their remote detail.
impl From<crate::Error> for HandlerError {
	fn from(err: crate::Error) -> Self {
		match err {
			crate::Error::Remote { message, details } => Self { message, details },
			other => Self::new(other.to_string()),
		}
	}
}

/// An object whose named methods the dispatcher can invoke.
///
/// A tier only claims a call when [`has_method`](Self::has_method) is true,
/// so `call` is never asked for a method the handler does not expose.
pub trait Handler: Send + Sync {
	fn has_method(&self, method: &str) -> bool;

	fn call(&self, method: &str, args: Vec<Value>) -> CallFuture;

	/// Exposed method names, for diagnostics.
	fn methods(&self) -> Vec<String> {
		Vec::new()
	}
}

type MethodFn = Arc<dyn Fn(Vec<Value>) -> CallFuture + Send + Sync>;
type PropertyFn = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
enum Entry {
	Method(MethodFn),
	Property(PropertyFn),
}

/// Builder-style [`Handler`] backed by closures, in registration order.
///
/// ```ignore
/// let math = MethodTable::new()
///     .typed("add", |(a, b): (i64, i64)| async move { Ok(a + b) })
///     .property("version", || json!("1.2.0"));
/// ```
#[derive(Clone, Default)]
pub struct MethodTable {
	entries: IndexMap<String, Entry>,
}

impl MethodTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a method taking the raw positional arguments.
	pub fn method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
	{
		let f: MethodFn = Arc::new(move |args| -> CallFuture { Box::pin(f(args)) });
		self.entries.insert(name.into(), Entry::Method(f));
		self
	}

	/// Registers a method whose positional arguments deserialize into `A`
	/// (usually a tuple) and whose result serializes from `R`.
	pub fn typed<A, R, F, Fut>(self, name: impl Into<String>, f: F) -> Self
	where
		A: DeserializeOwned + Send + 'static,
		R: Serialize + Send + 'static,
		F: Fn(A) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
	{
		let name = name.into();
		let f = Arc::new(f);
		let method = name.clone();
		self.method(name, move |args| {
			let f = Arc::clone(&f);
			let parsed = parse_args::<A>(&method, args);
			async move {
				let output = f(parsed?).await?;
				Ok(serde_json::to_value(output)?)
			}
		})
	}

	/// Registers a readable property; calling it ignores arguments.
	pub fn property<F>(mut self, name: impl Into<String>, getter: F) -> Self
	where
		F: Fn() -> Value + Send + Sync + 'static,
	{
		self.entries.insert(name.into(), Entry::Property(Arc::new(getter)));
		self
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl Handler for MethodTable {
	fn has_method(&self, method: &str) -> bool {
		self.entries.contains_key(method)
	}

	fn call(&self, method: &str, args: Vec<Value>) -> CallFuture {
		match self.entries.get(method) {
			Some(Entry::Method(f)) => f(args),
			Some(Entry::Property(getter)) => {
				let value = getter();
				Box::pin(async move { Ok(value) })
			}
			None => {
				let err = HandlerError::new(format!("Method '{method}' is not exposed by this handler"));
				Box::pin(async move { Err(err) })
			}
		}
	}

	fn methods(&self) -> Vec<String> {
		self.entries.keys().cloned().collect()
	}
}

/// Deserializes positional arguments into `A`.
///
/// An empty argument list is tried as `null` first so `()` and `Option<T>`
/// accept calls without arguments.
fn parse_args<A: DeserializeOwned>(method: &str, args: Vec<Value>) -> Result<A, HandlerError> {
	if args.is_empty() {
		if let Ok(parsed) = serde_json::from_value(Value::Null) {
			return Ok(parsed);
		}
	}
	serde_json::from_value(Value::Array(args))
		.map_err(|e| HandlerError::new(format!("Invalid arguments for '{method}': {e}")))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn table() -> MethodTable {
		MethodTable::new()
			.typed("add", |(a, b): (i64, i64)| async move { Ok(a + b) })
			.typed("ping", |()| async { Ok("pong") })
			.method("first", |args| async move { Ok(args.into_iter().next().unwrap_or(Value::Null)) })
			.property("version", || json!("1.2.0"))
	}

	#[tokio::test]
	async fn typed_method_parses_positional_args() {
		assert_eq!(table().call("add", vec![json!(1), json!(2)]).await.unwrap(), json!(3));
	}

	#[tokio::test]
	async fn unit_args_accept_empty_call() {
		assert_eq!(table().call("ping", vec![]).await.unwrap(), json!("pong"));
	}

	#[tokio::test]
	async fn bad_args_name_the_method() {
		let err = table().call("add", vec![json!("x")]).await.unwrap_err();
		assert!(err.message.starts_with("Invalid arguments for 'add'"), "{}", err.message);
	}

	#[tokio::test]
	async fn property_ignores_args() {
		let value = table().call("version", vec![json!("ignored")]).await.unwrap();
		assert_eq!(value, json!("1.2.0"));
	}

	#[tokio::test]
	async fn raw_method_sees_all_args() {
		assert_eq!(table().call("first", vec![json!(7), json!(8)]).await.unwrap(), json!(7));
	}

	#[test]
	fn membership_and_listing_follow_registration_order() {
		let table = table();
		assert!(table.has_method("version"));
		assert!(!table.has_method("missing"));
		assert_eq!(table.methods(), vec!["add", "ping", "first", "version"]);
	}

	#[test]
	fn remote_bridge_error_keeps_details() {
		let err = HandlerError::from(crate::Error::Remote {
			message: "denied".into(),
			details: Some(json!({"code": 403})),
		});
		assert_eq!(err, HandlerError::new("denied").with_details(json!({"code": 403})));
	}
}

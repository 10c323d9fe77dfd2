//! Wire messages exchanged between bridge endpoints.
//!
//! Every message is a JSON object tagged by `kind` and carrying the
//! `correlationId` of the call it belongs to:
//!
//! 1. Caller posts [`RpcMessage::Request`] with a fresh correlation id
//! 2. Receiver answers with exactly one [`RpcMessage::Response`] or [`RpcMessage::Error`]
//! 3. A caller that gave up waiting may post [`RpcMessage::Cancel`]
//!
//! The channel is shared with unrelated traffic, so [`RpcMessage::classify`]
//! is the only entry point for inbound data and never fails loudly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::correlation::CorrelationId;

/// Discriminated union of bridge messages, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RpcMessage {
	/// Call `method` on the handler group named by `target`.
	Request(Request),
	/// Successful completion of a call.
	Response(Response),
	/// Failed completion of a call.
	Error(ErrorReply),
	/// The caller abandoned the call; the receiver may stop working on it.
	Cancel(Cancel),
}

/// Method invocation sent by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	pub correlation_id: CorrelationId,
	/// Method name to resolve through the receiver's handler cascade.
	pub method: String,
	/// Positional arguments.
	#[serde(default)]
	pub args: Vec<Value>,
	/// Handler group (module) the call is destined for. Empty means the
	/// local cascade only.
	#[serde(default)]
	pub target: String,
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	pub correlation_id: CorrelationId,
	#[serde(default)]
	pub result: Value,
}

/// Failure of a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
	pub correlation_id: CorrelationId,
	/// Human-readable error text, carried verbatim from the failing handler.
	pub message: String,
	/// Optional structured detail (error codes, remote payloads).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
}

/// Notice that the caller stopped waiting for a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancel {
	pub correlation_id: CorrelationId,
}

impl RpcMessage {
	/// Builds a request message.
	pub fn request(
		correlation_id: CorrelationId,
		method: impl Into<String>,
		args: Vec<Value>,
		target: impl Into<String>,
	) -> Self {
		RpcMessage::Request(Request {
			correlation_id,
			method: method.into(),
			args,
			target: target.into(),
		})
	}

	/// Builds a success reply.
	pub fn response(correlation_id: CorrelationId, result: Value) -> Self {
		RpcMessage::Response(Response {
			correlation_id,
			result,
		})
	}

	/// Builds an error reply.
	pub fn error(correlation_id: CorrelationId, message: impl Into<String>, details: Option<Value>) -> Self {
		RpcMessage::Error(ErrorReply {
			correlation_id,
			message: message.into(),
			details,
		})
	}

	/// Builds a cancel notice.
	pub fn cancel(correlation_id: CorrelationId) -> Self {
		RpcMessage::Cancel(Cancel { correlation_id })
	}

	/// Recognizes bridge traffic on a shared channel.
	///
	/// Returns `None` for anything that is not a well-formed bridge message:
	/// non-objects, a missing or unknown `kind`, a missing or non-string
	/// `correlationId`, or variant fields of the wrong shape.
	pub fn classify(data: &Value) -> Option<RpcMessage> {
		let object = data.as_object()?;
		if !object.get("correlationId").is_some_and(Value::is_string) {
			return None;
		}
		match object.get("kind").and_then(Value::as_str)? {
			"request" | "response" | "error" | "cancel" => {}
			_ => return None,
		}
		RpcMessage::deserialize(data).ok()
	}

	/// Correlation id shared by every variant.
	pub fn correlation_id(&self) -> &CorrelationId {
		match self {
			RpcMessage::Request(m) => &m.correlation_id,
			RpcMessage::Response(m) => &m.correlation_id,
			RpcMessage::Error(m) => &m.correlation_id,
			RpcMessage::Cancel(m) => &m.correlation_id,
		}
	}

	/// The `kind` tag as it appears on the wire.
	pub fn kind(&self) -> &'static str {
		match self {
			RpcMessage::Request(_) => "request",
			RpcMessage::Response(_) => "response",
			RpcMessage::Error(_) => "error",
			RpcMessage::Cancel(_) => "cancel",
		}
	}

	/// Returns true for messages that travel on the request path.
	pub fn is_request(&self) -> bool {
		matches!(self, RpcMessage::Request(_) | RpcMessage::Cancel(_))
	}

	/// Serializes into the JSON value posted over the channel.
	pub fn to_value(&self) -> serde_json::Result<Value> {
		serde_json::to_value(self)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn request_serializes_with_kind_tag_and_camel_case_id() {
		let msg = RpcMessage::request("c-1".into(), "add", vec![json!(1), json!(2)], "math");
		let value = msg.to_value().unwrap();
		assert_eq!(
			value,
			json!({
				"kind": "request",
				"correlationId": "c-1",
				"method": "add",
				"args": [1, 2],
				"target": "math",
			})
		);
	}

	#[test]
	fn error_reply_omits_absent_details() {
		let value = RpcMessage::error("c-2".into(), "boom", None).to_value().unwrap();
		assert_eq!(value, json!({"kind": "error", "correlationId": "c-2", "message": "boom"}));
	}

	#[test]
	fn request_without_target_or_args_defaults_to_local_cascade() {
		let msg = RpcMessage::classify(&json!({"kind": "request", "correlationId": "c-3", "method": "ping"})).unwrap();
		match msg {
			RpcMessage::Request(req) => {
				assert!(req.args.is_empty());
				assert!(req.target.is_empty());
			}
			other => panic!("expected request, got {other:?}"),
		}
	}

	#[test]
	fn response_without_result_is_null() {
		let msg = RpcMessage::classify(&json!({"kind": "response", "correlationId": "c-4"})).unwrap();
		assert_eq!(msg, RpcMessage::response("c-4".into(), Value::Null));
	}

	#[test]
	fn foreign_traffic_is_not_classified() {
		let foreign = [
			json!("hello"),
			json!(42),
			json!({"type": "resize", "width": 300}),
			json!({"kind": "request", "method": "noId"}),
			json!({"correlationId": "c-5", "result": 1}),
			json!({"kind": "shout", "correlationId": "c-6"}),
			json!({"kind": "response", "correlationId": 7, "result": 1}),
			json!({"kind": "request", "correlationId": "c-8"}),
			json!({"kind": "error", "correlationId": "c-9"}),
		];
		for value in foreign {
			assert!(RpcMessage::classify(&value).is_none(), "classified foreign message: {value}");
		}
	}

	#[test]
	fn request_path_covers_requests_and_cancels() {
		assert!(RpcMessage::cancel("c-10".into()).is_request());
		assert!(!RpcMessage::response("c-10".into(), json!(null)).is_request());
		assert_eq!(RpcMessage::cancel("c-10".into()).kind(), "cancel");
	}
}

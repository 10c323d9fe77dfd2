//! `frame-rpc inspect`: shows how a bridge listener would route raw traffic.

use std::io::{BufRead, Write};

use anyhow::Context;
use frame_rpc_protocol::RpcMessage;
use serde::Serialize;
use serde_json::Value;

/// Routing decision for one line of input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
	pub line: usize,
	/// `request`, `response`, `error`, `cancel`, or `foreign`.
	pub kind: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub correlation_id: Option<String>,
	/// `receiver` for requests and cancels, `caller` for replies.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InspectSummary {
	pub lines: usize,
	pub rpc: usize,
}

/// Classifies a single line. Lines that are not JSON count as foreign.
pub fn classify_line(line: usize, text: &str) -> Classification {
	let data = match serde_json::from_str::<Value>(text) {
		Ok(data) => data,
		Err(e) => {
			return Classification {
				line,
				kind: "foreign",
				correlation_id: None,
				path: None,
				error: Some(e.to_string()),
			};
		}
	};

	match RpcMessage::classify(&data) {
		Some(message) => Classification {
			line,
			kind: message.kind(),
			correlation_id: Some(message.correlation_id().to_string()),
			path: Some(if message.is_request() { "receiver" } else { "caller" }),
			error: None,
		},
		None => Classification {
			line,
			kind: "foreign",
			correlation_id: None,
			path: None,
			error: None,
		},
	}
}

/// Reads JSON lines from `input` and writes one classification per
/// non-blank line to `output`.
pub fn inspect<R: BufRead, W: Write>(input: R, output: &mut W) -> anyhow::Result<InspectSummary> {
	let mut summary = InspectSummary::default();
	for (index, line) in input.lines().enumerate() {
		let line = line.context("failed to read input")?;
		if line.trim().is_empty() {
			continue;
		}
		let classification = classify_line(index + 1, &line);
		summary.lines += 1;
		if classification.path.is_some() {
			summary.rpc += 1;
		}
		serde_json::to_writer(&mut *output, &classification)?;
		writeln!(output)?;
	}
	Ok(summary)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_each_kind() {
		let input = concat!(
			r#"{"kind":"request","correlationId":"a","method":"foo","args":[1,2],"target":""}"#,
			"\n",
			r#"{"kind":"response","correlationId":"a","result":3}"#,
			"\n\n",
			r#"{"kind":"error","correlationId":"b","message":"nope"}"#,
			"\n",
			r#"{"kind":"cancel","correlationId":"c"}"#,
			"\n",
			r#"{"type":"resize"}"#,
			"\n",
			"not json\n",
		);
		let mut out = Vec::new();
		let summary = inspect(input.as_bytes(), &mut out).unwrap();
		assert_eq!(summary, InspectSummary { lines: 6, rpc: 4 });

		let rows: Vec<Value> = String::from_utf8(out)
			.unwrap()
			.lines()
			.map(|l| serde_json::from_str(l).unwrap())
			.collect();
		let kinds: Vec<&str> = rows.iter().map(|r| r["kind"].as_str().unwrap()).collect();
		assert_eq!(kinds, ["request", "response", "error", "cancel", "foreign", "foreign"]);
		assert_eq!(rows[0]["path"], "receiver");
		assert_eq!(rows[1]["path"], "caller");
		assert_eq!(rows[2]["line"], 4);
		assert!(rows[5]["error"].is_string());
	}

	#[test]
	fn request_without_method_is_foreign() {
		let c = classify_line(1, r#"{"kind":"request","correlationId":"a"}"#);
		assert_eq!(c.kind, "foreign");
		assert!(c.correlation_id.is_none());
	}
}

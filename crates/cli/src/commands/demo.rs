//! `frame-rpc demo`: one host and N guests on an in-memory bus.
//!
//! The host serves guest calls through all four dispatch tiers and calls
//! back into every guest. Each outcome is printed as one JSON line.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, bail};
use frame_rpc::{Bridge, BridgeConfig, ChannelId, MessageBus, MethodTable, Stub};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::DemoArgs;

/// Outcome of one demo call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoCall {
	pub caller: String,
	pub callee: String,
	pub target: String,
	pub method: String,
	pub ok: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

pub(crate) fn load_config(args: &DemoArgs) -> anyhow::Result<BridgeConfig> {
	let mut config = match &args.config {
		Some(path) => BridgeConfig::from_path(path)
			.with_context(|| format!("failed to load config from {}", path.display()))?,
		None => BridgeConfig::default(),
	};
	if let Some(ms) = args.timeout_ms {
		config.default_timeout_ms = ms;
	}
	config.validate()?;
	if args.guests == 0 {
		bail!("--guests must be at least 1");
	}
	Ok(config)
}

fn host_capabilities(guests: usize) -> MethodTable {
	let storage: Arc<Mutex<HashMap<String, Value>>> = Arc::default();
	let writer = Arc::clone(&storage);
	MethodTable::new()
		.typed("setItem", move |(key, value): (String, Value)| {
			writer.lock().insert(key, value);
			async { Ok(()) }
		})
		.typed("getItem", move |(key,): (String,)| {
			let value = storage.lock().get(&key).cloned();
			async move { Ok(value) }
		})
		.property("hostInfo", move || json!({ "name": "frame-rpc demo host", "guests": guests }))
}

fn guest_handlers(channel: ChannelId) -> MethodTable {
	MethodTable::new().typed("render", move |(title,): (String,)| {
		let channel = channel.clone();
		async move { Ok(format!("<h1>{title}</h1> rendered by {channel}")) }
	})
}

async fn record(caller: &str, callee: &str, stub: &Stub, method: &str, args: Vec<Value>) -> DemoCall {
	let outcome = stub.invoke(method, args).await;
	if let Err(e) = &outcome {
		tracing::debug!(caller, method, error = %e, "demo call failed");
	}
	DemoCall {
		caller: caller.to_string(),
		callee: callee.to_string(),
		target: stub.target().to_string(),
		method: method.to_string(),
		ok: outcome.is_ok(),
		error: outcome.as_ref().err().map(ToString::to_string),
		result: outcome.ok(),
	}
}

/// Runs the demo and writes one JSON line per call to `out`.
pub async fn run_demo<W: Write>(config: BridgeConfig, guests: usize, out: &mut W) -> anyhow::Result<Vec<DemoCall>> {
	let bus = MessageBus::new();
	let host = Bridge::new(bus.open(), config.clone()).context("failed to create host bridge")?;
	host.dispatcher().register_global_handler(Arc::new(
		MethodTable::new()
			.typed("ping", |()| async { Ok("pong") })
			.method("echo", |args| async move { Ok(Value::Array(args)) }),
	));
	host.dispatcher().set_local_capabilities(Arc::new(host_capabilities(guests)));
	host.listen();
	if let Some(remote) = &config.remote {
		tracing::info!(endpoint = %remote.endpoint, modules = ?remote.modules.keys().collect::<Vec<_>>(), "remote modules enabled");
	}

	let guest_config = BridgeConfig {
		remote: None,
		..config
	};
	let mut frames = Vec::with_capacity(guests);
	for i in 0..guests {
		let channel = ChannelId::from(format!("guest-{i}"));
		let guest = Bridge::new(bus.open(), guest_config.clone()).context("failed to create guest bridge")?;
		guest.dispatcher().register_global_handler(Arc::new(guest_handlers(channel.clone())));
		guest.listen();

		host.dispatcher().endpoints().register(channel.clone(), guest.window());
		let greeting = channel.clone();
		host.dispatcher().register_handler(
			channel.clone(),
			Arc::new(MethodTable::new().typed("hello", move |(name,): (String,)| {
				let greeting = format!("hello {name}, you are {greeting}");
				async move { Ok(greeting) }
			})),
		);
		frames.push((channel, guest));
	}
	tracing::info!(host = %host.window(), guests, "demo bridges ready");

	let mut calls = Vec::new();
	for (i, (channel, guest)) in frames.iter().enumerate() {
		let caller = channel.as_str();
		let to_host = guest.stub(host.window(), "");
		let key = format!("{channel}/visits");
		let script: [(&str, Vec<Value>); 7] = [
			("hello", vec![json!(caller)]),
			("ping", vec![]),
			("echo", vec![json!(i), json!("two")]),
			("setItem", vec![json!(key), json!(i + 1)]),
			("getItem", vec![json!(key)]),
			("hostInfo", vec![]),
			("launchRockets", vec![]),
		];
		for (method, args) in script {
			calls.push(record(caller, "host", &to_host, method, args).await);
		}
	}
	for (channel, _) in &frames {
		let to_guest = host.channel_stub(channel, "")?;
		calls.push(record("host", channel.as_str(), &to_guest, "render", vec![json!("Welcome")]).await);
	}

	for call in &calls {
		serde_json::to_writer(&mut *out, call)?;
		writeln!(out)?;
	}

	for (_, guest) in &frames {
		guest.dispose();
	}
	host.dispose();
	Ok(calls)
}

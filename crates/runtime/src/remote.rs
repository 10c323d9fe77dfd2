//! Network-backed module proxies (the last dispatch tier).
//!
//! A [`RemoteModules`] factory turns a module name into a handler whose
//! methods perform a network round trip. [`JsonRpcModules`] speaks JSON-RPC
//! 2.0 over HTTP: method `f` of module `m` becomes the JSON-RPC method `m_f`
//! with the call's positional arguments as array params.

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonrpsee::core::ClientError;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde_json::{Value, json};

use crate::config::RemoteConfig;
use crate::dispatch::{CallFuture, Handler, HandlerError};
use crate::error::{Error, Result};

/// Factory for remote module proxies.
pub trait RemoteModules: Send + Sync {
	/// Returns a proxy for `name`, or `None` when no such module exists.
	fn module(&self, name: &str) -> Option<Arc<dyn Handler>>;
}

/// [`RemoteModules`] over a JSON-RPC HTTP endpoint.
pub struct JsonRpcModules {
	client: Arc<HttpClient>,
	modules: BTreeMap<String, Option<Vec<String>>>,
}

impl JsonRpcModules {
	pub fn from_config(config: &RemoteConfig) -> Result<Self> {
		config.validate()?;
		let client = HttpClientBuilder::default()
			.request_timeout(config.request_timeout())
			.build(&config.endpoint)
			.map_err(|e| Error::Config(format!("remote endpoint '{}': {e}", config.endpoint)))?;
		tracing::debug!(endpoint = %config.endpoint, modules = config.modules.len(), "remote modules configured");

		Ok(Self {
			client: Arc::new(client),
			modules: config.modules.clone(),
		})
	}
}

impl RemoteModules for JsonRpcModules {
	fn module(&self, name: &str) -> Option<Arc<dyn Handler>> {
		let methods = self.modules.get(name)?;
		Some(Arc::new(JsonRpcModule {
			name: name.to_string(),
			client: Arc::clone(&self.client),
			methods: methods.clone(),
		}))
	}
}

struct JsonRpcModule {
	name: String,
	client: Arc<HttpClient>,
	methods: Option<Vec<String>>,
}

impl Handler for JsonRpcModule {
	fn has_method(&self, method: &str) -> bool {
		self.methods
			.as_ref()
			.is_none_or(|allowed| allowed.iter().any(|m| m == method))
	}

	fn call(&self, method: &str, args: Vec<Value>) -> CallFuture {
		let rpc_method = format!("{}_{}", self.name, method);
		let client = Arc::clone(&self.client);
		Box::pin(async move {
			let mut params = ArrayParams::new();
			for arg in args {
				params.insert(arg)?;
			}
			tracing::debug!(method = %rpc_method, "forwarding call to remote module");
			client
				.request::<Value, _>(&rpc_method, params)
				.await
				.map_err(|e| client_error(&rpc_method, e))
		})
	}

	fn methods(&self) -> Vec<String> {
		self.methods.clone().unwrap_or_default()
	}
}

fn client_error(rpc_method: &str, err: ClientError) -> HandlerError {
	match err {
		ClientError::Call(call) => {
			let data = call
				.data()
				.and_then(|raw| serde_json::from_str::<Value>(raw.get()).ok());
			HandlerError::new(call.message().to_string()).with_details(json!({
				"code": call.code(),
				"data": data,
			}))
		}
		other => HandlerError::new(format!("Remote call '{rpc_method}' failed: {other}")),
	}
}

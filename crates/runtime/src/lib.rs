//! frame-rpc runtime: an RPC bridge over a cross-context messaging channel.
//!
//! Lets a host context and the guest contexts it embeds call each other's
//! methods as async functions, using nothing but fire-and-forget message
//! posting between them:
//!
//! - **Transport**: the messaging port ([`Transport`], in-memory [`MessageBus`])
//! - **Pending calls**: correlation and timeouts for outgoing calls
//! - **Stubs**: per-target proxies turning method calls into requests
//! - **Identity**: maps a sender to the logical channel it was registered as
//! - **Dispatcher**: resolves inbound calls through ordered handler tiers
//! - **Remote modules**: JSON-RPC backed last tier for unresolved targets
//!
//! # Architecture
//!
//! ```text
//!  caller side                               receiver side
//! ┌────────────┐   Request {correlationId}   ┌──────────────┐
//! │ Stub       │ ──────────────────────────▶ │ Dispatcher   │
//! │  Pending   │                             │  channel     │
//! │  Calls     │ ◀────────────────────────── │  global      │
//! └────────────┘   Response | Error          │  local       │
//!                                            │  remote ─────┼──▶ JSON-RPC
//!                                            └──────────────┘
//! ```
//!
//! Both halves live in one [`Bridge`] per messaging port; either side of a
//! connection can call and serve.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod pending;
pub mod remote;
pub mod stub;
pub mod transport;

pub use bridge::Bridge;
pub use config::{BridgeConfig, RemoteConfig};
pub use dispatch::{CallFuture, Dispatcher, Handler, HandlerError, MethodTable, Reply, Resolved, Tier};
pub use error::{Error, Result};
pub use frame_rpc_protocol::{CorrelationId, RpcMessage};
pub use identity::{ChannelId, EndpointRegistry};
pub use pending::PendingCalls;
pub use remote::{JsonRpcModules, RemoteModules};
pub use stub::Stub;
pub use transport::{MessageBus, MessageEvent, Transport, TransportParts, WindowRef};

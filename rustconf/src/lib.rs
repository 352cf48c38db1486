//! # Rustconf
//!
//! Async NETCONF client library over SSH.
//!
//! Rustconf provides a high-level async API for managing network devices
//! with the NETCONF protocol (RFC 6241), addressing configuration and
//! state with XPath-style expressions, similar to Python's ncclient and
//! the netconf-console tool.
//!
//! ## Features
//!
//! - Async SSH `netconf` subsystem transport via russh
//! - End-of-message framing with bounded buffering
//! - Request/reply multiplexing by `message-id` over one channel
//! - XPath-addressed get, edit-config, and arbitrary RPCs
//! - Schema-guided resolution of wildcard XPaths (`//`, `*`)
//! - Event notification subscriptions as cancellable streams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rustconf::{Client, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rustconf::Error> {
//!     let client = Client::builder("192.0.2.1")
//!         .port(830)
//!         .credentials("admin", "secret")
//!         .build();
//!
//!     // Read operational data, pruned to the addressed node.
//!     let reply = client.get_data("/interfaces/interface", None).await?;
//!     println!("{:?}", reply.result);
//!
//!     // Merge configuration into a list entry.
//!     let values = Value::map([("mtu", Value::Int(9000))]);
//!     client
//!         .edit_config_merge(r#"/interfaces/interface[name="eth1"]"#, &values)
//!         .await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod framer;
pub mod resolver;
pub mod session;
pub mod transport;
pub mod value;

// Re-export main types for convenience
pub use client::{Client, ClientBuilder, DataKind, SubscriptionOption};
pub use error::{Error, RpcError};
pub use resolver::resolve_xpath;
pub use session::{Envelope, ReplyStream, ServerHello, Session, SessionState};
pub use transport::{ConnectionConfig, Namespaces};
pub use value::Value;

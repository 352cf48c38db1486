//! High-level NETCONF client API.
//!
//! The client layer turns XPath-addressed operations (get, edit-config,
//! arbitrary RPCs, subscriptions) into session requests, and
//! post-processes the replies.

mod builder;
mod netconf;

pub use builder::ClientBuilder;
pub use netconf::{
    Client, DataKind, SubscriptionOption, DATASTORES_NS, NMDA_NS, NOTIFICATION_NS, YANG_NS,
};

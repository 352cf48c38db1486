//! NETCONF session layer.
//!
//! A [`Session`] runs the hello handshake, assigns `message-id`s,
//! multiplexes any number of in-flight requests over one SSH subsystem
//! channel, and manages the `Uninitialized → Connecting → Ready → Closed`
//! lifecycle. Replies are correlated strictly by `message-id`; a
//! subscription keeps its waiter attached and receives notifications
//! through a [`ReplyStream`].

mod core;
mod demux;
mod response;
mod stream;

pub use self::core::{Session, BASE_CAPABILITY, BASE_NS};
pub use demux::SessionState;
pub use response::{Envelope, ServerHello};
pub use stream::ReplyStream;

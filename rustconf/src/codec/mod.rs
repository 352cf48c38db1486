//! XML ↔ tree codec.
//!
//! This is the only layer aware of the reserved `$` (attributes) and `_`
//! (text) mapping keys. Encoding turns a [`Value`](crate::Value) tree into
//! NETCONF XML; decoding parses server XML back into a tree; classification
//! and error extraction give the session layer a cheap view of what a
//! message is before (or after) full decoding.

mod decode;
mod encode;
mod reply;

pub use decode::decode;
pub use encode::encode;
pub use reply::{classify, extract_error, value_text, MessageClass};

//! WebSocket layer: transport ownership and wire frame handling.
//!
//! The transport dials `<endpoint>?id=<identity>` and carries chat
//! messages as plain text alongside JSON-tagged control frames.

pub mod messages;
pub mod transport;

pub use messages::{ControlFrame, Inbound};
pub use transport::{Transport, TransportEvent};

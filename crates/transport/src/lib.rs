//! Bounded per-connection queues and egress framing shared by the server's
//! WebSocket handler and the client's `tokio-tungstenite` connection.
//!
//! The wire transport itself (axum `WebSocketUpgrade` on the server,
//! `tokio-tungstenite` on the client) lives in the `server` and `client`
//! crates; this crate owns the backpressure model that binds capture,
//! pipeline, and playback regardless of which socket library is on the
//! other end of a channel.

pub mod error;
pub mod frame;
pub mod queue;

pub use error::{Result, TransportError};
pub use frame::EgressItem;
pub use queue::{egress_channel, EgressReceiver, EgressSender, IngressQueue};

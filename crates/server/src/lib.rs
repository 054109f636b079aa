//! WebSocket and HTTP server binding the pipeline to the network.

pub mod connection;
pub mod error;
pub mod http;
pub mod metrics;
pub mod state;
pub mod websocket;

pub use error::{Result, ServerError};
pub use http::create_router;
pub use metrics::install_recorder;
pub use state::AppState;

//! # keywatch-client
//!
//! Network transports for `keywatch-sync`:
//!
//! - [`HttpDashboardApi`]: the pull and command endpoints over HTTP, decoding
//!   the `{code, message, data}` envelope
//! - [`WsConnector`]: the push channel over a WebSocket

mod http;
mod push;

pub use http::HttpDashboardApi;
pub use push::WsConnector;

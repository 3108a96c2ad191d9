//! Chrome DevTools Protocol plumbing: session lifecycle and DOM actions.

pub mod actions;
mod session;

pub use session::{
    BrowserError, ConnectTarget, Session, SessionOptions, discover_websocket_url,
};

//! Client side of the desk: a typed HTTP client and the reply poller.

pub mod http;
pub mod watcher;

pub use http::DeskClient;
pub use watcher::{LogNotifier, MessageSource, ReplyEvent, ReplyNotifier, ReplyWatcher};

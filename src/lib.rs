pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use db::DeskStorage;
pub use error::DeskError;
pub use router::{DeskState, desk_router};

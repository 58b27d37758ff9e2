pub mod admin;
pub mod messages;
pub mod sessions;
pub mod system;
pub mod user;

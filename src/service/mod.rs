pub mod accounts;
pub mod classifier;
pub mod cleanup;
pub mod password;
pub mod summary;

pub mod client;
pub mod coordinator;
pub mod filename;
pub mod handlers;

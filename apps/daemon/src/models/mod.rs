pub mod history;
pub mod messages;
pub mod profile;
pub mod settings;
pub mod status;

pub mod coordinator;
pub mod models;
pub mod settings;
pub mod store;

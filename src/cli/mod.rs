pub mod discover;
pub mod status;

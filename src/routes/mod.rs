pub mod admin;
pub mod patient;
pub mod public;

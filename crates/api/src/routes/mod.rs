pub mod auth;
pub mod essays;
pub mod prompts;
pub mod reading;
pub mod writing;

pub mod cli;
pub mod config;
pub mod console;
pub mod crypto;
pub mod errors;
pub mod merge;
pub mod store;

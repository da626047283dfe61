pub mod config;
pub mod errors;
pub mod extraction;
pub mod fetch;
pub mod history;
pub mod resolution;
pub mod scanner;
pub mod store;
pub mod types;

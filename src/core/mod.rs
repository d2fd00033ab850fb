pub mod config;
pub mod district;
pub mod errors;
pub mod jurisdiction;
pub mod types;

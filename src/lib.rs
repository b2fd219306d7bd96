pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod poll;
pub mod report;
pub mod services;
pub mod state;
pub mod store;
pub mod types;
pub mod workers;

pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod supervisor;
pub mod writer;

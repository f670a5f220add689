pub mod config;
pub mod confluence;
pub mod dedup;
pub mod error;
pub mod health;
mod http;
pub mod jira;
pub mod lister;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod supervisor;
pub mod tree;

//! Fetch secrets from vault and write them into files

pub mod aws;
pub mod config;
pub mod files;
pub mod kv;
pub mod observer;
pub mod pipeline;
pub mod scrub;
pub mod vault;

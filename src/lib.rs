//! Common functionality for evalloc, an allocator of EV charging infrastructure.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod distribution;
pub mod event;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod occupancy;
pub mod output;
pub mod postprocess;
pub mod rebalance;
pub mod sampler;
pub mod settings;
pub mod simulation;
pub mod site;
pub mod spatial;
pub mod time_limit;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the path to the folder holding program configuration
pub fn get_evalloc_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform, so fall back to the working directory
        return PathBuf::new();
    };
    config_dir.push("evalloc");
    config_dir
}

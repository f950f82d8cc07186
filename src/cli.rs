//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. The two paths point at the JSON configuration documents
//! loaded at startup; everything else is configured through those files.

use clap::Parser;
use std::path::PathBuf;

/// Bridges MQTT topics to ntfy push notifications.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the module configuration file (topic mappings, logging).
    #[arg(short, long, value_name = "FILE", default_value = "configuration.json")]
    pub config: PathBuf,

    /// Path to the device configuration file (broker connection, base logging).
    #[arg(short, long, value_name = "FILE", default_value = "device.json")]
    pub device_config: PathBuf,
}

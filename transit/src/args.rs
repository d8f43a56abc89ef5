use std::path::PathBuf;

use clap::Parser;

/// Transit API relay
#[derive(Debug, Parser)]
#[command(name = "transit", about = "Multi-tenant relay for model inference providers")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "transit.toml", env = "TRANSIT_CONFIG")]
    pub config: PathBuf,
}

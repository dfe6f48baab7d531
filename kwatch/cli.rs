use clap::Parser;
use std::path::PathBuf;

/// kwatch watches labeled ConfigMaps and Secrets and materializes them as files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, short, env = "KWATCH_CONFIG")]
    pub config: PathBuf,
}

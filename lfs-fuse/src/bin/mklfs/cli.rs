use clap::Parser;
use std::path::PathBuf;

/// Synthesize an lfs image from host files
#[derive(Parser)]
pub struct Cli {
    /// Target image path
    pub image: PathBuf,

    /// Files packed into the root directory
    pub files: Vec<PathBuf>,
}

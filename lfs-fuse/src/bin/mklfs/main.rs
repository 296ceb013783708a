mod cli;

use std::fs::File;
use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use lfs::{FSSIZE, NMETA};
use lfs_fuse::builder::{target_name, ImageBuilder};
use lfs_fuse::error::{BuildError, Result};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mklfs: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    println!(
        "nmeta {} (boot, super, checkpoint1, checkpoint2) blocks {} total {}",
        NMETA,
        FSSIZE - NMETA,
        FSSIZE
    );

    let mut builder = ImageBuilder::create(&cli.image)?;
    for path in &cli.files {
        let name = target_name(path)?;
        log::info!("file={name:?}");

        let mut host_file = File::open(path).map_err(|e| BuildError::io(path.display(), e))?;
        builder.add_file(name, &mut host_file)?;
    }
    let freeblock = builder.finish()?;

    println!("balloc: first {freeblock} blocks have been allocated");
    Ok(())
}

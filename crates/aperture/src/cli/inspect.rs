//! The `aperture inspect` command.

use aperture_core::read_metadata;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Image to read
    pub file: PathBuf,
}

/// Print the embedded capture metadata as JSON.
pub async fn execute(args: InspectArgs) -> anyhow::Result<()> {
    if !args.file.exists() {
        anyhow::bail!("File not found: {}", args.file.display());
    }

    let Some(metadata) = read_metadata(&args.file) else {
        anyhow::bail!("No readable metadata in {}", args.file.display());
    };

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

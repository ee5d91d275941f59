//! FogStripper CLI Tool
//!
//! Command-line front end for the background removal, cleanup, upscaling and
//! recompositing pipeline.

#[cfg(feature = "cli")]
use fogstripper::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}

//! bgtouch CLI tool
//!
//! Command-line interface for batch background removal and flood-fill
//! touch-up built on the bgtouch library.

#[cfg(feature = "cli")]
use bgtouch::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}

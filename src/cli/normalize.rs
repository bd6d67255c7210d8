//! Normalize command implementation.

use crate::number::normalize;
use clap::Args;

/// Arguments for the normalize command
#[derive(Args)]
pub struct NormalizeArgs {
    /// Phone numbers as typed, e.g. "(555) 123-4567"
    #[arg(required = true)]
    pub numbers: Vec<String>,
}

/// Run the normalize command
pub async fn run(args: NormalizeArgs) -> anyhow::Result<()> {
    for number in &args.numbers {
        println!("{}", normalize(number));
    }
    Ok(())
}

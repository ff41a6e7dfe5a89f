use clap::Parser;

/// Ethereum confirmation-time model CLI arguments
///
/// Every flag is optional and overrides the matching environment variable.
#[derive(Debug, Default, Parser)]
#[command(
    name = "eth-gas-model",
    version,
    about = "Fit a Poisson model of Ethereum confirmation delay from mined-transaction history"
)]
pub struct Cli {
    /// Source table of mined transactions
    #[arg(long)]
    pub table: Option<String>,

    /// Model formula, e.g. "confirmTime ~ hashpower_accepting + highgas2 + tx_atabove"
    #[arg(long)]
    pub formula: Option<String>,

    /// Maximum IRLS iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Deviance change that counts as converged
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Rows shown at the head and tail of long tables
    #[arg(long)]
    pub preview_rows: Option<usize>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

//! Command-line argument parsing for the DOCI solver

use clap::Parser;

/// DOCI 2-RDM optimisation with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override the final barrier weight
    #[arg(long)]
    pub target: Option<f64>,

    /// Override the initial inner-loop tolerance
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Override the barrier reduction factor
    #[arg(long)]
    pub reduction_factor: Option<f64>,

    /// Write the optimal 2-RDM to this JSON file
    #[arg(long)]
    pub rdm_out: Option<String>,

    /// Append per-iteration progress lines to this file
    #[arg(long)]
    pub progress: Option<String>,

    /// Also compute the exact DOCI energy by diagonalisation
    #[arg(long)]
    pub reference: bool,

    /// Drop the two-hole condition Q >= 0
    #[arg(long)]
    pub no_hole_condition: bool,
}

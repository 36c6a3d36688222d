//! DOCI 2-RDM Command-Line Interface
//!
//! Bounds the seniority-zero ground-state energy from below by optimising the
//! 2-RDM under the two-particle and two-hole conditions, driven by a YAML file.

mod app;
mod config;

use app::DociApplication;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    DociApplication::from_cli()?.run()
}

mod report;
mod runner;

pub use runner::{build_integrals, configure_solver};

use self::report::{report_reference, report_summary};
use crate::config::{Args, Config};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use doci_sdp::io::setup_output;
use doci_sdp::{CancellationToken, Method};
use std::fs;
use tracing::info;

pub struct DociApplication {
    args: Args,
    config: Config,
}

impl DociApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());
        info!("Reading configuration from: {}", self.args.config_file);

        let integrals = build_integrals(&self.config)?;
        let mut solver = configure_solver(&integrals, &self.args, &self.config)?;

        let report = solver
            .run(&CancellationToken::new())
            .wrap_err("Potential reduction failed")?;
        report_summary(&solver, &report);

        if let Some(path) = self.args.rdm_out.as_ref().or(self.config.output.rdm.as_ref()) {
            solver
                .save_rdm(path)
                .wrap_err_with(|| format!("Unable to write 2-RDM to {}", path))?;
            info!("Optimal 2-RDM written to: {}", path);
        }

        if self.args.reference || self.config.is_reference_enabled() {
            report_reference(&integrals, report.energy)?;
        }

        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}

//! Prints a 2-RDM written by the solver
//!
//! Shows the stored blocks, their traces and the orbital occupations derived
//! from the 1-RDM contraction.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use doci_sdp::io::load_rdm;
use doci_sdp::Tpm;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding the 2-RDM
    #[arg(short, long, default_value = "optimal-rdm.json")]
    rdm: String,

    /// Print the orbital occupations
    #[arg(short = '1', long)]
    one_rdm: bool,

    /// Print the pair and product blocks
    #[arg(short = '2', long)]
    two_rdm: bool,

    /// Sort occupations in decreasing order
    #[arg(short, long)]
    sort: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let rdm = load_rdm(&args.rdm).wrap_err_with(|| format!("Unable to read {}", args.rdm))?;
    let show_all = !args.one_rdm && !args.two_rdm;

    if args.two_rdm || show_all {
        print!("{}", rdm);
        println!("pair trace:    {:.12}", rdm.pair_trace());
        println!("product trace: {:.12}", rdm.products_trace());
        println!("trace:         {:.12}", rdm.trace());
    }
    if args.one_rdm || show_all {
        print_occupations(&rdm, args.sort);
    }
    Ok(())
}

fn print_occupations(rdm: &Tpm, sort: bool) {
    let mut occupations: Vec<(usize, f64)> = rdm.one_rdm().iter().copied().enumerate().collect();
    if sort {
        occupations.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    println!("orbital occupations:");
    for (orbital, occupation) in &occupations {
        println!("{:>4}  {:>18.12}", orbital, occupation);
    }
    let total: f64 = occupations.iter().map(|(_, occupation)| occupation).sum();
    println!("sum: {:.12}", total);
}

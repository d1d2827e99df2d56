//! Command-line front-end for the weighted-Voronoi engine.
//!
//! Usage:
//!     wevo run sites.pnts --svg diagram.svg --csv bench.csv
//!     wevo gen sites.pnts -n 50

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;
use wevo_core::VorDiag;

mod input;
mod render;

#[derive(Parser)]
#[command(name = "wevo")]
#[command(version)]
#[command(about = "Multiplicatively weighted Voronoi diagrams by wavefront sweep", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the diagram of a site file
    Run {
        /// Input file, one whitespace-separated "x y weight" triple per line
        input: PathBuf,

        /// Write an SVG rendering of the diagram
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Append a statistics row to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Generate a random site file
    Gen {
        /// Output file
        output: PathBuf,

        /// Number of sites
        #[arg(short = 'n', long, default_value_t = 10)]
        size: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Commands::Run { input, svg, csv } => run(&input, svg.as_deref(), csv.as_deref()),
        Commands::Gen { output, size } => input::generate(&output, size),
    }
}

fn run(input: &Path, svg: Option<&Path>, csv: Option<&Path>) -> Result<()> {
    let records = input::read_pnts(input)?;
    let n = records.len();

    println!("Computing the diagram of {n} sites ...");
    let t0 = Instant::now();
    let diag = VorDiag::build(&records, None)
        .with_context(|| format!("computing the diagram of {}", input.display()))?;
    let runtime = t0.elapsed().as_micros();

    let stats = diag.stats();
    let norm = if n > 1 {
        runtime as f64 / (n as f64 * (n as f64).log2().powi(2))
    } else {
        runtime as f64
    };

    println!("Run successful!");
    println!("The overall runtime equals {runtime} microseconds.");
    println!("The runtime divided through n log(n)^2 equals {norm:.1} microseconds.");
    println!("Overall");
    println!("\t{} valid collision events,", stats.coll_evs);
    println!("\t{} valid domination events, and", stats.dom_evs);
    println!("\t{} valid edge events took place.", stats.edge_evs);
    println!("Additionally,");
    println!("\t{} invalid collision events,", stats.invalid_coll_evs);
    println!("\t{} invalid domination events, and", stats.invalid_dom_evs);
    println!("\t{} invalid edge events were ignored.", stats.invalid_edge_evs);
    println!("\t{} Voronoi nodes have been found.", stats.vor_verts);

    if let Some(svg) = svg {
        println!("Writing output to {} ...", svg.display());
        render::write_svg(svg, &diag)?;
    }

    if let Some(csv) = csv {
        println!("Writing output to {} ...", csv.display());
        append_csv(csv, n, runtime, &diag)?;
    }

    Ok(())
}

/// Appends one benchmark row: site count, runtime, valid and invalid
/// event counts, vertex count.
fn append_csv(path: &Path, n: usize, runtime: u128, diag: &VorDiag) -> Result<()> {
    let stats = diag.stats();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(
        file,
        "{},{},{},{},{},{},{},{},{}",
        n,
        runtime,
        stats.coll_evs,
        stats.dom_evs,
        stats.edge_evs,
        stats.invalid_coll_evs,
        stats.invalid_dom_evs,
        stats.invalid_edge_evs,
        stats.vor_verts
    )?;
    Ok(())
}

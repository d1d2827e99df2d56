//! Site-file input and random instance generation.

use anyhow::{bail, Context, Result};
use rand::Rng;
use std::fs;
use std::path::Path;
use wevo_core::SiteRecord;

/// Reads a `.pnts` file: one whitespace-separated integer
/// `x y weight` triple per line, blank lines ignored.
pub fn read_pnts(path: &Path) -> Result<Vec<SiteRecord>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            bail!(
                "{}:{}: expected \"x y weight\", got {:?}",
                path.display(),
                lineno + 1,
                line
            );
        }
        let parse = |s: &str, what: &str| -> Result<i64> {
            s.parse()
                .with_context(|| format!("{}:{}: bad {what} {s:?}", path.display(), lineno + 1))
        };
        records.push(SiteRecord {
            x: parse(fields[0], "x coordinate")?,
            y: parse(fields[1], "y coordinate")?,
            weight: parse(fields[2], "weight")?,
        });
    }
    Ok(records)
}

/// Writes a random instance: coordinates uniform in ±1e7, pairwise
/// distinct weights drawn from 1e3..1e7.
pub fn generate(path: &Path, size: usize) -> Result<()> {
    const MIN_WEIGHT: usize = 1_000;
    const MAX_WEIGHT: usize = 10_000_000;
    const SPAN: i64 = 10_000_000;

    let mut rng = rand::rng();
    let weights = rand::seq::index::sample(&mut rng, MAX_WEIGHT - MIN_WEIGHT, size);

    let mut out = String::new();
    for w in weights.iter() {
        let x = rng.random_range(-SPAN..=SPAN);
        let y = rng.random_range(-SPAN..=SPAN);
        out.push_str(&format!("{} {} {}\n", x, y, MIN_WEIGHT + w));
    }

    fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {size} sites to {}.", path.display());
    Ok(())
}

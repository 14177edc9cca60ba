use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use odds_engine::reference::{ReferenceTable, normalize_name};

/// Resolve team names against a reference standings file and show which row
/// each one lands on.
#[derive(Debug, Parser)]
#[command(name = "reference_lookup")]
struct Args {
    /// Reference standings snapshot (JSON).
    #[arg(long)]
    file: PathBuf,
    #[arg(required = true)]
    names: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let table = ReferenceTable::load(&args.file)?;
    println!("Reference: {} ({} teams)", args.file.display(), table.len());
    for name in args.names {
        match table.lookup(&name) {
            Some(row) => println!(
                "{name:?} [{}] -> {} P{} W{} D{} L{}",
                normalize_name(&name),
                row.team_name,
                row.played,
                row.wins,
                row.draws,
                row.losses
            ),
            None => println!("{name:?} [{}] -> no match", normalize_name(&name)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_flag_and_names_parse_in_any_order() {
        let args = Args::try_parse_from([
            "reference_lookup",
            "Ipswich",
            "--file",
            "ref.json",
            "Luton Town",
        ])
        .unwrap();
        assert_eq!(args.file, PathBuf::from("ref.json"));
        assert_eq!(args.names, vec!["Ipswich".to_string(), "Luton Town".to_string()]);

        let args = Args::try_parse_from(["reference_lookup", "--file=ref.json", "Ipswich"]).unwrap();
        assert_eq!(args.file, PathBuf::from("ref.json"));
    }

    #[test]
    fn names_are_required() {
        assert!(Args::try_parse_from(["reference_lookup", "--file", "ref.json"]).is_err());
        assert!(Args::try_parse_from(["reference_lookup", "Ipswich"]).is_err());
    }
}

//! pcmscan CLI - batch extraction of project cost sheets

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pcmscan_engine::{generate, scan_folder, CancelFlag, ProjectRecord};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pcmscan")]
#[command(
    author,
    version,
    about = "Extract, dedupe and summarize project cost spreadsheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a folder of cost sheets and print the extraction results
    Scan {
        /// Folder containing .xls/.xlsx cost sheets
        folder: PathBuf,
    },

    /// Scan a folder, then write renamed copies and the summary report
    #[command(alias = "gen")]
    Generate {
        /// Folder containing .xls/.xlsx cost sheets
        folder: PathBuf,

        /// Output folder (default: the input folder)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { folder } => scan(&folder),
        Commands::Generate { folder, output } => {
            let output = output.unwrap_or_else(|| folder.clone());
            run_generate(&folder, &output)
        }
    }
}

fn scan(folder: &PathBuf) -> Result<()> {
    let records = scan_folder(folder, &CancelFlag::new());
    print_records(&records);
    Ok(())
}

fn run_generate(folder: &PathBuf, output: &PathBuf) -> Result<()> {
    let records = scan_folder(folder, &CancelFlag::new());
    print_records(&records);

    if records.iter().any(|r| r.is_exportable()) {
        let outcome = generate(&records, output, &CancelFlag::new())
            .with_context(|| format!("Failed to generate into '{}'", output.display()))?;

        println!();
        println!("Copied {} files to '{}'", outcome.copied, output.display());
        println!("Report: {}", outcome.report_path.display());
    } else {
        println!();
        println!("Nothing to export");
    }

    Ok(())
}

fn print_records(records: &[ProjectRecord]) {
    if records.is_empty() {
        println!("No spreadsheet files found");
        return;
    }

    println!(
        "{:<32} {:<15} {:<12} {:<10} {}",
        "File", "Status", "Project", "Date", "Detail"
    );
    for record in records {
        println!(
            "{:<32} {:<15} {:<12} {:<10} {}",
            record.source_file_name,
            record.status,
            record.project_id.trim(),
            record.project_date_display,
            record.error_message.as_deref().unwrap_or("")
        );
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.status.as_str()).or_insert(0) += 1;
    }

    println!();
    print!("{} files:", records.len());
    for (status, count) in &counts {
        print!(" {count} {status}");
    }
    println!();
}

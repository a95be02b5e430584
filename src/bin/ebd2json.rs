//! CLI tool extracting all EBD tables of a .docx file as JSON

use clap::Parser;
use ebd_docx::{extract_selected, Document, EbdKey, KeyOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "ebd2json",
    version,
    about = "Extract machine-readable EBD tables from an edi@energy .docx file"
)]
struct Cli {
    /// Path of the .docx file from which the EBDs shall be extracted
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the generated <key>.json files
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Only extract these keys (e.g. -k E_0003 -k E_0901)
    #[arg(short = 'k', long = "key")]
    keys: Vec<String>,

    /// Print a JSON summary of all keys to stdout
    #[arg(long, default_value_t = false)]
    json_report: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn write_json(path: &Path, json: &str) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, json)?;
    log::info!("Successfully exported '{}'", path.display());
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    // reject malformed keys before reading the document
    let keys = cli
        .keys
        .iter()
        .map(|k| EbdKey::parse(k))
        .collect::<Result<Vec<_>, _>>()?;

    let document = Document::open(&cli.input)?;

    if cli.output.exists() {
        log::warn!("The output directory '{}' exists already.", cli.output.display());
    } else {
        fs::create_dir_all(&cli.output)?;
        log::info!("Created a new directory at {}", cli.output.display());
    }

    let selection = (!keys.is_empty()).then_some(keys.as_slice());
    let report = extract_selected(&document, selection);

    for entry in &report.entries {
        let path = cli.output.join(format!("{}.json", entry.key));
        match &entry.outcome {
            KeyOutcome::Converted(table) => write_json(&path, &table.to_json()?)?,
            KeyOutcome::NoTable(section) => {
                let (chapter, section_label) = entry.metadata_labels();
                let metadata = section.to_metadata(&chapter, &section_label, &entry.ebd_name());
                write_json(&path, &serde_json::to_string_pretty(&metadata)?)?;
            }
            KeyOutcome::Failed(_) => {}
        }
    }

    if cli.json_report {
        println!("{}", serde_json::to_string_pretty(&report.summaries())?);
    } else {
        println!("EBD Extraction");
        println!("==============");
        println!("File: {}", cli.input.display());
        println!();
        for summary in report.summaries() {
            println!(
                "{} ({}) {}: {}",
                summary.key,
                summary.position,
                summary.status,
                summary.detail.unwrap_or_default()
            );
        }
        println!();
        println!(
            "Converted: {}  Without table: {}  Skipped: {}",
            report.converted_count(),
            report.no_table_count(),
            report.failed_count()
        );
    }
    Ok(())
}

//! Debug tool: dump the raw table fragments and column layout of one EBD key

use clap::Parser;
use ebd_docx::{locate_tables, Document, DocxTableConverter, EbdDocxTables, EbdKey};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "debug_ebd", about = "Show how the tables of one EBD key are read")]
struct Cli {
    docx: PathBuf,
    key: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), ebd_docx::EbdError> {
    let key = EbdKey::parse(&cli.key)?;
    let document = Document::open(&cli.docx)?;

    let located = locate_tables(document.blocks(), &key)?;
    if let EbdDocxTables::NoTable(section) = &located {
        println!("{}: no table. Remark: {}", key, section.remark);
        return Ok(());
    }

    let tables = located.tables();
    for (fragment_index, table) in tables.iter().enumerate() {
        println!("=== Fragment {} ({} rows) ===", fragment_index, table.rows.len());
        for (row_index, row) in table.rows.iter().enumerate() {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| {
                    let text = c.text.replace('\n', "\\n");
                    if c.grid_span > 1 {
                        format!("{}(span {})", text, c.grid_span)
                    } else {
                        text
                    }
                })
                .collect();
            println!("{:>3}: [{}] {}", row_index, row.len(), cells.join(" | "));
        }
    }

    match DocxTableConverter::new(tables, &key, "", "", key.as_str()) {
        Ok(converter) => {
            println!("\nLayout: {:?}", converter.layout());
            println!("Role: {}", converter.metadata().role);
            if let Err(e) = converter.convert_docx_tables_to_ebd_table() {
                println!("Conversion failed: {}", e);
            }
        }
        Err(e) => println!("\nLayout not resolved: {}", e),
    }
    Ok(())
}

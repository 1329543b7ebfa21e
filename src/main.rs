//! arffdata - Inspect and convert ARFF files
//!
//! Opens a file through the windowed reader, prints its shape and
//! optionally its first rows, and converts it to ARFF, CSV or JSON Lines.

use anyhow::{anyhow, Context, Result};
use argh::FromArgs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use arffdata::format::{self, OutputFormat, Summary};
use arffdata::{ArffParser, ReadOptions, DEFAULT_BUFFER_ROWS};

/// arffdata - inspect and convert ARFF files
#[derive(FromArgs)]
struct Args {
    /// path to the ARFF file to read
    #[argh(positional)]
    file: String,

    /// print the first N data rows
    #[argh(option, short = 'n')]
    head: Option<usize>,

    /// print the summary as JSON instead of text
    #[argh(switch)]
    json: bool,

    /// write the data to this path
    #[argh(option, short = 'o')]
    output: Option<String>,

    /// output format: arff, csv or jsonl (default: from the output extension)
    #[argh(option)]
    format: Option<String>,

    /// rows kept in memory while reading (default: 8192)
    #[argh(option, default = "DEFAULT_BUFFER_ROWS")]
    buffer_rows: usize,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let options = ReadOptions::default().with_buffer_rows(args.buffer_rows);
    let mut parser = ArffParser::open_with(&args.file, options)
        .with_context(|| format!("Failed to open ARFF file: {}", args.file))?;

    let summary = Summary::of_parser(&parser);
    if args.json {
        let json = serde_json::to_string_pretty(&summary).with_context(|| "Failed to serialize summary")?;
        println!("{json}");
    } else {
        print!("{summary}");
    }

    if let Some(n) = args.head {
        print_head(&mut parser, n)?;
    }

    if let Some(ref output) = args.output {
        convert(parser, &args, output)?;
    }

    Ok(())
}

/// Print the first `n` rows, tab separated, under a header of names.
fn print_head(parser: &mut ArffParser, n: usize) -> Result<()> {
    let names: Vec<&str> = parser.attributes().iter().map(|a| a.name()).collect();
    println!("{}", names.join("\t"));

    let rows = n.min(parser.row_count());
    for row in 0..rows {
        let values = format::row_values(parser, row).with_context(|| format!("Failed to read row {row}"))?;
        let fields: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("{}", fields.join("\t"));
    }
    Ok(())
}

fn convert(mut parser: ArffParser, args: &Args, output: &str) -> Result<()> {
    let target = match args.format {
        Some(ref name) => OutputFormat::parse(name).ok_or_else(|| anyhow!("Unknown output format: {name}"))?,
        None => OutputFormat::detect(output),
    };

    let rows = match target {
        OutputFormat::Arff => {
            let table = parser.into_table().with_context(|| "Failed to load rows")?;
            table
                .to_arff(Path::new(output))
                .with_context(|| format!("Failed to write ARFF file: {output}"))?;
            table.value_count().unwrap_or(0)
        }
        OutputFormat::Csv => format::write_csv(&mut parser, output)?,
        OutputFormat::Jsonl => format::write_jsonl(&mut parser, output)?,
    };

    eprintln!("Wrote {rows} rows to {output}");
    Ok(())
}

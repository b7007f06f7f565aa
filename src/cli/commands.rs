//! Command implementations for the nead CLI
//!
//! Runs the selected subcommand, sets up logging and prints the colored
//! summaries.

use crate::cli::args::{Args, Commands, ConvertArgs, InspectArgs};
use crate::conversion::converted_header;
use crate::models::{AttributeValue, Dataset};
use crate::reader::NeadReader;
use crate::writer::NeadWriter;
use anyhow::{Context, Result};
use colored::*;
use std::time::Instant;
use tracing::{debug, info};

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Commands::Inspect(inspect) => run_inspect(inspect),
        Commands::Convert(convert) => run_convert(convert),
    }
}

fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nead={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let dataset = NeadReader::new(args.read_options())
        .read(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;

    print_summary(&dataset, args.rows)?;
    Ok(())
}

fn run_convert(args: &ConvertArgs) -> Result<()> {
    let start_time = Instant::now();
    let read_options = args.read_options();

    info!("Converting {}", args.input.display());
    let dataset = NeadReader::new(read_options.clone())
        .read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let header = if read_options.convert_units {
        converted_header(&dataset.header, &dataset.table, &read_options)?
    } else {
        dataset.header.clone()
    };

    NeadWriter::new(args.write_options())
        .write(&dataset.table, &header, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "{} {} {} {} ({} rows, {:.2?})",
        "✓".bright_green().bold(),
        args.input.display().to_string().bright_cyan(),
        "→".bright_black(),
        args.output.display().to_string().bright_cyan(),
        dataset.table.height(),
        start_time.elapsed()
    );
    Ok(())
}

fn print_summary(dataset: &Dataset, preview_rows: usize) -> Result<()> {
    let header = &dataset.header;
    let table = &dataset.table;

    println!(
        "{} {}",
        header.format().bright_green().bold(),
        format!("({:?} header)", header.grammar()).to_lowercase().bright_black()
    );
    println!();

    println!("{}", "Global attributes".bright_white().bold());
    for (key, value) in header.global().iter() {
        let value = match value {
            AttributeValue::Scalar(scalar) => scalar.to_string(),
            AttributeValue::Array(array) => array.tokens().join(", "),
        };
        println!("  {} = {}", key.bright_yellow(), value);
    }
    println!();

    println!(
        "{} ({} rows)",
        "Fields".bright_white().bold(),
        table.height()
    );
    for (position, name) in header.fields().iter().enumerate() {
        let dtype = table
            .find(name)
            .map(|column| column.data().dtype().to_string())
            .unwrap_or_default();
        let attributes = header
            .column_attributes(position)
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "  {}. {} {} {}",
            (position + 1).to_string().bright_yellow(),
            name.bright_cyan(),
            format!("[{}]", dtype).bright_black(),
            attributes
        );
    }

    if preview_rows > 0 && table.height() > 0 {
        println!();
        println!("{}", "Preview".bright_white().bold());
        let frame = table.to_frame()?;
        println!("{}", frame.head(Some(preview_rows)));
    }
    Ok(())
}

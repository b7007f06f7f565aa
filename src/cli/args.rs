//! Command-line argument definitions for the nead tool
//!
//! Defines the CLI with the clap derive API and maps the parsed flags onto
//! [`ReadOptions`] and [`WriteOptions`].

use crate::config::{HeaderGrammar, NodataPolicy, ReadOptions, VectorLengthPolicy, WriteOptions};
use crate::constants::DEFAULT_FLOAT_PRECISION;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the NEAD reader and writer
#[derive(Debug, Clone, Parser)]
#[command(
    name = "nead",
    version,
    about = "Inspect and convert NEAD self-describing tabular files",
    long_about = "Reads NEAD files, whose commented header declares the delimiter, the field \
                  names and per-field attributes such as units and scale factors. Files can be \
                  summarised, or rewritten with units converted and an index column promoted."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(short = 'q', long = "quiet", global = true, help = "Only log errors")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Print the header model and column summary of a file
    Inspect(InspectArgs),
    /// Read a file and write it back, optionally converted and re-indexed
    Convert(ConvertArgs),
}

/// Header grammar selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GrammarArg {
    /// `[METADATA]` and `[FIELDS]` sections
    Sectioned,
    /// Single `[HEADER]` section
    Flat,
}

impl From<GrammarArg> for HeaderGrammar {
    fn from(value: GrammarArg) -> Self {
        match value {
            GrammarArg::Sectioned => HeaderGrammar::Sectioned,
            GrammarArg::Flat => HeaderGrammar::Flat,
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub struct InspectArgs {
    /// File to inspect
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Header grammar of the input
    #[arg(short = 'g', long = "grammar", value_enum, default_value = "sectioned")]
    pub grammar: GrammarArg,

    /// Number of data rows to preview
    #[arg(short = 'n', long = "rows", default_value_t = 5)]
    pub rows: usize,
}

impl InspectArgs {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions::default().with_grammar(self.grammar.into())
    }
}

#[derive(Debug, Clone, Parser)]
pub struct ConvertArgs {
    /// File to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// File to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Convert numeric columns to base units using their scale and offset
    #[arg(long = "mks")]
    pub mks: bool,

    /// Field position to promote to the row index
    #[arg(short = 'i', long = "index", value_name = "POSITION")]
    pub index: Option<usize>,

    /// Decimal places for floating-point cells
    #[arg(short = 'p', long = "precision", default_value_t = DEFAULT_FLOAT_PRECISION)]
    pub precision: usize,

    /// Header grammar of the input
    #[arg(short = 'g', long = "grammar", value_enum, default_value = "sectioned")]
    pub grammar: GrammarArg,

    /// Header grammar of the output; defaults to the input grammar
    #[arg(long = "output-grammar", value_enum)]
    pub output_grammar: Option<GrammarArg>,

    /// Keep mis-sized field vectors as scalars instead of failing
    #[arg(long = "lenient")]
    pub lenient: bool,

    /// Leave no-data cells empty after conversion instead of restoring the sentinel
    #[arg(long = "mask-nodata")]
    pub mask_nodata: bool,
}

impl ConvertArgs {
    pub fn read_options(&self) -> ReadOptions {
        let mut options = ReadOptions::default()
            .with_grammar(self.grammar.into())
            .with_unit_conversion(self.mks);
        options.index_column = self.index;
        if self.lenient {
            options = options.with_vector_length_policy(VectorLengthPolicy::Lenient);
        }
        if self.mask_nodata {
            options = options.with_nodata_policy(NodataPolicy::Mask);
        }
        options
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::default()
            .with_grammar(self.output_grammar.unwrap_or(self.grammar).into())
            .with_float_precision(self.precision)
    }
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }
}

//! Normalization core for locale-formatted census tables.
//!
//! The library turns a delimited, possibly Latin-1 encoded extract into typed
//! columns ([`ingest`], [`numeric`], [`category`]) and derives the views that
//! dashboards chart from it: adaptive size groups ([`binning`]), top / middle /
//! bottom rankings ([`rank`]) and correlation rankings ([`correlation`]).
//! [`pipeline`] chains the normalization steps according to a
//! [`config::CensusConfig`]; [`run`] drives the `census-tables` binary.

pub mod binning;
pub mod category;
pub mod cli;
pub mod commands;
pub mod config;
pub mod correlation;
pub mod data;
pub mod error;
pub mod ingest;
pub mod io_utils;
pub mod numeric;
pub mod pipeline;
pub mod rank;
pub mod table;

use std::{env, sync::OnceLock};

use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::{
    data::{Column, ColumnKind, Table, Value},
    error::{CensusError, ErrorClass, Result},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("census_tables", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = commands::resolve_config(&cli.global)?;
    debug!(
        "Using delimiter '{}' and encodings {:?}",
        printable_delimiter(config.delimiter_byte()?),
        config.encodings
    );
    match &cli.command {
        Commands::Clean(args) => commands::clean(args, &config),
        Commands::Porte(args) => commands::porte(args, &config),
        Commands::Rank(args) => commands::rank(args, &config),
        Commands::Correlate(args) => commands::correlate(args, &config),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

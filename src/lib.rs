pub mod cli;
pub mod coerce;
pub mod contract;
pub mod data;
pub mod frame;
pub mod io_utils;
pub mod normalize;
pub mod pipeline;
pub mod preview;
pub mod sink;
pub mod table;
pub mod type_map;
pub mod validate;
pub mod verify;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, InputArgs, SinkArgs},
    contract::SchemaContract,
    frame::Table,
    sink::{SinkTarget, SqliteSink},
    type_map::TypeMap,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("survey_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(err).context("Loading .env file");
    }
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Raw(args) => handle_raw(&args),
        Commands::Check(args) => verify::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let raw = load_input(&args.input)?;
    let type_map = TypeMap::load(&args.transform.types)?;
    let contract = SchemaContract::load(&args.transform.contract)
        .with_context(|| format!("Loading contract from {:?}", args.transform.contract))?;
    let target = sink_target(&args.sink, cli::DEFAULT_WORK_TABLE);
    let mut sink = open_sink(&args.sink)?;
    let written = pipeline::run(&raw, &type_map, &contract, &mut sink, &target)
        .with_context(|| format!("Ingesting {:?}", args.input.input))?;
    info!(
        "✓ {} row(s) from {:?} written to '{}'",
        written, args.input.input, target.table
    );
    Ok(())
}

fn handle_raw(args: &cli::RawArgs) -> Result<()> {
    let raw = load_input(&args.input)?;
    let target = sink_target(&args.sink, cli::DEFAULT_RAW_TABLE);
    let mut sink = open_sink(&args.sink)?;
    let written = pipeline::load_raw(&raw, &mut sink, &target)
        .with_context(|| format!("Landing {:?}", args.input.input))?;
    info!(
        "✓ {} raw row(s) from {:?} written to '{}'",
        written, args.input.input, target.table
    );
    Ok(())
}

pub(crate) fn load_input(args: &InputArgs) -> Result<Table> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    io_utils::load_table(&args.input, delimiter, encoding)
}

fn sink_target(args: &SinkArgs, default_table: &str) -> SinkTarget {
    let table = args
        .table
        .clone()
        .unwrap_or_else(|| default_table.to_string());
    debug!("Sink target '{}' with policy {}", table, args.if_exists);
    SinkTarget::new(table, args.if_exists)
}

fn open_sink(args: &SinkArgs) -> Result<SqliteSink> {
    if !args.database.exists() {
        warn!("Database {:?} does not exist and will be created", args.database);
    }
    SqliteSink::open(&args.database)
        .with_context(|| format!("Opening database {:?}", args.database))
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

pub mod check;
pub mod clean;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod interactive;
pub mod io_utils;
pub mod mapping;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod surface;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::{
    cli::{Cli, Commands},
    schema::REQUIRED_SCHEMA,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("supply_chain_intake", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Required => {
            handle_required();
            Ok(())
        }
        Commands::Check(args) => check::execute(&args),
        Commands::Dashboard(args) => dashboard::execute(&args),
        Commands::Interactive(args) => dashboard::execute_interactive(&args),
    }
}

fn handle_required() {
    let rows = REQUIRED_SCHEMA
        .iter()
        .map(|field| {
            vec![
                (field.position() + 1).to_string(),
                field.label().to_string(),
                field.kind().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    let headers = ["#", "column", "kind"].map(String::from);
    print!("{}", table::render_table(&headers, &rows));
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

//! `check` command: run every pre-sink stage and print the validation report.

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::CheckArgs, contract::SchemaContract, load_input, pipeline, table, type_map::TypeMap,
};

pub fn execute(args: &CheckArgs) -> Result<()> {
    let raw = load_input(&args.input)?;
    let type_map = TypeMap::load(&args.transform.types)?;
    let contract = SchemaContract::load(&args.transform.contract)
        .with_context(|| format!("Loading contract from {:?}", args.transform.contract))?;

    match pipeline::prepare(&raw, &type_map, &contract) {
        Ok(prepared) => {
            info!(
                "✓ {:?} matches contract ({} row(s), {} column(s))",
                args.input.input,
                prepared.table.row_count(),
                prepared.table.column_count()
            );
            Ok(())
        }
        Err(pipeline::PipelineError::Validation(report)) => {
            print!("{}", table::render_report(&report));
            Err(anyhow!(
                "{:?} violates the contract in {} place(s)",
                args.input.input,
                report.len()
            ))
        }
        Err(other) => Err(other).with_context(|| format!("Checking {:?}", args.input.input)),
    }
}

use anyhow::{Context, Result};
use log::info;

use crate::{cli::PreviewArgs, coerce, load_input, normalize, table, type_map::TypeMap};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let raw = load_input(&args.input)?;
    let type_map = match &args.types {
        Some(path) => TypeMap::load(path)?,
        None => TypeMap::new(),
    };
    if type_map.is_empty() {
        info!("No column types declared; preview shows text values");
    }
    let coerced = coerce::coerce(&raw, &type_map).context("Coercing preview rows")?;
    let normalized = normalize::normalize(&coerced.table).context("Normalizing preview rows")?;

    print!("{}", table::render_frame(&normalized, args.rows));
    info!(
        "Displayed {} of {} row(s) from {:?}",
        args.rows.min(normalized.row_count()),
        normalized.row_count(),
        args.input.input
    );
    Ok(())
}

//! Fixed-order ingestion pipeline: coerce → normalize → validate → sink.
//!
//! The orchestrator only sequences stages and tags failures with the stage
//! they came from. Coercion and normalization fail fast; validation collects
//! every violation and a non-empty report stops the run before the sink.

use std::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::{
    coerce::{CoercionWarning, coerce},
    contract::SchemaContract,
    frame::{Table, TableError},
    normalize::normalize,
    sink::{Sink, SinkError, SinkTarget},
    type_map::TypeMap,
    validate::{ValidationReport, validate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Coerce,
    Normalize,
    Validate,
    Sink,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Coerce => "coerce",
            Stage::Normalize => "normalize",
            Stage::Validate => "validate",
            Stage::Sink => "sink",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("coerce stage failed: {0}")]
    Coerce(#[source] TableError),
    #[error("normalize stage failed: {0}")]
    Normalize(#[source] TableError),
    #[error("validate stage failed: {0}")]
    Validation(ValidationReport),
    #[error("sink stage failed: {0}")]
    Sink(#[source] SinkError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Coerce(_) => Stage::Coerce,
            PipelineError::Normalize(_) => Stage::Normalize,
            PipelineError::Validation(_) => Stage::Validate,
            PipelineError::Sink(_) => Stage::Sink,
        }
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            PipelineError::Validation(report) => Some(report),
            _ => None,
        }
    }
}

/// A table that passed every pre-sink stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub table: Table,
    pub warnings: Vec<CoercionWarning>,
}

pub fn prepare(
    raw: &Table,
    type_map: &TypeMap,
    contract: &SchemaContract,
) -> Result<Prepared, PipelineError> {
    let coerced = coerce(raw, type_map).map_err(PipelineError::Coerce)?;
    debug!(
        "Coerced {} column(s) with {} warning(s)",
        type_map.len(),
        coerced.warnings.len()
    );
    let normalized = normalize(&coerced.table).map_err(PipelineError::Normalize)?;
    debug!("Normalized columns: {:?}", normalized.column_names());
    let report = validate(&normalized, contract);
    if !report.is_empty() {
        return Err(PipelineError::Validation(report));
    }
    Ok(Prepared {
        table: normalized,
        warnings: coerced.warnings,
    })
}

pub fn run<S>(
    raw: &Table,
    type_map: &TypeMap,
    contract: &SchemaContract,
    sink: &mut S,
    target: &SinkTarget,
) -> Result<usize, PipelineError>
where
    S: Sink + ?Sized,
{
    let prepared = prepare(raw, type_map, contract)?;
    let written = sink
        .write(&prepared.table, target)
        .map_err(PipelineError::Sink)?;
    info!(
        "Pipeline wrote {written} validated row(s) to '{}'",
        target.table
    );
    Ok(written)
}

/// Lands the raw table as-is, without coercion, renaming or validation.
pub fn load_raw<S>(raw: &Table, sink: &mut S, target: &SinkTarget) -> Result<usize, PipelineError>
where
    S: Sink + ?Sized,
{
    let written = sink.write(raw, target).map_err(PipelineError::Sink)?;
    info!("Landed {written} raw row(s) in '{}'", target.table);
    Ok(written)
}

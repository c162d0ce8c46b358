//! The `gc` flow: plan, report, confirm, execute

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use super::prompt;
use crate::gc::{GarbageCollector, GcOptions, report};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NothingToDo,
    DryRun,
    /// The user declined at the prompt
    Aborted,
    Completed { squashed: usize, deleted: usize },
}

/// Plan, print the plan, ask for confirmation unless told not to, execute
pub async fn run_gc(
    collector: &mut GarbageCollector<'_>,
    options: &GcOptions,
    input: &mut impl BufRead,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<Outcome> {
    let (plan, usage) = collector
        .plan(options)
        .await
        .with_context(|| format!("Failed to plan garbage collection in {}", options.namespace))?;

    report::render(out, &plan, &usage, options.remove_images).context("Failed to print plan")?;

    if plan.is_empty() {
        return Ok(Outcome::NothingToDo);
    }
    if options.dry_run {
        return Ok(Outcome::DryRun);
    }
    if !options.assume_yes && !prompt::confirm(input, out, err)? {
        return Ok(Outcome::Aborted);
    }

    collector
        .execute(&plan, &usage, options.remove_images)
        .await
        .context("Garbage collection failed")?;
    Ok(Outcome::Completed {
        squashed: plan.to_squash.len(),
        deleted: plan.to_delete.len(),
    })
}

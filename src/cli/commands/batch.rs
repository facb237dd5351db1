//! Resumable batch validation command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::InputArgs;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::sink::open_sink;
use crate::source::UrlSource;

/// Run a batch over an input source into an output sink.
pub async fn cmd_batch(
    settings: &Settings,
    input: &InputArgs,
    output: &PathBuf,
    batch_size: Option<usize>,
    force: bool,
) -> anyhow::Result<()> {
    let source = build_source(input)?;

    let mut settings = settings.clone();
    if let Some(batch_size) = batch_size {
        settings.batch_size = batch_size;
    }

    let sink = open_sink(output)?;
    let pipeline = Arc::new(Pipeline::new(&settings)?);

    println!(
        "{} Validating {} → {}",
        style("→").cyan(),
        source.describe(),
        output.display()
    );

    let progress = ProgressBar::new(0).with_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("progress template is valid"),
    );

    let report = pipeline
        .run_batch(&source, sink, force, Some(progress.clone()))
        .await;
    progress.finish_and_clear();

    // Fatal conditions surface here with committed batches already on
    // disk; a rerun resumes from them.
    let report = report?;

    println!("\n{}", style("Batch complete").bold());
    println!("{}", "-".repeat(40));
    println!("{:<16} {}", "Processed:", report.processed);
    println!("{:<16} {}", "Valid:", style(report.valid).green());
    println!("{:<16} {}", "Invalid:", style(report.invalid).yellow());
    println!("{:<16} {}", "Skipped:", report.skipped);
    if report.deduplicated > 0 {
        println!("{:<16} {}", "Duplicates:", report.deduplicated);
    }

    Ok(())
}

fn build_source(input: &InputArgs) -> anyhow::Result<UrlSource> {
    if !input.urls.is_empty() {
        if input.input.is_some() {
            bail!("give either --input or --url, not both");
        }
        return Ok(UrlSource::Literals(input.urls.clone()));
    }

    let Some(path) = input.input.clone() else {
        bail!("no input: pass --input <file> or one or more --url <URL>");
    };

    Ok(match &input.table {
        Some(table) => UrlSource::SqliteColumn {
            path,
            table: table.clone(),
            column: input.column.clone(),
        },
        None => UrlSource::CsvColumn {
            path,
            column: input.column.clone(),
        },
    })
}

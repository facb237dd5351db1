//! Status command for inspecting an output destination.

use std::path::Path;

use console::style;

use crate::sink::open_sink;

/// Show recorded result counts for a sink.
pub async fn cmd_status(output: &Path) -> anyhow::Result<()> {
    if !output.exists() {
        println!(
            "{} No results at {} yet",
            style("!").yellow(),
            output.display()
        );
        return Ok(());
    }

    let sink = open_sink(output)?;
    let stats = sink.stats().await?;

    println!("\n{}", style("Validation results").bold());
    println!("{}", "-".repeat(40));
    println!("{:<16} {}", "Destination:", output.display());
    println!("{:<16} {}", "Recorded:", stats.total);
    println!("{:<16} {}", "Valid:", style(stats.valid).green());
    println!("{:<16} {}", "Invalid:", style(stats.invalid()).yellow());

    for (status, count) in &stats.by_status {
        println!("{:<16} {}", format!("  {status}:"), count);
    }

    Ok(())
}

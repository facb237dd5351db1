//! Single-URL validation command.

use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::pipeline::Pipeline;

/// Validate one URL and print a verdict (or the record as JSON).
pub async fn cmd_validate(settings: &Settings, url: &str, json: bool) -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::new(settings)?);
    let record = pipeline.validate_url(url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if record.is_valid() {
        println!("{} Valid channel: {}", style("✓").green(), record.url);
        println!(
            "  {:<14} {}",
            "Channel ID:",
            record.channel_id.as_deref().unwrap_or("-")
        );
        println!(
            "  {:<14} {}",
            "Handle:",
            record.handle.as_deref().unwrap_or("not found")
        );
        println!(
            "  {:<14} {}",
            "Subscribers:",
            record.subscriber_count.as_deref().unwrap_or("not found")
        );
    } else {
        println!(
            "{} Invalid ({}): {}",
            style("✗").red(),
            record.status,
            record.status_message
        );
    }

    Ok(())
}

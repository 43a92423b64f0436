//! Health check command.
//!
//! Queries the `/health` endpoint and displays server status.

use anyhow::Result;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: serde_json::Value = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let status = health
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            output::print_header("Server Health");
            output::print_detail("Status", status);
            output::print_detail("API URL", client.base_url());

            if let Some(version) = health.get("version").and_then(|v| v.as_str()) {
                output::print_detail("Version", version);
            }

            if let Some(ts) = health.get("timestamp").and_then(|v| v.as_str()) {
                output::print_detail("Timestamp", ts);
            }

            if status == "healthy" || status == "ok" {
                output::print_success("All systems operational");
            } else {
                output::print_error(&format!("Server status: {}", status));
            }
        }
        _ => output::print_item(&health, format),
    }

    Ok(())
}

//! Conference commands.
//!
//! Provides create and list operations for conferences.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ConferenceCommands {
    /// Create a conference organized by the caller
    Create {
        /// Conference name
        #[arg(short, long)]
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Topic (repeat for multiple topics)
        #[arg(short, long = "topic")]
        topics: Vec<String>,

        /// City
        #[arg(short, long)]
        city: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Maximum number of attendees
        #[arg(short, long, default_value = "0")]
        max_attendees: u32,
    },

    /// List all conferences (no identity required)
    List,

    /// List conferences organized by the caller
    Mine,
}

// ── API types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConferenceRequest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
    max_attendees: u32,
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct ConferenceDto {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Month")]
    month: u32,
    #[tabled(rename = "Seats free")]
    seats_available: u32,
    #[tabled(rename = "Capacity")]
    max_attendees: u32,
    #[tabled(rename = "Organizer")]
    organizer_display_name: String,
    #[tabled(skip)]
    websafe_key: String,
    #[tabled(skip)]
    #[serde(default)]
    description: Option<String>,
    #[tabled(skip)]
    #[serde(default)]
    topics: Vec<String>,
    #[tabled(skip)]
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[tabled(skip)]
    #[serde(default)]
    end_date: Option<NaiveDate>,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(
    cmd: ConferenceCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        ConferenceCommands::Create {
            name,
            description,
            topics,
            city,
            start_date,
            end_date,
            max_attendees,
        } => {
            let request = CreateConferenceRequest {
                name,
                description,
                topics: if topics.is_empty() { None } else { Some(topics) },
                city,
                start_date,
                end_date,
                max_attendees,
            };
            let conference: ConferenceDto = client.post("/api/v1/conference", &request).await?;

            if matches!(format, OutputFormat::Table) {
                output::print_success(&format!("Conference '{}' created", conference.name));
                output::print_detail("Key", &conference.websafe_key);
                output::print_detail("Seats", &conference.seats_available.to_string());
            } else {
                output::print_item(&conference, format);
            }
        }

        ConferenceCommands::List => {
            let conferences: Vec<ConferenceDto> = client
                .post("/api/v1/queryConferences", &serde_json::json!({}))
                .await?;
            output::print_list(&conferences, format);
        }

        ConferenceCommands::Mine => {
            let conferences: Vec<ConferenceDto> = client
                .post("/api/v1/getConferencesCreated", &serde_json::json!({}))
                .await?;
            output::print_list(&conferences, format);
        }
    }

    Ok(())
}

//! Profile commands.
//!
//! Provides get and save operations for the caller's profile.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the caller's profile
    Get,

    /// Create or update the caller's profile
    Save {
        /// Display name
        #[arg(short, long)]
        display_name: Option<String>,

        /// T-shirt size (NOT_SPECIFIED, XS, S, M, L, XL, XXL, XXXL)
        #[arg(short, long)]
        tee_shirt_size: Option<String>,
    },
}

// ── API types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDto {
    user_id: String,
    display_name: String,
    main_email: String,
    tee_shirt_size: String,
    #[serde(default)]
    conference_keys_to_attend: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tee_shirt_size: Option<String>,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: ProfileCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        ProfileCommands::Get => {
            let profile: ProfileDto = client.get("/api/v1/profile").await?;
            print_profile(&profile, format);
        }

        ProfileCommands::Save {
            display_name,
            tee_shirt_size,
        } => {
            let request = SaveProfileRequest {
                display_name,
                tee_shirt_size,
            };
            let profile: ProfileDto = client.post("/api/v1/profile", &request).await?;

            if matches!(format, OutputFormat::Table) {
                output::print_success("Profile saved");
            }
            print_profile(&profile, format);
        }
    }

    Ok(())
}

fn print_profile(profile: &ProfileDto, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            output::print_header("Profile");
            output::print_detail("User ID", &profile.user_id);
            output::print_detail("Display name", &profile.display_name);
            output::print_detail("Email", &profile.main_email);
            output::print_detail("T-shirt size", &profile.tee_shirt_size);
        }
        _ => output::print_item(profile, format),
    }
}

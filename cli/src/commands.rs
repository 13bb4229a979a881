use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use loco_core::{
    read_settings, ApiClient, ClientSettings, GenerateMapsRequest, RequestDescriptor, WheelInput,
};

#[derive(Parser, Debug)]
#[command(name = "loco", about = "Call the locomotive analytics API and print each outcome")]
pub struct Cli {
    /// API base URL; overrides loco.toml and LOCO_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Default per-call timeout in seconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Settings file (default: ./loco.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// ML health check, followed by model info when healthy.
    Status,
    /// Model info.
    Info,
    /// Predict wheel wear for one input row, or for a JSON array file.
    Predict {
        #[arg(long, conflicts_with_all = ["series", "number", "depo", "steel", "mileage"])]
        file: Option<PathBuf>,
        #[arg(long, required_unless_present = "file")]
        series: Option<String>,
        #[arg(long, required_unless_present = "file")]
        number: Option<i64>,
        #[arg(long, required_unless_present = "file")]
        depo: Option<String>,
        #[arg(long, required_unless_present = "file")]
        steel: Option<String>,
        #[arg(long, required_unless_present = "file")]
        mileage: Option<f64>,
    },
    /// Upload a .json or .jsonl batch file for prediction.
    Upload { path: PathBuf },
    /// Branch analysis for all depots, or one depot.
    Branches {
        #[arg(long)]
        depo: Option<String>,
    },
    /// Popular directions for all depots, or one locomotive.
    Directions {
        #[arg(long, requires = "number")]
        series: Option<String>,
        #[arg(long, requires = "series")]
        number: Option<String>,
    },
    /// List depots available for map generation.
    Depots,
    /// Show one depot.
    Depot { id: String },
    /// Generate depot maps.
    Generate {
        depo_id: String,
        #[arg(long, default_value_t = 5)]
        max_locomotives: u32,
    },
    /// GET an arbitrary path relative to the base URL.
    Get { path: String },
}

/// What `main` should execute for a command.
#[derive(Debug)]
pub enum Plan {
    /// Health check, then model info only if the health check succeeded.
    Status {
        health: RequestDescriptor,
        info: RequestDescriptor,
    },
    Single(RequestDescriptor),
}

/// File and env layers, then flags, then validation of the merged result.
pub fn resolve_settings(cli: &Cli) -> anyhow::Result<ClientSettings> {
    let settings = read_settings(cli.config.as_deref()).context("failed to load settings")?;
    apply_flags(cli, settings)
}

fn apply_flags(cli: &Cli, mut settings: ClientSettings) -> anyhow::Result<ClientSettings> {
    if let Some(base_url) = &cli.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(timeout) = cli.timeout_secs {
        settings.default_timeout_secs = timeout;
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

pub async fn plan(command: Command, api: &ApiClient) -> anyhow::Result<Plan> {
    let descriptor = match command {
        Command::Status => {
            return Ok(Plan::Status {
                health: api.health(),
                info: api.model_info(),
            })
        }
        Command::Info => api.model_info(),
        Command::Predict {
            file: Some(path),
            ..
        } => {
            let raw = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let inputs: Vec<WheelInput> = serde_json::from_slice(&raw)
                .with_context(|| format!("{} is not a JSON array of inputs", path.display()))?;
            api.predict(&inputs)?
        }
        Command::Predict {
            file: None,
            series,
            number,
            depo,
            steel,
            mileage,
        } => {
            let input = WheelInput {
                locomotive_series: series.unwrap_or_default(),
                locomotive_number: number.unwrap_or_default(),
                depo: depo.unwrap_or_default(),
                steel_num: steel.unwrap_or_default(),
                mileage_start: mileage.unwrap_or_default(),
            };
            api.predict(&[input])?
        }
        Command::Upload { path } => {
            let content = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .with_context(|| format!("{} has no usable file name", path.display()))?;
            api.upload(file_name, content)?
        }
        Command::Branches { depo: Some(depo) } => api.depot_branches(&depo),
        Command::Branches { depo: None } => api.branches(),
        Command::Directions {
            series: Some(series),
            number: Some(number),
        } => api.locomotive_popular_direction(&series, &number),
        Command::Directions { .. } => api.popular_directions(),
        Command::Depots => api.depots(),
        Command::Depot { id } => api.depot(&id),
        Command::Generate {
            depo_id,
            max_locomotives,
        } => api.generate_maps(&GenerateMapsRequest {
            depo_id,
            max_locomotives,
        })?,
        Command::Get { path } => RequestDescriptor::get(path),
    };
    Ok(Plan::Single(descriptor))
}

//! Hitos CLI - indicator and milestone tracking.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use hitos_core::{
    IndicatorId, IndicatorPatch, MilestoneId, MilestonePatch, NewIndicator, NewMilestone,
};
use hitos_stats::{StatisticsEngine, StatisticsService};
use hitos_storage::{SqliteStorage, Storage, StorageConfig};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hitos")]
#[command(about = "Organizational indicators, their milestones and dashboard statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL
    #[arg(long, env = "HITOS_DATABASE_URL", default_value = "sqlite://hitos.db", global = true)]
    database: String,

    /// Maximum pooled connections
    #[arg(long, default_value = "5", global = true)]
    max_connections: u32,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage indicators
    #[command(subcommand)]
    Indicator(IndicatorCommand),
    /// Manage milestones
    #[command(subcommand)]
    Milestone(MilestoneCommand),
    /// Show dashboard statistics
    Stats {
        /// Restrict to one area
        #[arg(long)]
        area: Option<String>,
    },
}

#[derive(Subcommand)]
enum IndicatorCommand {
    /// Add a new indicator
    Add(IndicatorFields),
    /// List indicators by id
    List {
        /// Records to skip
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Page size
        #[arg(long, default_value = "100")]
        limit: u32,
        /// Ignore the page size
        #[arg(long)]
        all: bool,
    },
    /// Show an indicator with its milestones
    Show {
        /// Indicator ID
        id: IndicatorId,
    },
    /// List indicators of one area
    ByArea {
        /// Exact area name
        area: String,
    },
    /// Change some fields of an indicator
    Update {
        /// Indicator ID
        id: IndicatorId,
        #[command(flatten)]
        fields: IndicatorFields,
    },
    /// Delete an indicator and all of its milestones
    Delete {
        /// Indicator ID
        id: IndicatorId,
    },
}

#[derive(Subcommand)]
enum MilestoneCommand {
    /// Add a milestone to an indicator
    Add {
        /// Owning indicator ID
        indicator_id: IndicatorId,
        #[command(flatten)]
        fields: MilestoneFields,
    },
    /// Show a milestone
    Show {
        /// Milestone ID
        id: MilestoneId,
    },
    /// Change some fields of a milestone
    Update {
        /// Milestone ID
        id: MilestoneId,
        #[command(flatten)]
        fields: MilestoneFields,
    },
    /// Delete a milestone
    Delete {
        /// Milestone ID
        id: MilestoneId,
    },
}

#[derive(Args, Clone)]
struct IndicatorFields {
    /// Organizational unit
    #[arg(long)]
    vp: Option<String>,
    /// Area within the unit
    #[arg(long)]
    area: Option<String>,
    /// Indicator name
    #[arg(long)]
    name: Option<String>,
    /// Indicator type
    #[arg(long = "type")]
    kind: Option<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long = "start")]
    start_date: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long = "end")]
    end_date: Option<NaiveDate>,
    /// Overall responsible person
    #[arg(long)]
    responsible: Option<String>,
    /// Data-entry responsible person
    #[arg(long = "data-entry")]
    data_entry_responsible: Option<String>,
}

impl From<IndicatorFields> for NewIndicator {
    fn from(f: IndicatorFields) -> Self {
        NewIndicator {
            vp: f.vp,
            area: f.area,
            name: f.name,
            kind: f.kind,
            start_date: f.start_date,
            end_date: f.end_date,
            responsible: f.responsible,
            data_entry_responsible: f.data_entry_responsible,
        }
    }
}

impl From<IndicatorFields> for IndicatorPatch {
    fn from(f: IndicatorFields) -> Self {
        IndicatorPatch {
            vp: f.vp,
            area: f.area,
            name: f.name,
            kind: f.kind,
            start_date: f.start_date,
            end_date: f.end_date,
            responsible: f.responsible,
            data_entry_responsible: f.data_entry_responsible,
        }
    }
}

#[derive(Args, Clone)]
struct MilestoneFields {
    /// Milestone name
    #[arg(long)]
    name: Option<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long = "start")]
    start_date: Option<NaiveDate>,
    /// End date (YYYY-MM-DD)
    #[arg(long = "end")]
    end_date: Option<NaiveDate>,
    /// Progress percentage (0-100)
    #[arg(long)]
    progress: Option<f64>,
    /// Status label
    #[arg(long)]
    status: Option<String>,
    /// Person in charge
    #[arg(long)]
    responsible: Option<String>,
}

impl From<MilestoneFields> for NewMilestone {
    fn from(f: MilestoneFields) -> Self {
        NewMilestone {
            name: f.name,
            start_date: f.start_date,
            end_date: f.end_date,
            progress: f.progress,
            status: f.status,
            responsible: f.responsible,
        }
    }
}

impl From<MilestoneFields> for MilestonePatch {
    fn from(f: MilestoneFields) -> Self {
        MilestonePatch {
            name: f.name,
            start_date: f.start_date,
            end_date: f.end_date,
            progress: f.progress,
            status: f.status,
            responsible: f.responsible,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("HITOS_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = StorageConfig {
        database_url: cli.database.clone(),
        max_connections: cli.max_connections,
        ..StorageConfig::default()
    };
    let storage = SqliteStorage::connect(&config).await?;

    let outcome = run(cli.command, &storage).await;
    storage.close().await;
    outcome
}

async fn run(command: Commands, storage: &SqliteStorage) -> Result<()> {
    match command {
        Commands::Indicator(command) => run_indicator(command, storage).await,
        Commands::Milestone(command) => run_milestone(command, storage).await,
        Commands::Stats { area } => {
            let engine = StatisticsEngine::new(storage.clone());
            let report = match area {
                Some(area) => engine.compute_area_statistics(&area).await?,
                None => engine.compute_statistics().await?,
            };
            print_json(&report)
        }
    }
}

async fn run_indicator(command: IndicatorCommand, storage: &SqliteStorage) -> Result<()> {
    match command {
        IndicatorCommand::Add(fields) => {
            let indicator = storage.create_indicator(&fields.into()).await?;
            info!(indicator_id = %indicator.id, "indicator added");
            print_json(&indicator)
        }
        IndicatorCommand::List { offset, limit, all } => {
            let limit = if all { None } else { Some(limit) };
            let indicators = storage.list_indicators(offset, limit).await?;
            print_json(&indicators)
        }
        IndicatorCommand::Show { id } => {
            let Some(indicator) = storage.get_indicator(id).await? else {
                bail!("indicator {id} not found");
            };
            print_json(&indicator)
        }
        IndicatorCommand::ByArea { area } => {
            let indicators = storage.list_indicators_by_area(&area).await?;
            print_json(&indicators)
        }
        IndicatorCommand::Update { id, fields } => {
            let patch = IndicatorPatch::from(fields);
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let Some(indicator) = storage.update_indicator(id, &patch).await? else {
                bail!("indicator {id} not found");
            };
            print_json(&indicator)
        }
        IndicatorCommand::Delete { id } => {
            if !storage.delete_indicator(id).await? {
                bail!("indicator {id} not found");
            }
            println!("Deleted indicator {id}");
            Ok(())
        }
    }
}

async fn run_milestone(command: MilestoneCommand, storage: &SqliteStorage) -> Result<()> {
    match command {
        MilestoneCommand::Add { indicator_id, fields } => {
            let milestone = storage.create_milestone(indicator_id, &fields.into()).await?;
            info!(milestone_id = %milestone.id, "milestone added");
            print_json(&milestone)
        }
        MilestoneCommand::Show { id } => {
            let Some(milestone) = storage.get_milestone(id).await? else {
                bail!("milestone {id} not found");
            };
            print_json(&milestone)
        }
        MilestoneCommand::Update { id, fields } => {
            let patch = MilestonePatch::from(fields);
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let Some(milestone) = storage.update_milestone(id, &patch).await? else {
                bail!("milestone {id} not found");
            };
            print_json(&milestone)
        }
        MilestoneCommand::Delete { id } => {
            if !storage.delete_milestone(id).await? {
                bail!("milestone {id} not found");
            }
            println!("Deleted milestone {id}");
            Ok(())
        }
    }
}

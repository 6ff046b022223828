use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod import;
mod models;
mod report;
mod roster;
mod score;
mod sheet;
mod status;
mod store;

use crate::models::{EntryId, FollowupEntry, StoredEntry};
use crate::status::FollowupStatus;
use crate::store::LogStore;

#[derive(Parser)]
#[command(name = "followup-tracker")]
#[command(about = "Daily follow-up status tracker for support groups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the log table or sheet if it does not exist
    InitDb,
    /// Show groups, members and the status vocabulary
    Roster,
    /// Preview the score for a status pair
    Score {
        #[arg(long, default_value = "Normal")]
        tech: FollowupStatus,
        #[arg(long, default_value = "Normal")]
        custom: FollowupStatus,
    },
    /// Save one person's follow-up status for a day
    Record {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        group: String,
        #[arg(long)]
        member: String,
        /// One or more comma-separated incident numbers
        #[arg(long, default_value = "")]
        incident: String,
        #[arg(long, default_value = "Normal")]
        tech: FollowupStatus,
        #[arg(long, default_value = "Normal")]
        custom: FollowupStatus,
    },
    /// Import entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Per-group, per-member overview of one day
    Overview {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List entries, newest first
    List {
        #[arg(long = "group")]
        groups: Vec<String>,
        #[arg(long)]
        member: Option<String>,
    },
    /// Average score per group and day
    Trend {
        #[arg(long = "group")]
        groups: Vec<String>,
        /// Write the series as CSV instead of printing a table
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete one entry by the id shown in `list`
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "group")]
        groups: Vec<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print every stored row as JSON lines
    Dump,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Appends once. Failures are reported and left for the user to resubmit.
async fn save_entry(store: &dyn LogStore, entry: &FollowupEntry) -> Option<EntryId> {
    match store.append(entry).await {
        Ok(id) => {
            info!(id = %id, member = %entry.member, date = %entry.date, "entry saved");
            Some(id)
        }
        Err(err) => {
            warn!(error = %err, member = %entry.member, "failed to save entry");
            None
        }
    }
}

async fn remove_entry(store: &dyn LogStore, id: EntryId) -> bool {
    match store.delete(id).await {
        Ok(true) => true,
        Ok(false) => {
            warn!(id = %id, "no entry with this id");
            false
        }
        Err(err) => {
            warn!(id = %id, error = %err, "failed to delete entry");
            false
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Roster => {
            for (group, members) in roster::GROUPS {
                println!("{group}");
                for member in members.iter() {
                    println!("  - {member}");
                }
            }
            println!("Statuses:");
            for status in FollowupStatus::ALL {
                println!("  - {} ({} days)", status, status.days_outstanding());
            }
            return Ok(());
        }
        Commands::Score { tech, custom } => {
            println!("{}", score::score(tech.label(), custom.label()));
            return Ok(());
        }
        _ => {}
    }

    let config = config::Config::from_env()?;
    let backend = store::open(&config).context("failed to open the follow-up log")?;
    let log = backend.as_ref();

    match cli.command {
        Commands::Roster | Commands::Score { .. } => {}
        Commands::InitDb => match log.init().await {
            Ok(()) => println!("Log ready."),
            Err(err) => warn!(error = %err, "failed to prepare the log"),
        },
        Commands::Record {
            date,
            group,
            member,
            incident,
            tech,
            custom,
        } => {
            let date = date.unwrap_or_else(today);
            let entry = FollowupEntry::new(date, &group, &member, &incident, tech, custom)?;
            match save_entry(log, &entry).await {
                Some(id) => {
                    println!(
                        "Saved {} on {} (id {}, score {}).",
                        entry.member,
                        entry.date,
                        id,
                        entry.score()
                    );
                    print!("{}", report::render_detail(&[StoredEntry::from_entry(id, &entry)]));
                }
                None => println!("Entry was not saved; please resubmit."),
            }
        }
        Commands::Import { csv } => {
            let summary = import::import_csv(log, &csv).await?;
            println!(
                "Inserted {} entries from {} ({} skipped, {} failed).",
                summary.inserted,
                csv.display(),
                summary.skipped,
                summary.failed
            );
        }
        Commands::Overview { date } => {
            let entries = store::load_or_empty(log).await;
            let date = date.unwrap_or_else(today);
            print!("{}", report::render_overview(&entries, date));
            println!();
            print!("{}", report::render_last_updates(&entries));
        }
        Commands::List { groups, member } => {
            let entries = store::load_or_empty(log).await;
            let rows = report::detail_rows(&entries, &groups, member.as_deref());
            print!("{}", report::render_detail(&rows));
        }
        Commands::Trend { groups, out } => {
            let entries = store::load_or_empty(log).await;
            let selected = report::selected_groups(&entries, &groups);
            let points = score::group_trend(&entries, &selected);
            match out {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    report::write_trend_csv(&points, file)?;
                    println!("Trend written to {}.", path.display());
                }
                None => print!("{}", report::render_trend(&points)),
            }
        }
        Commands::Delete { id } => {
            if remove_entry(log, EntryId(id)).await {
                println!("Entry {id} deleted.");
            } else {
                println!("Entry {id} was not deleted.");
            }
        }
        Commands::Report { date, groups, out } => {
            let entries = store::load_or_empty(log).await;
            let markdown = report::build_report(date.unwrap_or_else(today), &groups, &entries);
            std::fs::write(&out, markdown)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Dump => {
            for entry in store::load_or_empty(log).await {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
    }

    Ok(())
}

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{config::load_settings, MomentumClient};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        BlockerCategory, BlockerId, BlockerSeverity, BlockerStatus, ReportId, ReportPeriod,
        UserId,
    },
    protocol::{BlockerQuery, CreateBlockerRequest},
};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "momentum", about = "Track blockers and AI reports from the terminal")]
struct Cli {
    /// Config file; defaults to ./momentum.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a bearer token and load the matching profile.
    Login {
        #[arg(long)]
        token: String,
    },
    Logout,
    Me,
    Refresh,
    Blockers {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, value_parser = wire::<BlockerStatus>)]
        status: Option<BlockerStatus>,
        #[arg(long, value_parser = wire::<BlockerSeverity>)]
        severity: Option<BlockerSeverity>,
        #[arg(long, value_parser = wire::<BlockerCategory>)]
        category: Option<BlockerCategory>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
    },
    Stats {
        #[arg(long)]
        team: Option<String>,
    },
    ReportBlocker {
        #[arg(long)]
        member: String,
        #[arg(long)]
        description: String,
        #[arg(long, value_parser = wire::<BlockerCategory>, default_value = "Other")]
        category: BlockerCategory,
        #[arg(long, value_parser = wire::<BlockerSeverity>, default_value = "Medium")]
        severity: BlockerSeverity,
    },
    Resolve {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    Ignore {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    Reports {
        #[command(flatten)]
        scope: Scope,
    },
    Report {
        id: String,
    },
    Generate {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, value_parser = wire::<ReportPeriod>, default_value = "weekly")]
        period: ReportPeriod,
    },
    TeamOverview {
        #[arg(long)]
        team: String,
    },
}

#[derive(Args, Debug)]
struct Scope {
    #[arg(long, conflicts_with = "member")]
    team: Option<String>,
    #[arg(long)]
    member: Option<String>,
}

/// Parses a value using its wire spelling, e.g. `Customer Escalation` or `monthly`.
fn wire<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let storage = Storage::new(&settings.database_url).await?;
    info!("cli: using api={} db={}", settings.api_base_url, settings.database_url);
    let client = MomentumClient::from_settings(&settings, Arc::new(storage)).await?;

    if !matches!(cli.command, Command::Login { .. } | Command::Logout)
        && !client.store().is_authenticated().await
    {
        bail!("not signed in; run `momentum login --token <TOKEN>` first");
    }

    match cli.command {
        Command::Login { token } => {
            let user = client.sign_in(&token).await?;
            print_json(&user)?;
        }
        Command::Logout => {
            client.sign_out().await?;
            println!("signed out");
        }
        Command::Me => print_json(&client.fetch_profile().await?)?,
        Command::Refresh => print_json(&client.refresh_token().await?)?,
        Command::Blockers {
            scope,
            status,
            severity,
            category,
            limit,
            page,
        } => {
            let query = BlockerQuery {
                category,
                severity,
                status,
                limit,
                page,
            };
            let listed = match (scope.team, scope.member) {
                (Some(team), _) => client.fetch_team_blockers(&team, &query).await?,
                (None, Some(member)) => {
                    client
                        .fetch_member_blockers(&UserId::new(member), &query)
                        .await?
                }
                (None, None) => client.fetch_my_blockers(&query).await?,
            };
            print_json(&listed)?;
        }
        Command::Stats { team } => {
            let stats = match team {
                Some(team) => client.fetch_team_stats(&team).await?,
                None => client.fetch_my_stats().await?,
            };
            print_json(&stats)?;
        }
        Command::ReportBlocker {
            member,
            description,
            category,
            severity,
        } => {
            let blocker = client
                .create_blocker(CreateBlockerRequest {
                    team_member_uid: UserId::new(member),
                    description,
                    category,
                    severity,
                })
                .await?;
            print_json(&blocker)?;
        }
        Command::Resolve { id, notes } => {
            print_json(&client.resolve_blocker(&BlockerId::new(id), notes).await?)?
        }
        Command::Ignore { id, notes } => {
            print_json(&client.ignore_blocker(&BlockerId::new(id), notes).await?)?
        }
        Command::Reports { scope } => {
            let reports = match (scope.team, scope.member) {
                (Some(team), _) => client.fetch_team_reports(&team).await?,
                (None, Some(member)) => client.fetch_member_reports(&UserId::new(member)).await?,
                (None, None) => client.fetch_my_reports().await?,
            };
            print_json(&reports)?;
        }
        Command::Report { id } => print_json(&client.fetch_report(&ReportId::new(id)).await?)?,
        Command::Generate { scope, period } => {
            let report = match (scope.team, scope.member) {
                (Some(team), _) => client.generate_team_report(&team, period).await?,
                (None, Some(member)) => {
                    client
                        .generate_member_report(&UserId::new(member), period)
                        .await?
                }
                (None, None) => client.generate_my_report(period).await?,
            };
            if report.is_existing {
                eprintln!("a report for this period already existed; showing it");
            }
            print_json(&report)?;
        }
        Command::TeamOverview { team } => {
            let overview = client.load_team_overview(&team, None).await?;
            print_json(&serde_json::json!({
                "team": team,
                "totalOpenBlockers": overview.total_open_blockers(),
                "totalHighSeverity": overview.total_high_severity(),
                "membersWithOpenBlockers": overview.members_with_open_blockers(),
                "members": overview.sorted_by_urgency(),
            }))?;
        }
    }

    Ok(())
}

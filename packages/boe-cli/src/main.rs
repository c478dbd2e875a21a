//! `boe`: query the BOE open-data API from the command line.
//!
//! Results are printed to stdout as pretty JSON. Logs go to stderr, and a
//! failed call prints the error as JSON on stderr and exits non-zero.

mod config;

use std::process::ExitCode;

use anyhow::{Context, Result};
use boe_client::client::DEFAULT_SEARCH_LIMIT;
use boe_client::scan::WEEK_DAYS;
use boe_client::well_known::{self, LawCategory};
use boe_client::{
    ApiError, AuxiliaryTable, BoeClient, CodeQuery, DocumentFormat, LawSection, SearchFilters,
    SearchRequest, SummaryScan,
};
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "boe")]
#[command(about = "Query the Spanish Official State Gazette (BOE) open-data API")]
struct Cli {
    /// Request XML instead of JSON from the API
    #[arg(long, global = true)]
    xml: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search consolidated legislation
    Search {
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        legal_range: Option<String>,
        #[arg(long)]
        matter: Option<String>,
        /// YYYYMMDD or YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// YYYYMMDD or YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
        #[arg(long)]
        include_repealed: bool,
    },

    /// Fetch a consolidated law by id, e.g. BOE-A-2015-10566
    Law {
        id: String,
        #[arg(long, value_enum)]
        section: Option<Section>,
        /// Text block id, e.g. a1 (implies the text section)
        #[arg(long)]
        block: Option<String>,
    },

    /// Fetch a daily summary
    Summary {
        #[arg(value_enum)]
        journal: Journal,
        /// YYYYMMDD
        date: String,
    },

    /// Scan recent BOE summaries for matching items
    Recent {
        /// First day, YYYYMMDD or YYYY-MM-DD [default: the window ends today]
        #[arg(long)]
        from: Option<String>,
        #[arg(long, default_value_t = WEEK_DAYS)]
        days: u32,
        /// Text the item title must contain
        #[arg(long)]
        terms: Option<String>,
        /// Section code, e.g. 1 or 2A
        #[arg(long)]
        section: Option<String>,
        /// Department code, e.g. 7723
        #[arg(long)]
        department: Option<String>,
        /// Print counts per day, section and department instead of items
        #[arg(long)]
        tally: bool,
    },

    /// Fetch an auxiliary code table
    Table { name: String },

    /// Look up a code in the auxiliary tables
    Code {
        code: String,
        /// Match codes or descriptions containing the text
        #[arg(long)]
        search: bool,
        /// Table to look in, repeatable [default: all]
        #[arg(long = "table")]
        tables: Vec<String>,
    },

    /// List well-known laws (offline)
    Laws {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        keyword: Option<String>,
    },

    /// Check that the API answers
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    Metadata,
    Analysis,
    Eli,
    Text,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Journal {
    Boe,
    Borme,
}

#[derive(Serialize)]
struct HealthReport<'a> {
    healthy: bool,
    base_url: &'a str,
}

/// Stderr shape for failures that are not API errors.
#[derive(Serialize)]
struct CliFailure {
    message: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boe_client=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            report_failure(&error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Laws { category, keyword } => cmd_laws(category.as_deref(), keyword.as_deref()),
        command => run_remote(command, cli.xml).await,
    }
}

async fn run_remote(command: Commands, xml: bool) -> Result<ExitCode> {
    let mut config = Config::from_env()?.client;
    if xml {
        config = config.with_default_format(DocumentFormat::Xml);
    }
    let client = BoeClient::new(config)?;

    let cancel = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight request");
            cancel.cancel();
        }
    });

    let code = match command {
        Commands::Search {
            text,
            title,
            department,
            legal_range,
            matter,
            from,
            to,
            offset,
            limit,
            include_repealed,
        } => {
            let filters = SearchFilters {
                text,
                title,
                department_code: department,
                legal_range_code: legal_range,
                matter_code: matter,
                date_from: from,
                date_to: to,
            };
            let mut search = SearchRequest::new(filters)
                .with_offset(offset)
                .with_limit(limit);
            if include_repealed {
                search = search.including_repealed();
            }
            output(&client.search_legislation(&search).await?)?;
            ExitCode::SUCCESS
        }
        Commands::Law { id, section, block } => {
            let section = law_section(section, block)?;
            output(&client.get_law(&id, section.as_ref()).await?)?;
            ExitCode::SUCCESS
        }
        Commands::Summary { journal, date } => {
            let response = match journal {
                Journal::Boe => client.get_boe_summary(&date).await?,
                Journal::Borme => client.get_borme_summary(&date).await?,
            };
            output(&response)?;
            ExitCode::SUCCESS
        }
        Commands::Recent {
            from,
            days,
            terms,
            section,
            department,
            tally,
        } => {
            let from = match from {
                Some(from) => from,
                None => window_start(Local::now().date_naive(), days)?,
            };
            let mut scan = SummaryScan::new(from, days);
            scan.terms = terms;
            scan.section = section;
            scan.department = department;

            let report = client.scan_boe_summaries(&scan).await?;
            if tally {
                output(&report.tally())?;
            } else {
                output(&report)?;
            }
            ExitCode::SUCCESS
        }
        Commands::Table { name } => {
            output(&client.get_auxiliary_table(parse_table(&name)?).await?)?;
            ExitCode::SUCCESS
        }
        Commands::Code {
            code,
            search,
            tables,
        } => {
            let tables = tables
                .iter()
                .map(|name| parse_table(name))
                .collect::<Result<Vec<_>>>()?;
            let query = if search {
                CodeQuery::Contains(code)
            } else {
                CodeQuery::Exact(code)
            };
            output(&client.lookup_codes(&query, &tables).await?)?;
            ExitCode::SUCCESS
        }
        Commands::Health => {
            let healthy = client.health_check().await;
            output(&HealthReport {
                healthy,
                base_url: &client.config().base_url,
            })?;
            if healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Laws { category, keyword } => {
            cmd_laws(category.as_deref(), keyword.as_deref())?
        }
    };

    client.close();
    Ok(code)
}

fn cmd_laws(category: Option<&str>, keyword: Option<&str>) -> Result<ExitCode> {
    let laws = match (category, keyword) {
        (Some(name), _) => {
            let category = LawCategory::from_name(name).with_context(|| {
                let known: Vec<_> = LawCategory::ALL.iter().map(|c| c.name()).collect();
                format!("Unknown category `{}`, expected one of: {}", name, known.join(", "))
            })?;
            let mut laws = well_known::by_category(category);
            if let Some(keyword) = keyword {
                let hits = well_known::search(keyword);
                laws.retain(|law| hits.contains(law));
            }
            laws
        }
        (None, Some(keyword)) => well_known::search(keyword),
        (None, None) => well_known::WELL_KNOWN_LAWS.iter().collect(),
    };
    output(&laws)?;
    Ok(ExitCode::SUCCESS)
}

fn parse_table(name: &str) -> Result<AuxiliaryTable> {
    AuxiliaryTable::from_name(name).with_context(|| {
        let known: Vec<_> = AuxiliaryTable::ALL.iter().map(|t| t.name()).collect();
        format!("Unknown table `{}`, expected one of: {}", name, known.join(", "))
    })
}

/// Start of a `days`-long window ending on `today`.
fn window_start(today: NaiveDate, days: u32) -> Result<String> {
    let back = u64::from(days.saturating_sub(1));
    let start = today
        .checked_sub_days(Days::new(back))
        .with_context(|| format!("Cannot go {} days back from {}", back, today))?;
    Ok(start.format("%Y%m%d").to_string())
}

fn law_section(section: Option<Section>, block: Option<String>) -> Result<Option<LawSection>> {
    let section = match (section, block) {
        (None | Some(Section::Text), Some(block)) => {
            Some(LawSection::TextBlock(block))
        }
        (Some(_), Some(_)) => anyhow::bail!("--block only applies to the text section"),
        (Some(Section::Metadata), None) => Some(LawSection::Metadata),
        (Some(Section::Analysis), None) => Some(LawSection::Analysis),
        (Some(Section::Eli), None) => Some(LawSection::EliMetadata),
        (Some(Section::Text), None) => Some(LawSection::FullText),
        (Some(Section::Index), None) => Some(LawSection::TextIndex),
        (None, None) => None,
    };
    Ok(section)
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn report_failure(error: &anyhow::Error) {
    let json = match error.downcast_ref::<ApiError>() {
        Some(api_error) => serde_json::to_string_pretty(api_error),
        None => serde_json::to_string_pretty(&CliFailure {
            message: format!("{:#}", error),
        }),
    };
    match json {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{:#}", error),
    }
}

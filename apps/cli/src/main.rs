#![deny(warnings)]

//! Headless CLI for inspecting simulation results and the runs-list query.

mod files;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use files::CompareInput;
use persistence::JsonFileStore;
use report_core::{ReportConfig, SummaryKpi};
use report_kpi::{audit_payload, compare_runs, resolve_summary, rollup_by_time, RollupGroup, TimeBucket};
use report_view::{
    distinct_nodes_and_items, format_metric, profit_loss_table, project, result_rows, summary_row, FilterCriteria,
    Selection,
};
use run_query::{Filters, QueryStateManager, SortKey, SortOrder};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_SHA"), ", ", env!("BUILD_DATE"), ")");

#[derive(Parser)]
#[command(name = "scm-report", version = VERSION)]
#[command(about = "Supply-chain simulation reporting client", long_about = None)]
struct Cli {
    /// YAML config file; defaults apply without one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the run summary, recomputing it when the backend omitted it
    Summarize {
        #[arg(long)]
        results: PathBuf,
        /// Simulation request carrying the node definitions
        #[arg(long)]
        request: Option<PathBuf>,
        /// Check the backend summary against a recomputation
        #[arg(long)]
        verify: bool,
        /// Print JSON instead of formatted lines
        #[arg(long)]
        json: bool,
    },
    /// Filter daily records by day range, node and item
    Filter {
        #[arg(long)]
        results: PathBuf,
        #[arg(long)]
        day_from: Option<u32>,
        #[arg(long)]
        day_to: Option<u32>,
        #[arg(long, default_value = "all")]
        node: String,
        #[arg(long, default_value = "all")]
        item: String,
        /// Write the filtered rows as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Export a table as CSV
    Export {
        #[arg(long)]
        results: PathBuf,
        #[arg(long)]
        request: Option<PathBuf>,
        #[arg(long, value_enum)]
        kind: ExportKind,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Sum metrics per day, week or month
    Rollup {
        #[arg(long)]
        results: PathBuf,
        #[arg(long, default_value = "day")]
        bucket: String,
        #[arg(long, value_enum, default_value_t = GroupBy::Period)]
        by: GroupBy,
    },
    /// Compare runs against the first one
    Compare {
        /// Results payloads or `{run_id, summary}` files
        #[arg(required = true)]
        runs: Vec<PathBuf>,
        #[arg(long)]
        request: Option<PathBuf>,
    },
    /// Resolve and update the runs-list query state
    Runs(RunsArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Results,
    ProfitLoss,
    Summary,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    Period,
    Node,
    NodeItem,
}

impl From<GroupBy> for RollupGroup {
    fn from(g: GroupBy) -> Self {
        match g {
            GroupBy::Period => RollupGroup::Period,
            GroupBy::Node => RollupGroup::Node,
            GroupBy::NodeItem => RollupGroup::NodeItem,
        }
    }
}

#[derive(clap::Args)]
struct RunsArgs {
    /// Current location; the configured runs path when omitted
    #[arg(long)]
    url: Option<String>,
    /// Total reported by the last runs-list response
    #[arg(long)]
    total: Option<u64>,
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    next: bool,
    #[arg(long)]
    prev: bool,
    #[arg(long)]
    first: bool,
    #[arg(long)]
    last: bool,
    #[arg(long)]
    limit: Option<u64>,
    /// Sort by KEY; repeating the current key flips the order
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    order: Option<String>,
    /// Filter as key=value (schema_version, config_id, config_version_id, scenario_id)
    #[arg(long = "filter")]
    filters: Vec<String>,
    #[arg(long)]
    clear_filters: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    info!(version = VERSION, "starting scm-report");

    match cli.command {
        Commands::Summarize {
            results,
            request,
            verify,
            json,
        } => cmd_summarize(&config, &results, request.as_deref(), verify, json),
        Commands::Filter {
            results,
            day_from,
            day_to,
            node,
            item,
            csv,
        } => cmd_filter(&results, day_from, day_to, node, item, csv.as_deref()),
        Commands::Export {
            results,
            request,
            kind,
            output,
        } => cmd_export(&results, request.as_deref(), kind, &output),
        Commands::Rollup { results, bucket, by } => cmd_rollup(&results, &bucket, by),
        Commands::Compare { runs, request } => cmd_compare(&runs, request.as_deref()),
        Commands::Runs(args) => cmd_runs(&config, args),
    }
}

fn print_summary(summary: &SummaryKpi) {
    for key in SummaryKpi::EXPORT_COLUMNS {
        if let Some(v) = summary.scalar(key) {
            println!("{key:<26} {}", format_metric(key, v));
        }
    }
    for (t, v) in &summary.avg_on_hand_by_type {
        println!("{:<26} {}", format!("avg_on_hand.{t}"), format_metric("avg_on_hand", *v));
    }
    for (rank, e) in summary.top_shortage_items.iter().enumerate() {
        println!("{:<26} {} ({})", format!("top_shortage.{}", rank + 1), e.item, format_metric("shortage", e.shortage));
    }
}

fn cmd_summarize(config: &ReportConfig, results: &Path, request: Option<&Path>, verify: bool, json: bool) -> Result<()> {
    let payload = files::load_payload(results)?;
    let types = files::load_node_types(request)?;
    let resolved = resolve_summary(&payload, &types);
    info!(source = ?resolved.source, days = payload.results.len(), "summary ready");

    let mismatches = if verify {
        match audit_payload(&payload, &types, config.verify_tolerance) {
            Some(m) => Some(m),
            None => {
                warn!("no backend summary to verify");
                None
            }
        }
    } else {
        None
    };

    if json {
        let out = serde_json::json!({
            "source": resolved.source,
            "summary": resolved.summary,
            "mismatches": mismatches,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&resolved.summary);
        if let Some(m) = &mismatches {
            println!("verification: {} mismatch(es)", m.len());
            for mm in m {
                println!("  {}: backend {:?} vs recomputed {:?}", mm.field, mm.backend, mm.recomputed);
            }
        }
    }
    Ok(())
}

fn cmd_filter(
    results: &Path,
    day_from: Option<u32>,
    day_to: Option<u32>,
    node: String,
    item: String,
    csv: Option<&Path>,
) -> Result<()> {
    let payload = files::load_payload(results)?;
    let full = FilterCriteria::full_range(&payload.results);
    let criteria = FilterCriteria {
        day_from: day_from.unwrap_or(full.day_from),
        day_to: day_to.unwrap_or(full.day_to),
        node: Selection::from(node),
        item: Selection::from(item),
    };
    let projected = project(&payload.results, &criteria);
    let distinct = distinct_nodes_and_items(&payload.results);
    println!("nodes: {}", distinct.nodes.iter().cloned().collect::<Vec<_>>().join(", "));
    println!("items: {}", distinct.items.iter().cloned().collect::<Vec<_>>().join(", "));
    let rows = result_rows(&projected);
    println!("{} day(s), {} row(s) after filtering", projected.len(), rows.len());
    if let Some(path) = csv {
        files::write_rows(path, &rows)?;
    }
    Ok(())
}

fn cmd_export(results: &Path, request: Option<&Path>, kind: ExportKind, output: &Path) -> Result<()> {
    let payload = files::load_payload(results)?;
    match kind {
        ExportKind::Results => files::write_rows(output, &result_rows(&payload.results)),
        ExportKind::ProfitLoss => files::write_table(output, &profit_loss_table(&payload.profit_loss)),
        ExportKind::Summary => {
            let types = files::load_node_types(request)?;
            let resolved = resolve_summary(&payload, &types);
            files::write_rows(output, &[summary_row(&resolved.summary)])
        }
    }
}

fn cmd_rollup(results: &Path, bucket: &str, by: GroupBy) -> Result<()> {
    let bucket: TimeBucket = bucket.parse()?;
    let payload = files::load_payload(results)?;
    let rows = rollup_by_time(&payload.results, bucket, by.into());
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn cmd_compare(paths: &[PathBuf], request: Option<&Path>) -> Result<()> {
    let types = files::load_node_types(request)?;
    let mut runs = Vec::with_capacity(paths.len());
    for path in paths {
        let run = match files::load_compare_input(path)? {
            CompareInput::Payload(payload) => {
                let resolved = resolve_summary(&payload, &types);
                (files::run_id_from_path(path), resolved.summary)
            }
            CompareInput::Summary { run_id, summary } => (run_id, summary),
        };
        runs.push(run);
    }
    let comparison = compare_runs(&runs)?;
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}

fn parse_filters(pairs: &[String], mut filters: Filters) -> Result<Filters> {
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("filter {pair:?} is not key=value");
        };
        match filters.get_mut(key) {
            Some(slot) => *slot = value.to_string(),
            None => bail!("unknown filter key {key:?}"),
        }
    }
    Ok(filters)
}

fn cmd_runs(config: &ReportConfig, args: RunsArgs) -> Result<()> {
    let store = JsonFileStore::open(&config.prefs_path)?;
    let location = args.url.clone().unwrap_or_else(|| config.runs_path.clone());
    let mut mgr = QueryStateManager::load(&location, store, config.runs_path.clone(), config.prefs_key.clone());

    if let Some(total) = args.total {
        let issued = mgr.state().clone();
        let page = report_core::RunsPage {
            total,
            offset: issued.offset,
            limit: issued.limit,
            runs: Vec::new(),
        };
        let outcome = mgr.apply_server_response(&page, &issued);
        info!(?outcome, total, "applied runs-list total");
    }

    if args.clear_filters {
        mgr.clear_filters()?;
    }
    if !args.filters.is_empty() {
        let filters = parse_filters(&args.filters, mgr.state().filters.clone())?;
        mgr.set_filters(filters)?;
    }
    if let Some(limit) = args.limit {
        mgr.set_limit(limit)?;
    }
    if let Some(sort) = args.sort {
        let Some(key) = SortKey::new(sort) else {
            bail!("sort key must not be empty");
        };
        mgr.toggle_sort(key)?;
    }
    if let Some(order) = args.order {
        let order: SortOrder = order.parse().map_err(anyhow::Error::msg)?;
        mgr.set_order(order)?;
    }

    if let Some(page) = args.page {
        mgr.set_page(page);
    }
    if args.first {
        mgr.first_page();
    }
    if args.prev {
        mgr.prev_page();
    }
    if args.next {
        mgr.next_page();
    }
    if args.last {
        mgr.last_page();
    }

    println!("location: {}", mgr.location());
    println!("query:    {}", mgr.backend_query());
    println!(
        "pager:    {} (page {}/{}, prev {}, next {})",
        mgr.pager_text(),
        mgr.current_page(),
        mgr.page_count(),
        if mgr.can_prev_page() { "on" } else { "off" },
        if mgr.can_next_page() { "on" } else { "off" },
    );
    Ok(())
}

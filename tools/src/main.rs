//! risk-runner: command-line driver for the transaction risk pipeline.
//!
//! Usage:
//!   risk-runner generate --seed 42 --customers 120 --transactions 20000 --data-dir ./data
//!   risk-runner enrich --data-dir ./data --high-amount 150000
//!   risk-runner report --data-dir ./data --db finance.db
//!   risk-runner charts --data-dir ./data
//!   risk-runner dashboard --data-dir ./data --risk High,Medium --from 2024-01-01 --export view.csv

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use riskfeed_core::{
    aggregate::{LabelCount, MonthValue, SectorRisk},
    charts::{self, ChartSet},
    config::PipelineConfig,
    dashboard::{self, Dashboard, DashboardFilter, DashboardOutcome, SummaryMetrics},
    generator::{self, GeneratorConfig},
    pipeline::{Pipeline, RunStats},
    risk::RiskLevel,
    sink::CsvFileSink,
    store::ReportStore,
};
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};

#[derive(serde::Serialize)]
struct DashboardReport {
    summary: SummaryMetrics,
    top_high_risk_customers: Vec<LabelCount>,
    monthly_amount: Vec<MonthValue>,
    sector_risk: Vec<SectorRisk>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");

    match command {
        "generate" => cmd_generate(&args, data_dir),
        "enrich" => cmd_enrich(&args, data_dir),
        "report" => cmd_report(&args, data_dir),
        "charts" => cmd_charts(&args, data_dir),
        "dashboard" => cmd_dashboard(&args, data_dir),
        "help" => {
            print_usage();
            Ok(())
        }
        other => {
            log::warn!("Unknown command: {other}");
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("risk-runner <generate|enrich|report|charts|dashboard> [--data-dir DIR] [flags]");
    println!("  generate   --seed N --customers N --transactions N");
    println!("  enrich     [--config FILE] [--high-amount X] [--medium-amount X]");
    println!("             [--high-delay N] [--medium-delay N] [--out FILE]");
    println!("  report     [--db FILE]");
    println!("  charts     [--figures-dir DIR]");
    println!("  dashboard  [--risk Low,High] [--sector A,B] [--from D] [--to D] [--export FILE]");
}

// ── Subcommands ───────────────────────────────────────────────

fn cmd_generate(args: &[String], data_dir: &str) -> Result<()> {
    let defaults = GeneratorConfig::default();
    let config = GeneratorConfig {
        seed: parse_arg(args, "--seed", defaults.seed),
        n_customers: parse_arg(args, "--customers", defaults.n_customers),
        n_transactions: parse_arg(args, "--transactions", defaults.n_transactions),
        ..defaults
    };
    println!("risk-runner generate");
    println!("  seed:         {}", config.seed);
    println!("  customers:    {}", config.n_customers);
    println!("  transactions: {}", config.n_transactions);
    println!("  data_dir:     {data_dir}");
    println!();

    let tables = generator::generate(&config);
    generator::write_tables(&tables, Path::new(data_dir))?;

    println!("=== GENERATED ===");
    println!("  customers:    {}", tables.customers.len());
    println!("  transactions: {}", tables.transactions.len());
    println!("  payments:     {}", tables.payments.len());
    Ok(())
}

fn cmd_enrich(args: &[String], data_dir: &str) -> Result<()> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => PipelineConfig::load_file(data_dir, Path::new(path))?,
        None => PipelineConfig::load(data_dir)?,
    };
    let t = &mut config.thresholds;
    t.high_amount = parse_arg(args, "--high-amount", t.high_amount);
    t.medium_amount = parse_arg(args, "--medium-amount", t.medium_amount);
    t.high_delay_days = parse_arg(args, "--high-delay", t.high_delay_days);
    t.medium_delay_days = parse_arg(args, "--medium-delay", t.medium_delay_days);
    if let Some(out) = flag_value(args, "--out") {
        config.output_file = out.to_string();
    }

    let out_path = config.analysis_table_path();
    let pipeline = Pipeline::new(config);
    println!("risk-runner enrich");
    println!("  run_id:     {}", pipeline.run_id);
    println!("  data_dir:   {data_dir}");
    println!("  thresholds: {:?}", pipeline.config().thresholds);
    println!("  output:     {}", out_path.display());
    println!();

    let mut sink = CsvFileSink::new(&out_path);
    let output = pipeline.execute(&mut sink)?;
    print_run_summary(&output.stats);

    let top = riskfeed_core::aggregate::top_high_risk_customers(&output.table, 5);
    println!();
    println!("=== TOP 5 HIGH-RISK CUSTOMERS ===");
    if top.is_empty() {
        println!("  (none)");
    }
    for c in top {
        println!("  {:<20} {}", c.label, c.count);
    }
    Ok(())
}

fn cmd_report(args: &[String], data_dir: &str) -> Result<()> {
    let config = PipelineConfig::load(data_dir)?;
    let db = flag_value(args, "--db")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.db_path.clone());
    let table_path = config.analysis_table_path();

    let table = riskfeed_core::table::AnalysisTable::load(&table_path)
        .with_context(|| format!("loading {}", table_path.display()))?;
    let mut store = ReportStore::open(&db.to_string_lossy())?;
    store.migrate()?;
    let loaded = store.load_table(&table)?;
    println!("Loaded {loaded} row(s) into {}", db.display());
    println!();

    let reports = store.standard_reports()?;
    println!("=== RISK DISTRIBUTION ===");
    for g in &reports.risk_distribution {
        println!("  {:<8} {}", g.key.join(" / "), g.count);
    }
    println!();
    println!("=== AVERAGE AMOUNT BY RISK ===");
    for g in &reports.avg_amount_by_risk {
        println!("  {:<8} {:.2}", g.key.join(" / "), g.mean_amount);
    }
    println!();
    println!("=== TOP 10 CUSTOMERS (HIGH RISK) ===");
    for g in &reports.top_customers_high_risk {
        println!("  {:<20} {}", g.key.join(" / "), g.count);
    }
    println!();
    println!("=== RISK BY SECTOR ===");
    for g in &reports.risk_by_sector {
        println!("  {:<24} {}", g.key.join(" / "), g.count);
    }
    println!();
    println!("=== MONTHLY HIGH RISK ===");
    for m in &reports.monthly_high_risk {
        println!("  {} {}", m.month, m.count);
    }
    Ok(())
}

fn cmd_charts(args: &[String], data_dir: &str) -> Result<()> {
    let config = PipelineConfig::load(data_dir)?;
    let figures_dir = flag_value(args, "--figures-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.figures_dir.clone());

    let table = riskfeed_core::table::AnalysisTable::load(&config.analysis_table_path())?;
    let files = charts::write_figures(&ChartSet::build(&table), &figures_dir)?;
    println!("=== CHARTS ===");
    for f in files {
        println!("  {}", f.display());
    }
    Ok(())
}

fn cmd_dashboard(args: &[String], data_dir: &str) -> Result<()> {
    let config = PipelineConfig::load(data_dir)?;
    let mut dash = Dashboard::new(config.analysis_table_path());
    let table = dash.snapshot()?;
    let filter = parse_filter(args)?;

    let options = dashboard::filter_options(&table);
    println!("{}", serde_json::to_string_pretty(&options)?);

    match dashboard::apply_filter(&table, &filter)? {
        DashboardOutcome::Empty { message } => println!("{message}"),
        DashboardOutcome::Ready(view) => {
            let report = DashboardReport {
                summary: view.summary(),
                top_high_risk_customers: view.top_high_risk_customers(),
                monthly_amount: view.monthly_amount(),
                sector_risk: view.sector_risk_pivot(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(export) = flag_value(args, "--export") {
                std::fs::write(export, view.to_csv_bytes()?)
                    .with_context(|| format!("writing {export}"))?;
                println!("Exported {} row(s) to {export}", view.len());
            }
        }
    }
    Ok(())
}

fn parse_filter(args: &[String]) -> Result<DashboardFilter> {
    let risk_levels = match flag_value(args, "--risk") {
        Some(list) => Some(
            split_list(list)
                .map(|s| s.parse::<RiskLevel>().map_err(|e| anyhow::anyhow!(e)))
                .collect::<Result<BTreeSet<_>>>()?,
        ),
        None => None,
    };
    let sectors = flag_value(args, "--sector").map(|list| split_list(list).map(String::from).collect());

    let from = parse_date_flag(args, "--from")?;
    let to = parse_date_flag(args, "--to")?;
    let date_range = match (from, to) {
        (None, None) => None,
        (Some(f), Some(t)) => Some((f, t)),
        (Some(f), None) => Some((f, NaiveDate::MAX)),
        (None, Some(t)) => Some((NaiveDate::MIN, t)),
    };
    Ok(DashboardFilter {
        risk_levels,
        sectors,
        date_range,
    })
}

fn print_run_summary(stats: &RunStats) {
    println!("=== RUN SUMMARY ===");
    println!("  customers in:        {}", stats.customers_in);
    println!("  transactions in:     {}", stats.transactions_in);
    println!("  payments in:         {}", stats.payments_in);
    println!("  joined rows:         {}", stats.joined_rows);
    println!("  duplicates dropped:  {}", stats.duplicates_dropped);
    println!("  output rows:         {}", stats.output_rows);
    println!("  unpaid:              {}", stats.unpaid);
    println!("  unknown customers:   {}", stats.unknown_customers);
    println!("  multi-payment txns:  {}", stats.multi_payment_txns);
    println!("  duplicate customers: {}", stats.duplicate_customers);
    println!("  due before txn date: {}", stats.due_before_txn_date);
    println!("  coerced fields:      {}", stats.coerced_fields);
    println!();
    println!("=== RISK DISTRIBUTION ===");
    for level in RiskLevel::ALL {
        let n = stats.risk.get(level);
        let pct = if stats.output_rows == 0 {
            0.0
        } else {
            n as f64 * 100.0 / stats.output_rows as f64
        };
        println!("  {:<8} {n:>8} ({pct:.1}%)", level.as_str());
    }
}

// ── Arg helpers ───────────────────────────────────────────────

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn parse_date_flag(args: &[String], flag: &str) -> Result<Option<NaiveDate>> {
    match flag_value(args, flag) {
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Ok(Some(d)),
            Err(e) => bail!("{flag} expects YYYY-MM-DD, got '{s}': {e}"),
        },
        None => Ok(None),
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

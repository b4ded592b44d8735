//! CLI entry point for `gmail-query`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use gmail_query::classify::classify;
use gmail_query::config;
use gmail_query::consolidate::Policy;
use gmail_query::fetch::gmail::{load_access_token, GmailClient};
use gmail_query::fetch::FetchQuery;
use gmail_query::model::rules::{load_rules, RuleSet};
use gmail_query::pipeline::{self, RunConfig, RunSummary};

#[derive(Parser)]
#[command(
    name = "gmail-query",
    version,
    about = "Download Gmail messages for a date range and sort them into folders"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Query messages and write them to the output folder
    Query {
        /// First day to search (YYYY-MM-DD). Defaults to today.
        #[arg(short = 'd', long)]
        begin_date: Option<NaiveDate>,
        /// Last day to search, inclusive (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Restrict to a Gmail label
        #[arg(short, long)]
        label: Option<String>,
        /// Raw Gmail search string (see Gmail's search operators)
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Rules file (overrides config)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Download attachments
        #[arg(long)]
        attachments: bool,
        /// Thread representative: "first" or "last" (overrides config)
        #[arg(long)]
        policy: Option<String>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the rules file without touching the network
    CheckRules {
        /// Rules file (overrides config)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let cfg = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => cfg.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    match cli.command {
        Commands::Query {
            begin_date,
            end_date,
            label,
            search,
            output,
            rules,
            attachments,
            policy,
            json,
        } => cmd_query(
            &cfg, begin_date, end_date, label, search, output, rules, attachments, policy, json,
        ),
        Commands::CheckRules { rules } => cmd_check_rules(&cfg, rules),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "gmail-query.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Resolve the rules to use: CLI override, then config, then none.
fn resolve_rules(cfg: &config::Config, cli_rules: Option<PathBuf>) -> anyhow::Result<Vec<RuleSet>> {
    let path = cli_rules.or_else(|| cfg.rules.path.clone());
    match path {
        Some(p) => Ok(load_rules(&p)?),
        None => Ok(Vec::new()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_query(
    cfg: &config::Config,
    begin_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    label: Option<String>,
    search: Option<String>,
    output: Option<PathBuf>,
    rules: Option<PathBuf>,
    attachments: bool,
    policy: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive();
    let begin_date = begin_date.unwrap_or(today);
    let end_date = end_date.unwrap_or(today);
    if end_date < begin_date {
        anyhow::bail!("end date {end_date} is before begin date {begin_date}");
    }

    let policy_str = policy.unwrap_or_else(|| cfg.general.policy.clone());
    let policy = Policy::from_str_opt(&policy_str)
        .ok_or_else(|| anyhow::anyhow!("Unknown policy '{policy_str}'. Supported: first, last"))?;

    let rules = resolve_rules(cfg, rules)?;

    let credentials_path = cfg
        .fetch
        .credentials_path
        .clone()
        .or_else(config::default_credentials_path)
        .ok_or_else(|| anyhow::anyhow!("Could not determine the credentials file path"))?;
    let token = load_access_token(&credentials_path)?;
    let client = GmailClient::new(token, cfg.fetch.max_results);

    let query = FetchQuery {
        begin_date,
        end_date,
        label,
        search,
        download_attachments: attachments || cfg.fetch.download_attachments,
        max_attachment_size: Some(cfg.fetch.max_attachment_size),
    };

    let run_config = RunConfig {
        output_dir: output.unwrap_or_else(|| cfg.general.output_dir.clone()),
        policy,
        case_sensitive: cfg.general.case_sensitive,
        rules,
        max_attachment_size: cfg.fetch.max_attachment_size,
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Fetching [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let summary = pipeline::run(
        &client,
        &query,
        &run_config,
        Some(&|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    )?;

    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary_table(&summary, &pipeline::output_root(&run_config.output_dir, &query));
    }

    Ok(())
}

/// Validate the rules file: structure and pattern compilation.
fn cmd_check_rules(cfg: &config::Config, rules: Option<PathBuf>) -> anyhow::Result<()> {
    let rules = resolve_rules(cfg, rules)?;
    if rules.is_empty() {
        println!("  No rules configured.");
        return Ok(());
    }

    // Classifying empty text compiles every pattern, so a broken one
    // surfaces here the same way it would mid-run.
    classify("", &rules, cfg.general.case_sensitive)?;

    println!("  {} rule set(s) OK:", rules.len());
    for rule in &rules {
        println!(
            "  {:<30} priority {:<5} {} pattern(s)",
            rule.name,
            rule.priority,
            rule.patterns.len()
        );
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "gmail-query", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print the run summary in a human-readable table.
fn print_summary_table(summary: &RunSummary, output_root: &std::path::Path) {
    println!();
    println!("  {:<20} {}", "Messages fetched", summary.fetched);
    println!("  {:<20} {}", "Threads", summary.threads);
    println!("  {:<20} {}", "Files written", summary.written.len());
    println!("  {:<20} {}", "Output folder", output_root.display());

    if !summary.by_folder.is_empty() {
        println!();
        println!("  By destination:");
        for (folder, count) in &summary.by_folder {
            println!("    {count:>6}  {folder}");
        }
    }
    println!();
}

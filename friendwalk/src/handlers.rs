use crate::{CrawlLoop, CrawlProgressCallback, approve_all, generate_crawl_report, generate_stats_report};
use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use friendwalk_core::config::{self, CrawlConfig, DEFAULT_CONFIG_DIR};
use friendwalk_core::data::Database;
use friendwalk_scanner::HttpSession;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;

const DATABASE_FILE_NAME: &str = "id_queue.db";
const MEDIA_DIR_NAME: &str = "image";

/// Install the fmt subscriber according to the global `-q`, `-v` and
/// `--log-file` flags.
pub fn init_tracing(matches: &ArgMatches) -> anyhow::Result<()> {
    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else if matches.get_flag("quiet") {
        Level::WARN
    } else {
        Level::INFO
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    match matches.get_one::<PathBuf>("log-file") {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

/// Whether tracing output goes to `--log-file` rather than stderr.
pub fn logs_to_file(matches: &ArgMatches) -> bool {
    matches.get_one::<PathBuf>("log-file").is_some()
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> io::Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

/// Config file named by `--config`, or the one in the default config directory.
pub fn config_path(args: &ArgMatches) -> PathBuf {
    args.get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| config::config_file_in(DEFAULT_CONFIG_DIR))
}

/// Load the config file and layer environment credentials and command-line
/// overrides on top of it.
pub fn load_config(args: &ArgMatches) -> anyhow::Result<CrawlConfig> {
    let path = config_path(args);
    let mut config = CrawlConfig::load(&path)
        .with_context(|| format!("cannot load config {}", path.display()))?;
    config.apply_env();
    apply_overrides(&mut config, args);
    Ok(config)
}

/// Apply whichever of `--database`, `--media-dir` and `--seed` the
/// subcommand defines and the user passed.
pub fn apply_overrides(config: &mut CrawlConfig, args: &ArgMatches) {
    let defined = |id: &str| args.try_contains_id(id).unwrap_or(false);

    if defined("database")
        && let Some(path) = args.get_one::<PathBuf>("database")
    {
        config.database = expand(path);
    }
    if defined("media-dir")
        && let Some(path) = args.get_one::<PathBuf>("media-dir")
    {
        config.media_dir = expand(path);
    }
    if defined("seed")
        && let Some(seed) = args.get_one::<String>("seed")
    {
        config.seed = seed.clone();
    }
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Write a default config into `dir` pointing at a database and media
/// directory beside it, and create the database. With `reset`, an existing
/// database is dropped first.
pub fn init_workspace(dir: &Path, reset: bool) -> anyhow::Result<CrawlConfig> {
    let config = CrawlConfig {
        database: dir.join(DATABASE_FILE_NAME),
        media_dir: dir.join(MEDIA_DIR_NAME),
        ..CrawlConfig::default()
    };
    config.save(&dir.join(config::CONFIG_FILE_NAME))?;

    if reset && Database::exists(&config.database) {
        Database::drop(&config.database)
            .with_context(|| format!("cannot remove {}", config.database.display()))?;
    }
    Database::new(&config.database)
        .with_context(|| format!("cannot create database {}", config.database.display()))?;
    Ok(config)
}

pub fn handle_init(args: &ArgMatches) -> anyhow::Result<()> {
    print_divider();
    println!("{}", "  FRIENDWALK INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let raw_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let dir = expand(Path::new(raw_dir));
    let config_file = dir.join(config::CONFIG_FILE_NAME);
    let db_path = dir.join(DATABASE_FILE_NAME);
    let force = args.get_flag("force");

    println!(
        "{} Target: {}",
        "→".blue(),
        dir.display().to_string().bright_white()
    );
    println!();

    let existing: Vec<&PathBuf> = [&config_file, &db_path]
        .into_iter()
        .filter(|p| p.exists())
        .collect();

    if !existing.is_empty() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Existing files found:");
        for path in &existing {
            println!(
                "  {} {}",
                "•".yellow(),
                path.display().to_string().bright_white()
            );
        }
        println!();
        println!(
            "{}",
            "This will overwrite the config and reset the crawl queue.".yellow()
        );

        let response = print_prompt("Do you want to continue? [y/N]:")?;
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
    }

    println!("{} Writing config and creating database...", "→".blue());
    let config = init_workspace(&dir, true)?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_white()
    );
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        config.database.display().to_string().bright_white()
    );
    println!(
        "{} Media directory: {}",
        "✓".green().bold(),
        config.media_dir.display().to_string().bright_white()
    );
    println!(
        "{} Set credentials in the config or via {} / {}",
        "ℹ".blue(),
        config::USERNAME_ENV.cyan(),
        config::PASSWORD_ENV.cyan()
    );
    println!();
    Ok(())
}

fn spinner(quiet: bool) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

pub async fn handle_crawl(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let limit = args.get_one::<usize>("limit").copied();

    println!(
        "\n🕷️  Crawling friend graph from {}",
        config.site.base_url.bright_white()
    );
    println!("Database: {}", config.database.display());
    println!("Media directory: {}", config.media_dir.display());
    if let Some(limit) = limit {
        println!("Node limit: {}", limit);
    }
    println!();

    let db = Database::new(&config.database)
        .with_context(|| format!("cannot open crawl database {}", config.database.display()))?;
    let session = HttpSession::new(config.session_options())?;

    let progress = spinner(args.get_flag("quiet"))?;
    let bar = progress.clone();
    let callback: CrawlProgressCallback = Arc::new(move |msg: String| bar.set_message(msg));

    let mut crawl = CrawlLoop::from_config(&session, &db, &config)?
        .with_limit(limit)
        .with_progress_callback(callback);
    let result = crawl.run().await;
    progress.finish_and_clear();
    let summary = result?;

    println!("\n{} Crawl stopped\n", "✓".green().bold());
    let report = generate_crawl_report(&summary, db.visited().len()?, db.queue().len()?);
    print!("{}", report);
    Ok(())
}

pub async fn handle_approve(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let limit = args.get_one::<usize>("limit").copied();
    let session = HttpSession::new(config.session_options())?;

    let approved = approve_all(&session, &config.site.request_list_url, limit).await?;
    println!(
        "\n{} Approved {} request(s)",
        "✓".green().bold(),
        approved.to_string().cyan()
    );
    Ok(())
}

/// Record counts of the database a config (plus overrides) points at.
pub fn database_stats(config: &CrawlConfig) -> anyhow::Result<(u64, u64)> {
    if !Database::exists(&config.database) {
        bail!(
            "no crawl database at {} (run `friendwalk init` first)",
            config.database.display()
        );
    }
    let db = Database::new(&config.database)?;
    Ok((db.visited().len()?, db.queue().len()?))
}

pub fn handle_stats(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let (visited, queued) = database_stats(&config)?;

    println!("{}", config.database.display().to_string().bright_white());
    print!("{}", generate_stats_report(visited, queued));
    Ok(())
}

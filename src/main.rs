mod config;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, RunConfig};
use crate::storage::{archive_path, ArchiveStore, JsonArchiveStore};

#[derive(Parser)]
#[command(name = "fgps", about = "Archive posts and comment threads of Facebook groups", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl one or more groups and merge new posts into their archives
    Scrape {
        /// Group ids, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        groups: Vec<String>,

        /// Existing directory the group folders are written to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Index of the first post to scrape
        #[arg(short, long, default_value_t = 0)]
        start: usize,

        /// Index one past the last post to scrape (0 = every rendered post)
        #[arg(short, long, default_value_t = 0)]
        end: usize,

        /// Debug-level logging
        #[arg(long)]
        debug: bool,

        /// Show the browser window
        #[arg(long)]
        headful: bool,

        /// Save a PDF of each post's comment page
        #[arg(long)]
        screenshot: bool,
    },

    /// Show totals of a group's archive
    Stats {
        /// Group folder name (the sanitised group title)
        #[arg(short, long)]
        group: String,

        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let debug = matches!(cli.command, Command::Scrape { debug: true, .. });
    let filter = match (cli.verbose, debug) {
        (0, false) => "fgps=info,warn",
        (0, true) | (1, _) => "fgps=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Scrape {
            groups,
            output,
            start,
            end,
            debug,
            headful,
            screenshot,
        } => {
            ensure_dir(&output)?;
            if headful {
                config.crawler.headless = false;
            }
            let run = RunConfig {
                group_ids: groups,
                output_dir: output,
                start,
                end,
                debug,
                screenshot,
            };
            scrape(config, run).await?;
        }

        Command::Stats { group, output } => {
            ensure_dir(&output)?;
            let path = archive_path(&output, &group);
            if !path.exists() {
                bail!("No archive at {:?}", path);
            }
            let stats = JsonArchiveStore.load(&path)?.stats();
            println!("─────────────────────────────────");
            println!("  {}", group);
            println!("─────────────────────────────────");
            println!("  Publications : {}", utils::fmt_number(stats.publications));
            println!("  Comments     : {}", utils::fmt_number(stats.comments));
            println!("  Replies      : {}", utils::fmt_number(stats.replies));
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("Output directory {:?} does not exist or is not a directory", path);
    }
    Ok(())
}

#[cfg(feature = "browser")]
async fn scrape(config: AppConfig, run: RunConfig) -> Result<()> {
    use crate::pipeline::Pipeline;
    use crate::scraper::browser;
    use crate::scraper::login::login;
    use crate::scraper::throttle::JitterThrottle;
    use tracing::{info, warn};

    let _t = utils::Timer::start("Scrape");
    let (mut chrome, events) = browser::launch(&config.crawler).await?;
    let feed = browser::open_page(&chrome).await?;
    let comments = browser::open_page(&chrome).await?;

    match config.credentials.pair() {
        Some(creds) => {
            login(
                &feed,
                &config.crawler.login_url,
                creds,
                &config.selectors,
                config.crawler.nav_timeout(),
            )
            .await?;
        }
        None => warn!("No credentials configured; crawling without logging in"),
    }

    let requested = run.group_ids.len();
    let pipeline = Pipeline::new(feed, comments, JsonArchiveStore, JitterThrottle, config, run)?;
    let stats = pipeline.run().await;
    drop(pipeline);

    if let Err(e) = chrome.close().await {
        warn!("Browser close error: {}", e);
    }
    events.abort();

    info!(
        "Done: {} groups, {} new publications, {} failed",
        requested,
        utils::fmt_number(stats.publications_appended),
        stats.groups_failed
    );
    if requested > 0 && stats.groups_failed == requested {
        bail!("Every requested group failed");
    }
    Ok(())
}

#[cfg(not(feature = "browser"))]
async fn scrape(_config: AppConfig, _run: RunConfig) -> Result<()> {
    bail!("fgps was built without the `browser` feature")
}

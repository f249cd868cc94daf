//! Pipeline orchestrator: ties page → extractors → archive together.
//!
//! ## Per group
//!   1. Open the group feed, name the group after the page title
//!   2. Scroll until the rendered post count stops growing (or the end
//!      index is covered)
//!   3. Extract posts `start..end`, harvesting each post's comment thread on
//!      the second browsing context
//!   4. Merge into the group's archive and write it back once
//!
//! Groups are independent: a failing group is logged and the next one runs.
//! Within a group, a lost browser session stops the remaining posts, and
//! whatever was gathered up to that point is still merged and written.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{AppConfig, RunConfig};
use crate::loader::ScrollLoader;
use crate::models::Publication;
use crate::scraper::comments::{harvest_or_empty, CommentHarvester};
use crate::scraper::posts::PostExtractor;
use crate::scraper::throttle::Throttle;
use crate::scraper::{DriverError, PageDriver};
use crate::storage::{archive_path, Archive, ArchiveStore};
use crate::utils::{allocate_run_folder, sanitise_group_name, Timer};

pub struct Pipeline<P, S, T> {
    /// Browsing context for the group feed.
    feed: P,
    /// Browsing context for permalink / comment pages.
    comments: P,
    store: S,
    throttle: T,
    config: AppConfig,
    run: RunConfig,
    origin: Url,
}

impl<P: PageDriver, S: ArchiveStore, T: Throttle> Pipeline<P, S, T> {
    pub fn new(feed: P, comments: P, store: S, throttle: T, config: AppConfig, run: RunConfig) -> Result<Self> {
        let origin = Url::parse(&config.crawler.site_origin)
            .with_context(|| format!("Invalid site origin {:?}", config.crawler.site_origin))?;
        Ok(Self {
            feed,
            comments,
            store,
            throttle,
            config,
            run,
            origin,
        })
    }

    pub async fn run(&self) -> PipelineStats {
        let mut stats = PipelineStats::default();
        if self.run.debug {
            debug!("active selectors: {:#?}", self.config.selectors);
        }

        for id in &self.run.group_ids {
            info!("=== Group {} ===", id);
            match self.crawl_group(id).await {
                Ok(report) => {
                    info!(
                        "{}: {} rendered | {} extracted | {} new | {} already archived | {} comment failures{}",
                        report.group,
                        report.rendered,
                        report.extracted,
                        report.appended,
                        report.skipped_known,
                        report.comment_failures,
                        if report.aborted { " | range aborted" } else { "" },
                    );
                    stats.publications_appended += report.appended;
                    stats.reports.push(report);
                }
                Err(e) => {
                    error!("group {} failed: {:#}", id, e);
                    stats.groups_failed += 1;
                }
            }
        }

        stats
    }

    async fn crawl_group(&self, id: &str) -> Result<GroupReport> {
        let _t = Timer::start(format!("group {}", id));
        let crawler = &self.config.crawler;
        let sel = &self.config.selectors;

        let url = crawler.group_url(id);
        self.feed
            .navigate(&url, crawler.nav_timeout())
            .await
            .with_context(|| format!("Failed to open group feed {}", url))?;

        let title = match self.feed.title().await {
            Ok(t) => t,
            Err(e) => {
                warn!("could not read group title: {}", e);
                String::new()
            }
        };
        let group = sanitise_group_name(&title, id);
        debug!("Group title {:?} → {:?}", title, group);

        let archive_file = archive_path(&self.run.output_dir, &group);

        self.feed
            .wait_for(&sel.feed_ready, crawler.marker_timeout())
            .await
            .context("Group feed never rendered")?;

        let snapshot_dir: Option<PathBuf> = if self.run.screenshot {
            let group_dir = self.run.output_dir.join(&group);
            Some(allocate_run_folder(&group_dir, Local::now().date_naive())?)
        } else {
            None
        };

        let bound = self.run.upper_bound();
        let stable = ScrollLoader::new(&self.feed, &self.throttle)
            .load_until_stable(&sel.post_container, bound)
            .await
            .context("Loading the feed failed")?;
        debug!("feed settled: {:?}", stable);

        let mut archive = self.store.load(&archive_file)?;
        info!("Total posts before scraping: {}", archive.len());

        let containers = self
            .feed
            .query_all(&sel.post_container, None)
            .await
            .context("Could not enumerate posts")?;
        let end = match bound {
            Some(e) if e < containers.len() => e,
            _ => containers.len(),
        };
        let start = self.run.start.min(end);
        info!("found {} posts, scraping {} to {}", containers.len(), start, end);

        let extractor = PostExtractor::new(sel, &self.origin);
        let harvester = CommentHarvester::new(
            &self.comments,
            &self.throttle,
            sel,
            crawler.nav_timeout(),
            crawler.marker_timeout(),
        )
        .with_snapshots(snapshot_dir.as_deref());

        let mut report = GroupReport {
            group: group.clone(),
            rendered: containers.len(),
            ..Default::default()
        };
        let mut fresh: Vec<Publication> = Vec::new();

        for (i, container) in containers.iter().enumerate().take(end).skip(start) {
            debug!("Scraping post {}/{}", i + 1, end);
            let outcome = self
                .scrape_post(i, container, &extractor, &harvester, &archive, &fresh, &mut report)
                .await;
            match outcome {
                Ok(Some(publication)) => fresh.push(publication),
                Ok(None) => {}
                Err(e) => {
                    error!("failed on post {} with {}; skipping the rest of the range", i + 1, e);
                    report.aborted = true;
                    break;
                }
            }
        }

        report.appended = archive.merge(fresh);
        self.store.persist(&archive_file, &archive)?;
        info!("{}: {} publications archived", group, archive.len());
        Ok(report)
    }

    /// One post. `Ok(None)` when the post is archived already.
    #[allow(clippy::too_many_arguments)]
    async fn scrape_post(
        &self,
        i: usize,
        container: &P::Node,
        extractor: &PostExtractor<'_>,
        harvester: &CommentHarvester<'_, P, T>,
        archive: &Archive,
        fresh: &[Publication],
        report: &mut GroupReport,
    ) -> Result<Option<Publication>, DriverError> {
        let number = i + 1;
        let draft = extractor.extract(&self.feed, container, i).await?;
        report.extracted += 1;

        let known = archive.contains(&draft.author, &draft.post)
            || fresh.iter().any(|p| p.identity() == (draft.author.as_str(), draft.post.as_str()));
        if known {
            debug!("post {} by {:?} already archived", number, draft.author);
            report.skipped_known += 1;
            return Ok(None);
        }

        let comments = match draft.link.as_deref() {
            Some(link) => {
                let (comments, ok) = harvest_or_empty(harvester, link, number).await?;
                if !ok {
                    report.comment_failures += 1;
                }
                comments
            }
            None => Vec::new(),
        };

        Ok(Some(draft.into_publication(number, comments)))
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct GroupReport {
    pub group: String,
    /// Post containers on the page after loading settled.
    pub rendered: usize,
    pub extracted: usize,
    pub appended: usize,
    pub skipped_known: usize,
    pub comment_failures: usize,
    /// A lost session cut the index range short.
    pub aborted: bool,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub reports: Vec<GroupReport>,
    pub groups_failed: usize,
    pub publications_appended: usize,
}

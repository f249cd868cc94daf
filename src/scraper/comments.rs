use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cleaner::normalise_reactions;
use super::replies::extract_replies;
use super::selectors::Selectors;
use super::throttle::Throttle;
use super::{field, DriverError, PageDriver};
use crate::loader::{ScrollLoader, ScrollProfile};
use crate::models::Comment;

/// Clicks between two fast settles while expanding reply threads.
const CLICKS_PER_SETTLE: usize = 10;

/// Harvests the comment thread behind a post's permalink, on the secondary
/// browsing context.
pub struct CommentHarvester<'a, P, T> {
    page: &'a P,
    throttle: &'a T,
    selectors: &'a Selectors,
    nav_timeout: Duration,
    marker_timeout: Duration,
    /// Folder for per-post PDF snapshots, when enabled.
    snapshot_dir: Option<&'a Path>,
}

impl<'a, P: PageDriver, T: Throttle> CommentHarvester<'a, P, T> {
    pub fn new(
        page: &'a P,
        throttle: &'a T,
        selectors: &'a Selectors,
        nav_timeout: Duration,
        marker_timeout: Duration,
    ) -> Self {
        Self {
            page,
            throttle,
            selectors,
            nav_timeout,
            marker_timeout,
            snapshot_dir: None,
        }
    }

    pub fn with_snapshots(mut self, dir: Option<&'a Path>) -> Self {
        self.snapshot_dir = dir;
        self
    }

    /// Comments in DOM order, each carrying its replies.
    ///
    /// Navigation and marker failures come back as errors for the caller to
    /// treat as an item-level failure. Inside the thread, a failed click or
    /// field read is logged and skipped.
    pub async fn harvest(&self, permalink: &str, post_ordinal: usize) -> Result<Vec<Comment>, DriverError> {
        let sel = self.selectors;
        let loader = ScrollLoader::new(self.page, self.throttle);

        self.page.navigate(permalink, self.nav_timeout).await?;
        self.page.wait_for(&sel.comments_ready, self.marker_timeout).await?;
        loader.load(ScrollProfile::Fast).await?;

        self.expand_replies(&loader).await?;
        loader.load(ScrollProfile::Fast).await?;

        if let Some(dir) = self.snapshot_dir {
            let path = dir.join(format!("{}.pdf", post_ordinal));
            debug!("taking snapshot of post {}", post_ordinal);
            if let Err(e) = self.page.save_pdf(&path).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("snapshot of post {} failed: {}", post_ordinal, e);
            }
        }

        let containers = self.page.query_all(&sel.comment_container, None).await?;
        debug!("found {} comments", containers.len());

        let mut comments = Vec::with_capacity(containers.len());
        for (i, node) in containers.iter().enumerate() {
            comments.push(self.read_comment(i, node).await?);
        }
        Ok(comments)
    }

    /// Click every "see more replies" affordance, settling every tenth click.
    async fn expand_replies(&self, loader: &ScrollLoader<'_, P, T>) -> Result<(), DriverError> {
        let links = self.page.query_all(&self.selectors.more_replies, None).await?;
        if links.is_empty() {
            return Ok(());
        }
        debug!("clicking {} elements for replies", links.len());

        for (i, link) in links.iter().enumerate() {
            if i > 0 && i % CLICKS_PER_SETTLE == 0 {
                loader.load(ScrollProfile::Fast).await?;
            }
            match self.page.click(link).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("failed to expand replies #{}: {}", i, e),
            }
        }
        Ok(())
    }

    /// First `selector` match that belongs to the comment itself rather than
    /// to one of its nested replies.
    async fn own_first(&self, selector: &str, comment: &P::Node) -> Result<Option<P::Node>, DriverError> {
        Ok(self
            .page
            .query_own(selector, comment, &self.selectors.reply_container)
            .await?
            .into_iter()
            .next())
    }

    async fn read_comment(&self, i: usize, node: &P::Node) -> Result<Comment, DriverError> {
        let sel = self.selectors;

        let replies = field(&format!("comment {} replies", i), async {
            extract_replies(self.page, node, sel).await.map(Some)
        })
        .await?
        .unwrap_or_default();

        let reactions = field(&format!("comment {} reactions", i), async {
            match self.own_first(&sel.comment_reactions, node).await? {
                Some(r) => self.page.text(&r).await.map(Some),
                None => Ok(None),
            }
        })
        .await?;

        let author = self.own_first(&sel.comment_author, node).await;
        let body = self.own_first(&sel.comment_body, node).await;
        let date = self.own_first(&sel.comment_date, node).await;
        let texts = field(&format!("comment {} author/body/date", i), async {
            let (author, body, date) = (author?, body?, date?);
            self.page
                .read_texts(&[author.as_ref(), body.as_ref(), date.as_ref()])
                .await
                .map(Some)
        })
        .await?;
        let [author, post, date] = texts
            .and_then(|t| <[String; 3]>::try_from(t).ok())
            .unwrap_or_default();

        debug!("finalising comment {} by {}", i, author);
        Ok(Comment {
            author,
            post,
            date,
            reactions: normalise_reactions(reactions.as_deref()),
            replies,
        })
    }
}

/// Harvest with failures folded into an empty list, for callers that treat
/// the whole thread as one item.
pub async fn harvest_or_empty<P: PageDriver, T: Throttle>(
    harvester: &CommentHarvester<'_, P, T>,
    permalink: &str,
    post_ordinal: usize,
) -> Result<(Vec<Comment>, bool), DriverError> {
    match harvester.harvest(permalink, post_ordinal).await {
        Ok(comments) => {
            info!("post {}: {} comments", post_ordinal, comments.len());
            Ok((comments, true))
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("failed on scraping comments at post {}: {}", post_ordinal, e);
            Ok((Vec::new(), false))
        }
    }
}

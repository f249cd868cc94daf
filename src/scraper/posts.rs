//! Field extraction for one rendered feed post.
//!
//! Every lookup is scoped to the post's own container; a page-wide list
//! indexed by position drifts as soon as one post lacks a node.

use tracing::debug;
use url::Url;

use super::cleaner::{absolutise, is_blank, normalise_reactions};
use super::selectors::Selectors;
use super::{field, DriverError, PageDriver};
use crate::models::PostDraft;

pub struct PostExtractor<'a> {
    selectors: &'a Selectors,
    origin: &'a Url,
}

impl<'a> PostExtractor<'a> {
    pub fn new(selectors: &'a Selectors, origin: &'a Url) -> Self {
        Self { selectors, origin }
    }

    /// Extract the post in `container`. Fields that cannot be read come back
    /// empty (text), `None` (link) or `"0"` (reactions); only a lost session
    /// is an error.
    pub async fn extract<P: PageDriver>(
        &self,
        page: &P,
        container: &P::Node,
        index: usize,
    ) -> Result<PostDraft, DriverError> {
        let sel = self.selectors;

        let author = field(&format!("post {} author", index), async {
            read_text(page, &sel.post_author, container).await
        })
        .await?;

        let date = field(&format!("post {} date", index), async {
            read_text(page, &sel.post_subtitle, container).await
        })
        .await?;

        let link = field(&format!("post {} link", index), async {
            match page.query_first(&sel.post_subtitle, Some(container)).await? {
                Some(node) => page.attribute(&node, "href").await,
                None => Ok(None),
            }
        })
        .await?
        .flatten_blank()
        .map(|href| absolutise(&href, self.origin));

        debug!("getting text from post {}", index);
        let post = field(&format!("post {} body", index), async {
            let Some(body) = page.query_first(&sel.post_body, Some(container)).await? else {
                return Ok(None);
            };
            let text = page.text(&body).await?;
            if !is_blank(&text) {
                return Ok(Some(text));
            }
            debug!("no text in post {}, getting link", index);
            match page.query_first(&sel.post_body_link, Some(&body)).await? {
                Some(a) => Ok(page
                    .attribute(&a, "href")
                    .await?
                    .flatten_blank()
                    .map(|href| absolutise(&href, self.origin))),
                None => Ok(Some(text)),
            }
        })
        .await?;

        let reactions = field(&format!("post {} reactions", index), async {
            read_text(page, &sel.post_reactions, container).await
        })
        .await?;

        Ok(PostDraft {
            author: author.unwrap_or_default(),
            post: post.unwrap_or_default(),
            date: date.unwrap_or_default(),
            link,
            reactions: normalise_reactions(reactions.as_deref()),
        })
    }
}

/// Text of the first `selector` match below `scope`; `None` when nothing matches.
async fn read_text<P: PageDriver>(
    page: &P,
    selector: &str,
    scope: &P::Node,
) -> Result<Option<String>, DriverError> {
    match page.query_first(selector, Some(scope)).await? {
        Some(node) => page.text(&node).await.map(Some),
        None => Ok(None),
    }
}

trait FlattenBlank {
    fn flatten_blank(self) -> Option<String>;
}

impl FlattenBlank for Option<String> {
    fn flatten_blank(self) -> Option<String> {
        self.filter(|s| !is_blank(s))
    }
}

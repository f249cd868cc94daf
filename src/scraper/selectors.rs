//! Lookup expressions for every field the extractors read.
//!
//! Markup changes on the remote site land here and nowhere else. Any key can
//! be overridden from config, e.g. `FGPS__SELECTORS__POST_BODY`.
//!
//! Lookups that take a scope are evaluated relative to that element
//! (descendants only), so a selector never reaches into a sibling post.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Selectors {
    // ── Feed ──────────────────────────────────────────────────────────────────
    /// Present once the group feed has rendered its first story.
    pub feed_ready: String,
    pub post_container: String,
    pub post_author: String,
    /// Subtitle anchor: its text is the relative date, its href the permalink.
    pub post_subtitle: String,
    pub post_body: String,
    /// Looked up inside the body when the body has no text of its own.
    pub post_body_link: String,
    pub post_reactions: String,

    // ── Comment page ──────────────────────────────────────────────────────────
    pub comments_ready: String,
    pub more_replies: String,
    pub comment_container: String,
    pub comment_author: String,
    pub comment_body: String,
    pub comment_date: String,
    pub comment_reactions: String,

    // ── Replies (scoped to one comment, then to one reply) ────────────────────
    pub reply_container: String,
    pub reply_author: String,
    pub reply_body: String,
    pub reply_date: String,
    pub reply_reactions: String,

    // ── Login ─────────────────────────────────────────────────────────────────
    pub login_cookie_accept: String,
    pub login_email: String,
    pub login_password: String,
    pub login_submit: String,
    pub login_done: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            feed_ready: "article > div.story_body_container".into(),
            post_container: "article[data-store-id]".into(),
            post_author: "div.story_body_container > header strong:first-child > a".into(),
            post_subtitle: r#"div.story_body_container > header div[data-sigil="m-feed-voice-subtitle"] a"#.into(),
            post_body: "div.story_body_container > div".into(),
            post_body_link: "a".into(),
            post_reactions: r#"footer div[data-sigil="reactions-sentence-container"] > div"#.into(),

            comments_ready: r#"div[data-sigil="m-mentions-expand"]"#.into(),
            more_replies: r#"[data-sigil="replies-see-more"] > a"#.into(),
            comment_container: r#"[data-sigil="comment"]"#.into(),
            comment_author: "._2b05 > a".into(),
            comment_body: r#"[data-sigil="comment-body"]"#.into(),
            comment_date: r#"[data-sigil="ufi-inline-comment-actions"] > abbr"#.into(),
            comment_reactions: "._2b04 > ._14v5 ._14va".into(),

            reply_container: r#"[data-sigil="comment inline-reply"]"#.into(),
            reply_author: "._2b05 > a".into(),
            reply_body: r#"[data-sigil="comment-body"]"#.into(),
            reply_date: r#"[data-sigil="ufi-inline-comment-actions"] > abbr"#.into(),
            reply_reactions: "._14va".into(),

            login_cookie_accept: r#"button[data-cookiebanner="accept_button"]"#.into(),
            login_email: "#email".into(),
            login_password: "#pass".into(),
            login_submit: r#"button[data-testid="royal_login_button"]"#.into(),
            login_done: r#"div[data-pagelet="Stories"]"#.into(),
        }
    }
}

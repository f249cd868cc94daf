use tracing::{debug, warn};

use super::cleaner::normalise_reactions;
use super::selectors::Selectors;
use super::{field, DriverError, PageDriver};
use crate::models::Reply;

/// Replies nested under one comment node, in document order.
///
/// Each reply's fields are looked up inside that reply's own container, so a
/// reply with a missing author cannot shift its neighbours' fields.
pub async fn extract_replies<P: PageDriver>(
    page: &P,
    comment: &P::Node,
    sel: &Selectors,
) -> Result<Vec<Reply>, DriverError> {
    let containers = page.query_all(&sel.reply_container, Some(comment)).await?;
    debug!("found {} replies", containers.len());
    if containers.is_empty() {
        return Ok(Vec::new());
    }

    let mut replies = Vec::with_capacity(containers.len());
    for (i, reply) in containers.iter().enumerate() {
        let reactions = field(&format!("reply {} reactions", i), async {
            match page.query_first(&sel.reply_reactions, Some(reply)).await? {
                Some(node) => page.text(&node).await.map(Some),
                None => Ok(None),
            }
        })
        .await?;

        let author = page.query_first(&sel.reply_author, Some(reply)).await;
        let body = page.query_first(&sel.reply_body, Some(reply)).await;
        let date = page.query_first(&sel.reply_date, Some(reply)).await;

        let texts = field(&format!("reply {} author/body/date", i), async {
            let (author, body, date) = (author?, body?, date?);
            page.read_texts(&[author.as_ref(), body.as_ref(), date.as_ref()])
                .await
                .map(Some)
        })
        .await?;

        let [author, post, date] = match texts {
            Some(t) => <[String; 3]>::try_from(t).unwrap_or_default(),
            None => {
                warn!("reply {} kept with empty author/body/date", i);
                Default::default()
            }
        };

        replies.push(Reply {
            author,
            post,
            date,
            reactions: normalise_reactions(reactions.as_deref()),
        });
    }

    debug!("finished scraping {} replies", replies.len());
    Ok(replies)
}

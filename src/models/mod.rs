use serde::{Deserialize, Deserializer, Serialize};

// ── Publication ───────────────────────────────────────────────────────────────

/// One harvested feed post. Field order is the on-disk order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Publication {
    #[serde(default)]
    pub number: usize,
    #[serde(default, deserialize_with = "lenient_text")]
    pub author: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub post: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "zero_reactions")]
    pub reactions: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub comments: Vec<Comment>,
}

impl Publication {
    /// Dedup identity. The source exposes no stable id, so author + body it is.
    pub fn identity(&self) -> (&str, &str) {
        (&self.author, &self.post)
    }
}

// ── Comment / Reply ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Comment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub author: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub post: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default = "zero_reactions")]
    pub reactions: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Reply {
    #[serde(default, deserialize_with = "lenient_text")]
    pub author: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub post: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default = "zero_reactions")]
    pub reactions: String,
}

// ── Post draft (extractor output before numbering / comments) ─────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub author: String,
    pub post: String,
    pub date: String,
    pub link: Option<String>,
    pub reactions: String,
}

impl PostDraft {
    pub fn into_publication(self, number: usize, comments: Vec<Comment>) -> Publication {
        Publication {
            number,
            author: self.author,
            post: self.post,
            date: self.date,
            link: self.link,
            reactions: self.reactions,
            comments,
        }
    }
}

// ── Serde helpers ─────────────────────────────────────────────────────────────

pub fn zero_reactions() -> String {
    "0".to_string()
}

/// Older archives wrote `"{}"` where a comment list failed to load.
/// Anything that is not an array reads as an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).map_err(serde::de::Error::custom),
        _ => Ok(Vec::new()),
    }
}

/// Older archives wrote an image-only post's body as a one-element array of
/// hrefs, and `null` where a text read failed. The first string of an array
/// is kept; `null` and anything else non-textual read as empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .into_iter()
            .find_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .unwrap_or_default(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

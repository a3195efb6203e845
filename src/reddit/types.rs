//! Reddit JSON wire types.
//!
//! Every object arrives wrapped as `{"kind": ..., "data": {...}}`. Only the
//! kinds returned by listing and comment endpoints are modelled.

use serde::{Deserialize, Deserializer};

use crate::model::DELETED_AUTHOR;
use crate::traits::{CommentNode, MoreComments, PlatformComment, PlatformError, Submission};

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub(crate) enum Thing {
    Listing(Listing),
    #[serde(rename = "t1")]
    Comment(WireComment),
    #[serde(rename = "t3")]
    Link(WireLink),
    #[serde(rename = "more")]
    More(WireMore),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Listing {
    #[serde(default)]
    pub children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireComment {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    /// Either `""` or a nested listing.
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLink {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    pub created_utc: f64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMore {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Body of `/api/morechildren?api_type=json`.
#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}

/// Body of the OAuth token endpoint. Failures come back as `{"error": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub error: Option<String>,
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Vec<Thing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Replies {
        Empty(String),
        Thing(Thing),
    }

    Ok(match Option::<Replies>::deserialize(deserializer)? {
        Some(Replies::Thing(Thing::Listing(listing))) => listing.children,
        _ => Vec::new(),
    })
}

/// Reddit reports removed accounts as `"[deleted]"` (or no author at all).
fn present_author(author: Option<String>) -> Option<String> {
    author.filter(|name| !name.is_empty() && name != DELETED_AUTHOR)
}

impl Thing {
    /// Converts a comment-listing child. Non-comment kinds yield `None`.
    pub(crate) fn into_node(self) -> Option<CommentNode> {
        match self {
            Thing::Comment(comment) => Some(CommentNode::Comment(PlatformComment {
                id: comment.id,
                parent_id: comment.parent_id,
                author: present_author(comment.author),
                body: comment.body,
                score: comment.score,
                replies: into_forest(comment.replies),
            })),
            Thing::More(more) => Some(CommentNode::More(MoreComments {
                id: more.id,
                parent_id: more.parent_id,
                count: more.count,
                children: more.children,
            })),
            Thing::Listing(_) | Thing::Link(_) => None,
        }
    }
}

impl MoreChildrenResponse {
    /// Reddit reports failures here with a 200 status and a non-empty `errors`.
    pub(crate) fn into_things(self) -> Result<Vec<Thing>, PlatformError> {
        if !self.json.errors.is_empty() {
            return Err(PlatformError::Api {
                status: 200,
                message: serde_json::Value::Array(self.json.errors).to_string(),
            });
        }
        Ok(self.json.data.map(|data| data.things).unwrap_or_default())
    }
}

pub(crate) fn into_forest(things: Vec<Thing>) -> Vec<CommentNode> {
    things.into_iter().filter_map(Thing::into_node).collect()
}

impl From<WireLink> for Submission {
    fn from(link: WireLink) -> Self {
        Submission {
            id: link.id,
            title: link.title,
            author: present_author(link.author),
            created_utc: link.created_utc,
            url: link.url,
            is_self: link.is_self,
            selftext: link.selftext,
            score: link.score,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Author recorded when the platform reports no author (removed account).
pub const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String, // newlines flattened to spaces
    pub score: i64,
    pub replies: Vec<Comment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub author: String,
    pub date: String, // UTC, "YYYY-MM-DD HH:MM:SS"
    pub content_type: ContentType,
    pub content_url: String,
    pub post_text: String,
    pub score: i64,
    pub comments: Vec<Comment>,
}

pub fn author_or_deleted(author: Option<&str>) -> String {
    author.unwrap_or(DELETED_AUTHOR).to_string()
}

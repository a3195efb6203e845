use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by the discussion platform or its transport.
///
/// Every variant counts as a platform API error when a single post fails.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid community name: {0:?}")]
    InvalidCommunity(String),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        PlatformError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::Parse(err.to_string())
    }
}

/// A post as listed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    /// `None` when the account was removed.
    pub author: Option<String>,
    /// Seconds since the Unix epoch.
    pub created_utc: f64,
    pub url: String,
    pub is_self: bool,
    pub selftext: String,
    pub score: i64,
}

/// One node of a comment forest: a real comment or a "load more" placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentNode {
    Comment(PlatformComment),
    More(MoreComments),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformComment {
    pub id: String,
    /// Fullname of the parent (`t1_…` comment or `t3_…` post).
    pub parent_id: String,
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
    pub replies: Vec<CommentNode>,
}

/// Placeholder for comments that were not part of the loaded page.
#[derive(Debug, Clone, PartialEq)]
pub struct MoreComments {
    pub id: String,
    pub parent_id: String,
    pub count: u64,
    /// Ids of the hidden comments. Empty for "continue this thread" links.
    pub children: Vec<String>,
}

/// How many "load more" placeholders to resolve while loading a forest.
///
/// Placeholders left over once the limit is reached are removed unfetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoreLimit {
    #[default]
    Unlimited,
    Max(usize),
}

/// Read access to the discussion platform for one authenticated session.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lists the top `limit` posts of `community` in the platform's ranking order.
    async fn top_posts(
        &self,
        community: &str,
        limit: usize,
    ) -> Result<Vec<Submission>, PlatformError>;

    /// Loads the comment forest of `submission`, resolving placeholders per `more_limit`.
    async fn comment_forest(
        &self,
        submission: &Submission,
        more_limit: MoreLimit,
    ) -> Result<Vec<CommentNode>, PlatformError>;
}

/// Produces authenticated platform sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: Platform + 'static;

    async fn connect(&self) -> Result<Self::Session, PlatformError>;
}

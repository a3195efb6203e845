//! Harvest run orchestration.
//!
//! This module provides the [`HarvestPipeline`] coordinator that runs one
//! harvest end to end:
//! - Session acquisition via a [`SessionProvider`]
//! - Top-post listing for one community
//! - Concurrent post extraction on a bounded [`HarvesterExecutor`]
//! - Append to the existing snapshot and rewrite it via [`SnapshotStore`]
//!
//! A failure while extracting one post is logged and that post is dropped.
//! Session, listing and snapshot I/O failures end the run.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::AcquireError;
use tokio::task::JoinError;
use tracing::{debug, error, info};

use crate::config::default_concurrency;
use crate::executor::HarvesterExecutor;
use crate::harvest::post::extract_post_details;
use crate::model::Post;
use crate::store::{SnapshotStore, StoreError};
use crate::traits::{MoreLimit, Platform, PlatformError, SessionProvider};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Outcome of one harvest run.
#[derive(Debug)]
pub struct HarvestReport {
    /// Snapshot file that was written
    pub path: PathBuf,

    /// Posts already present in the snapshot before this run
    pub existing: usize,

    /// Posts extracted and appended by this run
    pub collected: usize,

    /// Posts whose extraction failed and were dropped
    pub failed: usize,

    pub stats: HarvestStats,
}

/// Timing of the harvest stages.
#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    /// Total time spent on the run (milliseconds)
    pub total_duration_ms: u64,

    /// Time spent listing top posts (milliseconds)
    pub listing_duration_ms: u64,

    /// Time spent draining the worker pool (milliseconds)
    pub extraction_duration_ms: u64,

    /// Number of posts returned by the listing
    pub posts_listed: usize,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that can occur during a harvest.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// Any error reported by the platform or its transport
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Snapshot error: {0}")]
    Store(#[from] StoreError),

    /// Post creation time cannot be represented as a date
    #[error("Invalid post timestamp: {0}")]
    Timestamp(f64),

    #[error("Worker pool closed: {0}")]
    PoolClosed(#[from] AcquireError),

    /// A spawned task panicked or was cancelled
    #[error("Task join error: {0}")]
    Task(#[from] JoinError),
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Runs harvests against the sessions produced by `S`.
///
/// # Example
///
/// ```ignore
/// use reddit_harvester::{HarvestConfig, HarvestPipeline, RedditAuth, SnapshotStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HarvestConfig::from_env()?;
///     let pipeline = HarvestPipeline::new(
///         RedditAuth::new(config.credentials.clone())?,
///         SnapshotStore::new(&config.output_dir),
///     )
///     .with_concurrency(config.concurrency);
///
///     let report = pipeline.harvest("python", 10).await?;
///     println!("Wrote {}", report.path.display());
///     Ok(())
/// }
/// ```
pub struct HarvestPipeline<S>
where
    S: SessionProvider,
{
    provider: S,
    store: SnapshotStore,

    /// Worker pool size (default: cores + 4, at most 32)
    concurrency: usize,

    /// Placeholder resolution requested for every comment forest
    more_limit: MoreLimit,
}

impl<S> HarvestPipeline<S>
where
    S: SessionProvider,
{
    /// Default configuration:
    /// - Concurrency: [`default_concurrency`]
    /// - Placeholder resolution: unlimited
    pub fn new(provider: S, store: SnapshotStore) -> Self {
        Self {
            provider,
            store,
            concurrency: default_concurrency(),
            more_limit: MoreLimit::Unlimited,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_more_limit(mut self, more_limit: MoreLimit) -> Self {
        self.more_limit = more_limit;
        self
    }

    /// Harvests the top `limit` posts of `community` into a snapshot named
    /// after the current local time.
    pub async fn harvest(
        &self,
        community: &str,
        limit: usize,
    ) -> Result<HarvestReport, HarvestError> {
        self.harvest_at(community, limit, Local::now()).await
    }

    /// Same as [`harvest`](Self::harvest) with an explicit run timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if the session cannot be acquired, the listing
    /// fails, or the snapshot cannot be read or written. Per-post failures are
    /// logged and counted in [`HarvestReport::failed`] instead.
    pub async fn harvest_at(
        &self,
        community: &str,
        limit: usize,
        at: DateTime<Local>,
    ) -> Result<HarvestReport, HarvestError> {
        let start = Instant::now();
        let mut stats = HarvestStats::default();

        info!(community, limit, "Connecting to platform");
        let session = Arc::new(self.provider.connect().await?);

        let listing_start = Instant::now();
        let submissions = session.top_posts(community, limit).await?;
        stats.listing_duration_ms = listing_start.elapsed().as_millis() as u64;
        stats.posts_listed = submissions.len();
        info!(
            posts = stats.posts_listed,
            duration_ms = stats.listing_duration_ms,
            "Top posts listed"
        );

        let path = self.store.snapshot_path(community, &at);
        let store = self.store.clone();
        let read_path = path.clone();
        let mut posts = tokio::task::spawn_blocking(move || store.read(&read_path)).await??;
        let existing = posts.len();
        if existing > 0 {
            info!(existing, path = %path.display(), "Appending to existing snapshot");
        }

        let extraction_start = Instant::now();
        let executor = HarvesterExecutor::new(self.concurrency);
        let more_limit = self.more_limit;
        let mut tasks = executor.spawn_all(submissions, |submission| {
            let session = Arc::clone(&session);
            async move { extract_post_details(session.as_ref(), &submission, more_limit).await }
        });

        let mut collected = 0;
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(post)) => {
                    debug!(title = %post.title, "Post collected");
                    posts.push(post);
                    collected += 1;
                }
                Ok(Err(HarvestError::Platform(e))) => {
                    error!("Reddit API error: {e}");
                    failed += 1;
                }
                Ok(Err(e)) => {
                    error!("An unexpected error occurred: {e}");
                    failed += 1;
                }
                Err(e) => {
                    error!("An unexpected error occurred: {e}");
                    failed += 1;
                }
            }
        }
        stats.extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;
        info!(
            collected,
            failed,
            duration_ms = stats.extraction_duration_ms,
            "Extraction completed"
        );

        write_snapshot(self.store.clone(), path.clone(), posts).await?;
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(path = %path.display(), total_ms = stats.total_duration_ms, "Snapshot written");

        Ok(HarvestReport {
            path,
            existing,
            collected,
            failed,
            stats,
        })
    }
}

async fn write_snapshot(
    store: SnapshotStore,
    path: PathBuf,
    posts: Vec<Post>,
) -> Result<(), HarvestError> {
    tokio::task::spawn_blocking(move || store.write(&path, &posts)).await??;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, ContentType};
    use crate::traits::{CommentNode, PlatformComment, Submission};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct StubPlatform {
        posts: Vec<Submission>,
        requested_limits: Arc<Mutex<Vec<MoreLimit>>>,
    }

    #[async_trait]
    impl Platform for StubPlatform {
        async fn top_posts(
            &self,
            _community: &str,
            limit: usize,
        ) -> Result<Vec<Submission>, PlatformError> {
            Ok(self.posts.iter().take(limit).cloned().collect())
        }

        async fn comment_forest(
            &self,
            submission: &Submission,
            more_limit: MoreLimit,
        ) -> Result<Vec<CommentNode>, PlatformError> {
            self.requested_limits.lock().unwrap().push(more_limit);
            if submission.id == "panics" {
                panic!("worker blew up");
            }
            Ok(vec![CommentNode::Comment(PlatformComment {
                id: format!("{}-c", submission.id),
                parent_id: format!("t3_{}", submission.id),
                author: None,
                body: "only comment".to_string(),
                score: 1,
                replies: vec![],
            })])
        }
    }

    struct StubProvider {
        platform: Option<StubPlatform>,
    }

    #[async_trait]
    impl SessionProvider for StubProvider {
        type Session = StubPlatform;

        async fn connect(&self) -> Result<StubPlatform, PlatformError> {
            self.platform
                .clone()
                .ok_or_else(|| PlatformError::Auth("invalid_grant".to_string()))
        }
    }

    fn submission(id: &str) -> Submission {
        Submission {
            id: id.to_string(),
            title: format!("Post {id}"),
            author: Some("op".to_string()),
            created_utc: 1_700_000_000.0,
            url: format!("https://example.com/{id}"),
            is_self: false,
            selftext: String::new(),
            score: 10,
        }
    }

    fn stub(posts: Vec<Submission>) -> StubPlatform {
        StubPlatform {
            posts,
            requested_limits: Arc::new(Mutex::new(vec![])),
        }
    }

    fn pipeline(dir: &std::path::Path, posts: Vec<Submission>) -> HarvestPipeline<StubProvider> {
        HarvestPipeline::new(
            StubProvider {
                platform: Some(stub(posts)),
            },
            SnapshotStore::new(dir),
        )
        .with_concurrency(2)
    }

    fn run_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    #[tokio::test]
    async fn test_harvest_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let posts = vec![submission("a"), submission("b"), submission("c")];
        let pipeline = pipeline(dir.path(), posts);

        let report = pipeline.harvest_at("demo", 2, run_time()).await.unwrap();

        assert_eq!(
            report.path,
            dir.path().join("demo_top_posts_2024-05-06_07-08-09.json")
        );
        assert_eq!(report.existing, 0);
        assert_eq!(report.collected, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.stats.posts_listed, 2);

        let saved = SnapshotStore::new(dir.path()).read(&report.path).unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|p| p.content_type == ContentType::Link));
        assert!(saved.iter().all(|p| p.comments[0].author == "[deleted]"));
    }

    #[tokio::test]
    async fn test_existing_snapshot_is_appended_to() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let path = store.snapshot_path("demo", &run_time());
        let earlier = Post {
            title: "Earlier".to_string(),
            author: "someone".to_string(),
            date: "2024-05-06 07:08:09".to_string(),
            content_type: ContentType::Text,
            content_url: "https://example.com/earlier".to_string(),
            post_text: "kept".to_string(),
            score: 1,
            comments: vec![Comment {
                author: "x".to_string(),
                body: "y".to_string(),
                score: 0,
                replies: vec![],
            }],
        };
        store.write(&path, &[earlier.clone()]).unwrap();

        let report = pipeline(dir.path(), vec![submission("a")])
            .harvest_at("demo", 10, run_time())
            .await
            .unwrap();

        assert_eq!(report.existing, 1);
        assert_eq!(report.collected, 1);
        let saved = store.read(&path).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0], earlier);
        assert_eq!(saved[1].title, "Post a");
    }

    #[tokio::test]
    async fn test_panicking_task_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), vec![submission("a"), submission("panics")]);

        let report = pipeline.harvest_at("demo", 10, run_time()).await.unwrap();

        assert_eq!(report.collected, 1);
        assert_eq!(report.failed, 1);
        let saved = SnapshotStore::new(dir.path()).read(&report.path).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title, "Post a");
    }

    #[tokio::test]
    async fn test_session_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline =
            HarvestPipeline::new(StubProvider { platform: None }, SnapshotStore::new(dir.path()));

        let result = pipeline.harvest_at("demo", 10, run_time()).await;

        assert!(matches!(
            result,
            Err(HarvestError::Platform(PlatformError::Auth(_)))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = SnapshotStore::new(dir.path()).snapshot_path("demo", &run_time());
        std::fs::write(&path, b"not json").unwrap();

        let result = pipeline(dir.path(), vec![submission("a")])
            .harvest_at("demo", 10, run_time())
            .await;

        assert!(matches!(result, Err(HarvestError::Store(StoreError::Json { .. }))));
        assert_eq!(std::fs::read(&path).unwrap(), b"not json");
    }

    #[tokio::test]
    async fn test_more_limit_forwarded_to_platform() {
        let dir = tempfile::tempdir().unwrap();
        let platform = stub(vec![submission("a"), submission("b")]);
        let requested = Arc::clone(&platform.requested_limits);

        HarvestPipeline::new(
            StubProvider {
                platform: Some(platform),
            },
            SnapshotStore::new(dir.path()),
        )
        .with_more_limit(MoreLimit::Max(0))
        .harvest_at("demo", 10, run_time())
        .await
        .unwrap();

        assert_eq!(*requested.lock().unwrap(), vec![MoreLimit::Max(0); 2]);
    }

    #[tokio::test]
    async fn test_empty_listing_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();

        let report = pipeline(dir.path(), vec![])
            .harvest_at("demo", 10, run_time())
            .await
            .unwrap();

        assert_eq!(report.collected, 0);
        assert_eq!(std::fs::read_to_string(&report.path).unwrap(), "[]");
    }
}

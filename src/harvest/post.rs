//! Post detail extraction.

use chrono::DateTime;
use tracing::{debug, instrument};

use crate::harvest::comments::extract_comments;
use crate::harvest::pipeline::HarvestError;
use crate::model::{author_or_deleted, ContentType, Post};
use crate::traits::{MoreLimit, Platform, Submission};

/// Builds the [`Post`] record for one submission, including its comment tree.
///
/// The forest is requested with `more_limit`; pass [`MoreLimit::Unlimited`]
/// to have every "load more" placeholder fetched before extraction.
///
/// # Errors
///
/// Propagates platform errors from loading the forest, and
/// [`HarvestError::Timestamp`] for a creation time that is not a valid date.
#[instrument(skip(platform, submission), fields(post_id = %submission.id))]
pub async fn extract_post_details<P>(
    platform: &P,
    submission: &Submission,
    more_limit: MoreLimit,
) -> Result<Post, HarvestError>
where
    P: Platform + ?Sized,
{
    let date = format_utc(submission.created_utc)?;
    let content_type = if submission.is_self {
        ContentType::Text
    } else {
        ContentType::Link
    };
    let post_text = if submission.is_self {
        submission.selftext.clone()
    } else {
        String::new()
    };

    let forest = platform.comment_forest(submission, more_limit).await?;
    let comments = extract_comments(&forest);
    debug!(top_level = comments.len(), "Comments extracted");

    Ok(Post {
        title: submission.title.clone(),
        author: author_or_deleted(submission.author.as_deref()),
        date,
        content_type,
        content_url: submission.url.clone(),
        post_text,
        score: submission.score,
        comments,
    })
}

/// Formats epoch seconds as `YYYY-MM-DD HH:MM:SS` in UTC, dropping fractions.
pub fn format_utc(epoch_secs: f64) -> Result<String, HarvestError> {
    if !epoch_secs.is_finite() {
        return Err(HarvestError::Timestamp(epoch_secs));
    }

    DateTime::from_timestamp(epoch_secs.floor() as i64, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .ok_or(HarvestError::Timestamp(epoch_secs))
}

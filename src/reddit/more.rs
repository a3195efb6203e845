//! In-place resolution of "load more" placeholders.
//!
//! Placeholders are addressed by their index path from the forest root.
//! Fetched comments are rebuilt into a forest and spliced where the
//! placeholder stood, so sibling order is kept.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::traits::{CommentNode, MoreComments, MoreLimit, PlatformError, Submission};

/// Largest id batch accepted by `/api/morechildren`.
pub(crate) const MORE_CHILDREN_BATCH: usize = 100;

/// Where hidden comments are fetched from.
#[async_trait]
pub(crate) trait MoreSource: Send + Sync {
    /// Flat, depth-first `morechildren` result for one batch of ids.
    async fn more_children(
        &self,
        link_id: &str,
        children: &[String],
    ) -> Result<Vec<CommentNode>, PlatformError>;

    /// The comment page of `post_id` focused on `comment_id`.
    async fn focused_page(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Vec<CommentNode>, PlatformError>;
}

/// Fetches what the placeholder stands for, as a forest ready to splice in its place.
pub(crate) async fn expand<S: MoreSource + ?Sized>(
    source: &S,
    submission: &Submission,
    placeholder: &MoreComments,
) -> Result<Vec<CommentNode>, PlatformError> {
    if placeholder.children.is_empty() {
        return continue_thread(source, submission, placeholder).await;
    }

    let link_id = format!("t3_{}", submission.id);
    let mut flat = Vec::new();
    for batch in placeholder.children.chunks(MORE_CHILDREN_BATCH) {
        flat.extend(source.more_children(&link_id, batch).await?);
    }

    Ok(build_forest(flat, &placeholder.parent_id))
}

/// "Continue this thread": reload the parent comment and take its replies.
pub(crate) async fn continue_thread<S: MoreSource + ?Sized>(
    source: &S,
    submission: &Submission,
    placeholder: &MoreComments,
) -> Result<Vec<CommentNode>, PlatformError> {
    let Some(parent_id) = placeholder.parent_id.strip_prefix("t1_") else {
        return Ok(Vec::new());
    };

    let focused = source.focused_page(&submission.id, parent_id).await?;
    let replies = focused.into_iter().find_map(|node| match node {
        CommentNode::Comment(comment) if comment.id == parent_id => Some(comment.replies),
        _ => None,
    });
    Ok(replies.unwrap_or_default())
}

/// Expands placeholders in depth-first order until none remain or `more_limit`
/// is spent. Whatever is left after that is stripped.
pub(crate) async fn resolve_placeholders<S: MoreSource + ?Sized>(
    source: &S,
    submission: &Submission,
    forest: &mut Vec<CommentNode>,
    more_limit: MoreLimit,
) -> Result<(), PlatformError> {
    let mut remaining = match more_limit {
        MoreLimit::Unlimited => None,
        MoreLimit::Max(n) => Some(n),
    };
    let mut seen = HashSet::new();

    while let Some(path) = first_placeholder(forest) {
        if remaining == Some(0) {
            strip_placeholders(forest);
            break;
        }

        let placeholder = match node_at(forest, &path) {
            Some(CommentNode::More(found)) => found.clone(),
            _ => break,
        };

        // The API can hand back the placeholder it was asked to expand.
        let key = (placeholder.parent_id.clone(), placeholder.id.clone());
        let replacement = if seen.insert(key) {
            expand(source, submission, &placeholder).await?
        } else {
            Vec::new()
        };
        debug!(
            more_id = %placeholder.id,
            parent = %placeholder.parent_id,
            fetched = replacement.len(),
            "Placeholder resolved"
        );
        splice(forest, &path, replacement);

        if let Some(n) = remaining.as_mut() {
            *n -= 1;
        }
    }
    Ok(())
}

/// Index path of the first placeholder in depth-first order.
pub(crate) fn first_placeholder(forest: &[CommentNode]) -> Option<Vec<usize>> {
    for (index, node) in forest.iter().enumerate() {
        match node {
            CommentNode::More(_) => return Some(vec![index]),
            CommentNode::Comment(comment) => {
                if let Some(mut path) = first_placeholder(&comment.replies) {
                    path.insert(0, index);
                    return Some(path);
                }
            }
        }
    }
    None
}

pub(crate) fn node_at<'a>(forest: &'a [CommentNode], path: &[usize]) -> Option<&'a CommentNode> {
    let (last, parents) = path.split_last()?;
    let mut level = forest;
    for &index in parents {
        match level.get(index)? {
            CommentNode::Comment(comment) => level = &comment.replies,
            CommentNode::More(_) => return None,
        }
    }
    level.get(*last)
}

/// Replaces the node at `path` with `replacement`. Returns `false` if the path is stale.
pub(crate) fn splice(
    forest: &mut Vec<CommentNode>,
    path: &[usize],
    replacement: Vec<CommentNode>,
) -> bool {
    let Some((&last, parents)) = path.split_last() else {
        return false;
    };

    let mut level = forest;
    for &index in parents {
        match level.get_mut(index) {
            Some(CommentNode::Comment(comment)) => level = &mut comment.replies,
            _ => return false,
        }
    }

    if last >= level.len() {
        return false;
    }
    level.splice(last..=last, replacement);
    true
}

/// Removes every placeholder, at any depth, without fetching it.
pub(crate) fn strip_placeholders(forest: &mut Vec<CommentNode>) {
    forest.retain(|node| matches!(node, CommentNode::Comment(_)));
    for node in forest.iter_mut() {
        if let CommentNode::Comment(comment) = node {
            strip_placeholders(&mut comment.replies);
        }
    }
}

fn parent_of(node: &CommentNode) -> &str {
    match node {
        CommentNode::Comment(comment) => &comment.parent_id,
        CommentNode::More(more) => &more.parent_id,
    }
}

/// Rebuilds the flat, depth-first list returned by `morechildren` into a
/// forest rooted at `root_parent` (a `t1_`/`t3_` fullname).
///
/// Nodes whose parent is neither `root_parent` nor in the list are dropped.
pub(crate) fn build_forest(flat: Vec<CommentNode>, root_parent: &str) -> Vec<CommentNode> {
    // Walking backwards, every child is complete before its parent is reached.
    let mut pending: HashMap<String, Vec<CommentNode>> = HashMap::new();
    for mut node in flat.into_iter().rev() {
        if let CommentNode::Comment(comment) = &mut node {
            if let Some(mut children) = pending.remove(&format!("t1_{}", comment.id)) {
                children.reverse();
                comment.replies.extend(children);
            }
        }
        pending
            .entry(parent_of(&node).to_string())
            .or_default()
            .push(node);
    }

    let mut roots = pending.remove(root_parent).unwrap_or_default();
    roots.reverse();

    let orphans: usize = pending.values().map(Vec::len).sum();
    if orphans > 0 {
        debug!(orphans, root_parent, "Dropping comments with unknown parents");
    }
    roots
}

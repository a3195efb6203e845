//! Comment tree extraction.

use crate::model::{author_or_deleted, Comment};
use crate::traits::CommentNode;

/// Converts a comment forest into nested [`Comment`] records.
///
/// Forest order is preserved at every level. "Load more" placeholders are
/// skipped, so nothing hidden behind one appears in the output. Recursion
/// depth follows the thread depth.
pub fn extract_comments(forest: &[CommentNode]) -> Vec<Comment> {
    forest
        .iter()
        .filter_map(|node| match node {
            CommentNode::Comment(comment) => Some(Comment {
                author: author_or_deleted(comment.author.as_deref()),
                body: flatten_newlines(&comment.body),
                score: comment.score,
                replies: extract_comments(&comment.replies),
            }),
            CommentNode::More(_) => None,
        })
        .collect()
}

fn flatten_newlines(body: &str) -> String {
    body.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MoreComments, PlatformComment};

    fn comment(
        id: &str,
        author: Option<&str>,
        body: &str,
        replies: Vec<CommentNode>,
    ) -> CommentNode {
        CommentNode::Comment(PlatformComment {
            id: id.to_string(),
            parent_id: "t3_post".to_string(),
            author: author.map(str::to_string),
            body: body.to_string(),
            score: 1,
            replies,
        })
    }

    fn more(id: &str, children: &[&str]) -> CommentNode {
        CommentNode::More(MoreComments {
            id: id.to_string(),
            parent_id: "t3_post".to_string(),
            count: children.len() as u64,
            children: children.iter().map(|c| c.to_string()).collect(),
        })
    }

    fn count(comments: &[Comment]) -> usize {
        comments.iter().map(|c| 1 + count(&c.replies)).sum()
    }

    #[test]
    fn test_placeholders_are_skipped_at_every_level() {
        let forest = vec![
            more("m0", &["x", "y"]),
            comment(
                "a",
                Some("alice"),
                "top",
                vec![more("m1", &["z"]), comment("b", Some("bob"), "reply", vec![])],
            ),
            more("m2", &[]),
        ];

        let comments = extract_comments(&forest);

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "alice");
        assert_eq!(comments[0].replies.len(), 1);
        assert_eq!(comments[0].replies[0].author, "bob");
        assert_eq!(count(&comments), 2);
    }

    #[test]
    fn test_missing_author_becomes_deleted() {
        let forest = vec![comment(
            "a",
            None,
            "gone",
            vec![comment("b", None, "also gone", vec![])],
        )];

        let comments = extract_comments(&forest);

        assert_eq!(comments[0].author, "[deleted]");
        assert_eq!(comments[0].replies[0].author, "[deleted]");
    }

    #[test]
    fn test_newlines_flattened_to_spaces() {
        let forest = vec![comment("a", Some("alice"), "one\ntwo\n\nthree\n", vec![])];

        let comments = extract_comments(&forest);

        assert_eq!(comments[0].body, "one two  three ");
        assert!(!comments[0].body.contains('\n'));
    }

    #[test]
    fn test_order_and_nesting_preserved() {
        let forest = vec![
            comment(
                "a",
                Some("first"),
                "1",
                vec![comment(
                    "a1",
                    Some("first-child"),
                    "1.1",
                    vec![comment("a11", Some("grandchild"), "1.1.1", vec![])],
                )],
            ),
            comment("b", Some("second"), "2", vec![]),
            comment("c", Some("third"), "3", vec![]),
        ];

        let comments = extract_comments(&forest);

        let authors: Vec<&str> = comments.iter().map(|c| c.author.as_str()).collect();
        assert_eq!(authors, vec!["first", "second", "third"]);
        assert_eq!(comments[0].replies[0].replies[0].body, "1.1.1");
        assert!(comments[1].replies.is_empty());
    }

    #[test]
    fn test_deep_thread() {
        let mut node = comment("leaf", Some("leaf"), "bottom", vec![]);
        for depth in 0..200 {
            node = comment(&format!("c{depth}"), Some("user"), "level", vec![node]);
        }

        let comments = extract_comments(&[node]);

        assert_eq!(count(&comments), 201);
    }

    #[test]
    fn test_empty_forest() {
        assert!(extract_comments(&[]).is_empty());
    }
}

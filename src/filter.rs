use crate::comment::Comment;
use crate::watermark::Watermark;
use tracing::debug;

/// Time-boundary cut over comments ordered newest first.
///
/// With a watermark, every comment published strictly after it survives and
/// there is no count cap. Without one, the first `first_run_cap` comments are
/// kept as-is. An empty result means "nothing new" and is not an error.
pub fn candidates(comments: Vec<Comment>, watermark: Watermark, first_run_cap: usize) -> Vec<Comment> {
    if watermark.is_unset() {
        let mut kept = comments;
        kept.truncate(first_run_cap);
        return kept;
    }

    comments
        .into_iter()
        .filter(|c| {
            let fresh = c.published_ts() > watermark.timestamp;
            if !fresh {
                debug!(
                    "Skipping comment by {} published {} (not after watermark)",
                    c.author, c.published_at
                );
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::sample;

    fn newest_first(n: usize) -> Vec<Comment> {
        (0..n)
            .map(|i| sample(&format!("u{i}"), i as u64, 10_000 - i as i64))
            .collect()
    }

    #[test]
    fn watermark_keeps_strictly_newer_in_order_without_cap() {
        let comments = newest_first(45);
        // Timestamps run 10_000 down to 9_956; 9_960 itself must be dropped.
        let kept = candidates(comments.clone(), Watermark::new(9_960), 30);
        assert_eq!(kept.len(), 40);
        assert!(kept.iter().all(|c| c.published_ts() > 9_960));
        assert_eq!(kept[..], comments[..40]);
    }

    #[test]
    fn watermark_filter_does_not_assume_ordering() {
        let comments = vec![sample("a", 1, 50), sample("b", 1, 200), sample("c", 1, 100), sample("d", 1, 300)];
        let kept = candidates(comments, Watermark::new(100), 30);
        let authors: Vec<_> = kept.iter().map(|c| c.author.as_str()).collect();
        assert_eq!(authors, ["b", "d"]);
    }

    #[test]
    fn zero_watermark_caps_to_first_n() {
        let comments = newest_first(50);
        let kept = candidates(comments.clone(), Watermark::default(), 30);
        assert_eq!(kept[..], comments[..30]);

        let few = newest_first(3);
        assert_eq!(candidates(few.clone(), Watermark::default(), 30), few);
    }

    #[test]
    fn nothing_new_is_empty_not_error() {
        let kept = candidates(newest_first(5), Watermark::new(20_000), 30);
        assert!(kept.is_empty());
        assert!(candidates(Vec::new(), Watermark::default(), 30).is_empty());
    }
}

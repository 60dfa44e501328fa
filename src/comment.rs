use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// A viewer comment as fetched from the video host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Host-side comment id. Older documents do not carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub author: String,
    pub text: String,
    pub likes: u64,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

impl Comment {
    pub fn published_ts(&self) -> i64 {
        self.published_at.timestamp()
    }

    /// Same comment, regardless of how its like count moved since.
    pub fn same_as(&self, other: &Comment) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => {
                self.author == other.author
                    && self.text == other.text
                    && self.published_at == other.published_at
            }
        }
    }

    /// Comment body without the leading marker, whitespace collapsed to single spaces.
    pub fn prompt_text(&self, marker: char) -> String {
        let body = self.text.trim_start();
        let body = body.strip_prefix(marker).unwrap_or(body);
        WHITESPACE.replace_all(body.trim(), " ").into_owned()
    }
}

/// Only comments whose trimmed text starts with the marker take part in a run.
pub fn has_marker(text: &str, marker: char) -> bool {
    text.trim_start().starts_with(marker)
}

/// The comment picked for a run, plus what the generate step adds to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedComment {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(
        rename = "_archive_image",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub archive_image: Option<String>,
    #[serde(
        rename = "_generated_image",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generated_image: Option<String>,
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl SelectedComment {
    pub fn pending(comment: Comment) -> Self {
        Self {
            comment,
            archive_image: None,
            generated_image: None,
            index: None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.index.is_some()
    }
}

#[cfg(test)]
pub(crate) fn sample(author: &str, likes: u64, ts: i64) -> Comment {
    Comment {
        id: None,
        author: author.to_string(),
        text: format!("#{author}"),
        likes,
        published_at: DateTime::from_timestamp(ts, 0).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn marker_ignores_leading_whitespace() {
        assert!(has_marker("  #a cat on a bike", '#'));
        assert!(has_marker("#", '#'));
        assert!(!has_marker("a cat #bike", '#'));
        assert!(!has_marker("", '#'));
    }

    #[test]
    fn prompt_text_strips_marker_and_collapses_whitespace() {
        let c = Comment {
            id: None,
            author: "Cyril".into(),
            text: " # an amulet\n in a car   at sunset ".into(),
            likes: 0,
            published_at: at(0),
        };
        assert_eq!(c.prompt_text('#'), "an amulet in a car at sunset");
    }

    #[test]
    fn comment_uses_host_field_names() {
        let raw = r##"{"author":"Ana","text":"#owl","likes":4,"publishedAt":"2025-09-06T09:50:43Z"}"##;
        let c: Comment = serde_json::from_str(raw).unwrap();
        assert_eq!(c.likes, 4);
        assert_eq!(c.published_ts(), 1_757_152_243);

        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["publishedAt"], "2025-09-06T09:50:43Z");
    }

    #[test]
    fn identity_ignores_like_count() {
        let before = sample("ana", 9, 100);
        let after = Comment { likes: 10, ..before.clone() };
        assert!(after.same_as(&before));

        let mut edited = before.clone();
        edited.text = "#something else".into();
        assert!(!edited.same_as(&before));

        let with_id = |id: &str, text: &str| Comment {
            id: Some(id.into()),
            text: text.into(),
            ..before.clone()
        };
        assert!(with_id("a", "#one").same_as(&with_id("a", "#two")));
        assert!(!with_id("a", "#one").same_as(&with_id("b", "#one")));
    }

    #[test]
    fn negative_likes_are_rejected() {
        let raw = r##"{"author":"Ana","text":"#owl","likes":-1,"publishedAt":"2025-09-06T09:50:43Z"}"##;
        assert!(serde_json::from_str::<Comment>(raw).is_err());
    }

    #[test]
    fn selection_enrichment_is_underscored_and_optional() {
        let comment = Comment {
            id: Some("Ugx9".into()),
            author: "Ana".into(),
            text: "#owl".into(),
            likes: 2,
            published_at: at(10),
        };
        let pending = SelectedComment::pending(comment.clone());
        let v = serde_json::to_value(&pending).unwrap();
        assert!(v.get("_index").is_none());
        assert!(!pending.is_rendered());

        let rendered = SelectedComment {
            index: Some(7),
            archive_image: Some("archives/0007_final.png".into()),
            ..pending
        };
        let v = serde_json::to_value(&rendered).unwrap();
        assert_eq!(v["_index"], 7);
        assert_eq!(v["_archive_image"], "archives/0007_final.png");
        assert_eq!(v["author"], "Ana");

        let parsed: SelectedComment = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.comment, comment);
        assert!(parsed.is_rendered());
    }
}

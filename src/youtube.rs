use crate::comment::Comment;
use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, info};

const COMMENT_THREADS_URL: &str = "https://www.googleapis.com/youtube/v3/commentThreads";
const THUMBNAIL_SET_URL: &str = "https://www.googleapis.com/upload/youtube/v3/thumbnails/set";

#[derive(Debug, Deserialize)]
pub struct CommentThreadList {
    #[serde(default)]
    pub items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
pub struct CommentThread {
    pub snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnippet {
    pub top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
pub struct TopLevelComment {
    #[serde(default)]
    pub id: Option<String>,
    pub snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    pub author_display_name: Option<String>,
    #[serde(default)]
    pub text_original: String,
    #[serde(default)]
    pub like_count: u64,
    pub published_at: DateTime<Utc>,
}

impl From<TopLevelComment> for Comment {
    fn from(c: TopLevelComment) -> Self {
        let s = c.snippet;
        Comment {
            id: c.id,
            author: s.author_display_name.unwrap_or_else(|| "Anonymous".to_string()),
            text: s.text_original.trim().to_string(),
            likes: s.like_count,
            published_at: s.published_at,
        }
    }
}

impl CommentThreadList {
    /// Top-level comments in API order (newest first for `order=time`).
    pub fn into_comments(self) -> Vec<Comment> {
        self.items
            .into_iter()
            .map(|t| Comment::from(t.snippet.top_level_comment))
            .collect()
    }
}

/// Where comments come from.
pub trait CommentSource {
    async fn recent_comments(&self, video_id: &str, limit: usize) -> anyhow::Result<Vec<Comment>>;
}

/// Where the finished thumbnail goes.
pub trait ThumbnailTarget {
    async fn publish(&self, video_id: &str, png: Vec<u8>) -> anyhow::Result<()>;
}

pub struct YouTube {
    http: reqwest::Client,
    api_key: String,
}

impl YouTube {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

impl CommentSource for YouTube {
    async fn recent_comments(&self, video_id: &str, limit: usize) -> anyhow::Result<Vec<Comment>> {
        let max_results = limit.to_string();
        let res = self
            .http
            .get(COMMENT_THREADS_URL)
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("maxResults", max_results.as_str()),
                ("order", "time"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("comment threads request failed")?
            .error_for_status()?
            .text()
            .await?;

        let parsed: CommentThreadList =
            serde_json::from_str(&res).context("unexpected comment threads response")?;
        let comments = parsed.into_comments();
        for c in &comments {
            debug!("Raw comment by {} (likes={}): {:?}", c.author, c.likes, c.text);
        }
        info!("Fetched {} comments for video {}", comments.len(), video_id);
        Ok(comments)
    }
}

pub struct ThumbnailUploader {
    http: reqwest::Client,
    access_token: String,
}

impl ThumbnailUploader {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
        }
    }
}

impl ThumbnailTarget for ThumbnailUploader {
    async fn publish(&self, video_id: &str, png: Vec<u8>) -> anyhow::Result<()> {
        let size = png.len();
        let res = self
            .http
            .post(THUMBNAIL_SET_URL)
            .query(&[("videoId", video_id), ("uploadType", "media")])
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .await
            .context("thumbnail upload request failed")?
            .error_for_status()?
            .text()
            .await?;
        info!("Thumbnail ({} bytes) set on video {}", size, video_id);
        debug!("Upload response: {}", res);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r##"{
      "kind": "youtube#commentThreadListResponse",
      "items": [
        {
          "id": "Ugx1",
          "snippet": {
            "videoId": "abc",
            "topLevelComment": {
              "id": "Ugx1",
              "snippet": {
                "authorDisplayName": "@cyril",
                "textOriginal": "  #a fox reading a map  ",
                "likeCount": 12,
                "publishedAt": "2025-09-06T09:50:43Z"
              }
            },
            "totalReplyCount": 0
          }
        },
        {
          "id": "Ugx2",
          "snippet": {
            "topLevelComment": {
              "snippet": {
                "textOriginal": "first!",
                "likeCount": 0,
                "publishedAt": "2025-09-05T08:00:00Z"
              }
            }
          }
        }
      ]
    }"##;

    #[test]
    fn maps_thread_list_to_comments_in_api_order() {
        let list: CommentThreadList = serde_json::from_str(RESPONSE).unwrap();
        let comments = list.into_comments();
        assert_eq!(comments.len(), 2);

        assert_eq!(comments[0].id.as_deref(), Some("Ugx1"));
        assert_eq!(comments[0].author, "@cyril");
        assert_eq!(comments[0].text, "#a fox reading a map");
        assert_eq!(comments[0].likes, 12);
        assert_eq!(comments[0].published_ts(), 1_757_152_243);

        assert_eq!(comments[1].author, "Anonymous");
        assert_eq!(comments[1].id, None);
        assert!(comments[0].published_at > comments[1].published_at);
    }

    #[test]
    fn empty_response_has_no_comments() {
        let list: CommentThreadList = serde_json::from_str(r#"{"kind":"x"}"#).unwrap();
        assert!(list.into_comments().is_empty());
    }
}

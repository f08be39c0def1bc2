//! `PostStore` trait: the read interface the dispatcher resolves posts through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// A stored post eligible for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub content: String,
    /// Discord webhook id, resolved against the publisher endpoint.
    pub webhook_id: Option<String>,
    /// Discord webhook token paired with `webhook_id`.
    pub webhook_token: Option<String>,
    /// Full webhook URL; takes precedence over `webhook_id`/`webhook_token`.
    pub webhook_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Resolve the Discord webhook URL this post is published to.
    ///
    /// Returns `None` when the post carries no usable routing metadata.
    pub fn discord_webhook_url(&self, publisher_endpoint: &str) -> Option<String> {
        if let Some(url) = non_empty(self.webhook_url.as_deref()) {
            return Some(url.to_string());
        }
        let id = non_empty(self.webhook_id.as_deref())?;
        let token = non_empty(self.webhook_token.as_deref())?;
        Some(format!("{publisher_endpoint}/webhooks/{id}/{token}"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Fields of a post to be inserted.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: String,
    pub webhook_id: Option<String>,
    pub webhook_token: Option<String>,
    pub webhook_url: Option<String>,
}

impl NewPost {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_webhook(mut self, id: impl Into<String>, token: impl Into<String>) -> Self {
        self.webhook_id = Some(id.into());
        self.webhook_token = Some(token.into());
        self
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }
}

/// Backend-agnostic post storage.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Look up every post in `ids`.
    ///
    /// Fails with [`DatabaseError::NotFound`] if any id cannot be resolved;
    /// never returns a partial list.
    async fn list(&self, ids: &[i64]) -> Result<Vec<Post>, DatabaseError>;

    /// Insert a new post and return it with its assigned id.
    async fn insert(&self, post: NewPost) -> Result<Post, DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Post {
        Post {
            id: 1,
            content: "hello".into(),
            webhook_id: None,
            webhook_token: None,
            webhook_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn webhook_url_from_id_and_token() {
        let p = Post {
            webhook_id: Some("w1".into()),
            webhook_token: Some("tok".into()),
            ..post()
        };
        assert_eq!(
            p.discord_webhook_url("https://discord.com/api").as_deref(),
            Some("https://discord.com/api/webhooks/w1/tok")
        );
    }

    #[test]
    fn explicit_webhook_url_wins() {
        let p = Post {
            webhook_id: Some("w1".into()),
            webhook_token: Some("tok".into()),
            webhook_url: Some("https://hooks.example/abc".into()),
            ..post()
        };
        assert_eq!(
            p.discord_webhook_url("https://discord.com/api").as_deref(),
            Some("https://hooks.example/abc")
        );
    }

    #[test]
    fn missing_token_has_no_url() {
        let p = Post {
            webhook_id: Some("w1".into()),
            webhook_token: Some("  ".into()),
            ..post()
        };
        assert!(p.discord_webhook_url("https://discord.com/api").is_none());
        assert!(post().discord_webhook_url("https://discord.com/api").is_none());
    }
}

//! Account endpoints: profile and generation history.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{
    error::{Error, Result},
    http::HttpClient,
    resolver::ImageUrlResolver,
};

/// Largest page the history endpoint is asked for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default history page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub credits_balance: i64,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One past generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationHistoryItem {
    pub id: String,
    pub input_image_url: String,
    #[serde(default)]
    pub output_image_url: Option<String>,
    pub prompt: String,
    pub resolution: String,
    pub aspect_ratio: String,
    pub is_free: bool,
    pub status: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A page of generation history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationHistory {
    pub items: Vec<GenerationHistoryItem>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl GenerationHistory {
    /// Returns true if more pages follow this one.
    pub fn has_more(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < self.total
    }
}

/// Account service. Requires a bearer credential.
pub struct UserService {
    http: Arc<HttpClient>,
    resolver: Arc<ImageUrlResolver>,
}

impl UserService {
    pub(crate) fn new(http: Arc<HttpClient>, resolver: Arc<ImageUrlResolver>) -> Self {
        Self { http, resolver }
    }

    /// Fetches the signed-in user's profile.
    pub async fn me(&self) -> Result<UserInfo> {
        self.require_auth()?;
        self.http.get("/api/user/me", &[]).await
    }

    /// Fetches one page of generation history.
    ///
    /// Image references in the returned items are resolved for display.
    pub async fn generations(&self, page: u32, page_size: u32) -> Result<GenerationHistory> {
        self.require_auth()?;
        if page == 0 {
            return Err(Error::Validation("page starts at 1".to_string()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::Validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let query = [("page", page.to_string()), ("page_size", page_size.to_string())];
        let mut history: GenerationHistory = self.http.get("/api/user/generations", &query).await?;
        for item in &mut history.items {
            self.resolve_item(item);
        }
        Ok(history)
    }

    fn resolve_item(&self, item: &mut GenerationHistoryItem) {
        if let Some(url) = self.resolver.resolve_str(&item.input_image_url) {
            item.input_image_url = url;
        }
        item.output_image_url = self.resolver.resolve(item.output_image_url.as_deref());
    }

    fn require_auth(&self) -> Result<()> {
        if self.http.is_authenticated() {
            Ok(())
        } else {
            Err(Error::Config("this command needs an auth token".to_string()))
        }
    }
}

/// Parses RFC 3339 timestamps, treating ones without an offset as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
}

fn optional_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ImageMode;
    use chrono::{Datelike, Timelike};
    use std::time::Duration;

    #[test]
    fn test_naive_and_offset_timestamps() {
        let a = parse_timestamp("2025-03-01T10:20:30.123456").unwrap();
        let b = parse_timestamp("2025-03-01T10:20:30.123456Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.month(), 3);
        assert_eq!(a.hour(), 10);

        let c = parse_timestamp("2025-03-01T12:20:30+02:00").unwrap();
        assert_eq!(c.hour(), 10);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_history_deserializes() {
        let json = r#"{
            "items": [{
                "id": "g1",
                "input_image_url": "/storage/in.jpg",
                "output_image_url": null,
                "prompt": "white background",
                "resolution": "8k",
                "aspect_ratio": "1:1",
                "is_free": false,
                "status": "processing",
                "created_at": "2025-03-01T10:20:30",
                "completed_at": null
            }],
            "total": 41,
            "page": 2,
            "page_size": 20
        }"#;
        let history: GenerationHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.items.len(), 1);
        assert_eq!(history.items[0].completed_at, None);
        assert!(history.has_more());

        let last = GenerationHistory { page: 3, ..history };
        assert!(!last.has_more());
    }

    #[test]
    fn test_resolves_item_urls() {
        let http = Arc::new(
            HttpClient::new("http://api".into(), Some("t".into()), None, Duration::from_secs(5)).unwrap(),
        );
        let resolver = Arc::new(ImageUrlResolver::new("http://api", ImageMode::default()));
        let service = UserService::new(http, resolver);

        let mut item: GenerationHistoryItem = serde_json::from_value(serde_json::json!({
            "id": "g1",
            "input_image_url": "/storage/in.jpg",
            "output_image_url": "/storage/out.jpg",
            "prompt": "p",
            "resolution": "8k",
            "aspect_ratio": "4:5",
            "is_free": true,
            "status": "completed",
            "created_at": "2025-03-01T10:20:30Z",
            "completed_at": "2025-03-01T10:21:00Z"
        }))
        .unwrap();
        service.resolve_item(&mut item);
        assert_eq!(item.input_image_url, "/images/generated/in.jpg");
        assert_eq!(item.output_image_url.as_deref(), Some("/images/generated/out.jpg"));
    }

    #[tokio::test]
    async fn test_requires_auth_and_valid_paging() {
        let http = Arc::new(HttpClient::new("http://api".into(), None, None, Duration::from_secs(5)).unwrap());
        let resolver = Arc::new(ImageUrlResolver::new("http://api", ImageMode::Direct));
        let service = UserService::new(http, resolver);
        assert!(matches!(service.me().await, Err(Error::Config(_))));

        let http = Arc::new(
            HttpClient::new("http://api".into(), Some("t".into()), None, Duration::from_secs(5)).unwrap(),
        );
        let resolver = Arc::new(ImageUrlResolver::new("http://api", ImageMode::Direct));
        let service = UserService::new(http, resolver);
        assert!(matches!(service.generations(0, 20).await, Err(Error::Validation(_))));
        assert!(matches!(service.generations(1, 500).await, Err(Error::Validation(_))));
    }
}

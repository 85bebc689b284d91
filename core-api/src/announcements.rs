//! School announcements.
//!
//! Reading is open to every signed-in user; creation, update, and deletion
//! go through the `/admin/` surface, where a 401 or 403 is an authorization
//! verdict and is surfaced directly without touching the session.

use chrono::{DateTime, Utc};
use core_session::{ApiClient, Result};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A single announcement as returned by the portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing response: the announcements, newest first, plus their count.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementPage {
    pub announcements: Vec<Announcement>,
    pub count: usize,
}

/// Body for creating or updating an announcement.
#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementDraft {
    pub title: String,
    pub content: String,
}

/// Client for the announcement endpoints.
#[derive(Clone)]
pub struct AnnouncementsClient {
    api: ApiClient,
}

impl AnnouncementsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// List announcements, newest first. `limit` caps the page size.
    #[instrument(skip(self))]
    pub async fn list(&self, limit: Option<usize>) -> Result<AnnouncementPage> {
        let path = match limit {
            Some(n) => format!("/announcements?limit={}", n),
            None => "/announcements".to_string(),
        };
        self.api.get_json(&path).await
    }

    /// Fetch one announcement by id.
    pub async fn get(&self, id: &str) -> Result<Announcement> {
        self.api.get_json(&format!("/announcements/{}", id)).await
    }

    /// Create an announcement. Admin only.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(&self, draft: &AnnouncementDraft) -> Result<Announcement> {
        self.api.post_json("/admin/announcements", draft).await
    }

    /// Update an announcement. Admin only.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: &str, draft: &AnnouncementDraft) -> Result<Announcement> {
        self.api
            .put_json(&format!("/admin/announcements/{}", id), draft)
            .await
    }

    /// Delete an announcement. Admin only.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.api
            .delete(&format!("/admin/announcements/{}", id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_page_wire_format() {
        let json = r#"{
            "announcements": [
                {
                    "id": "65f1c0ffee",
                    "title": "Spring term schedule",
                    "content": "Classes resume April 8.",
                    "createdAt": "2026-03-10T09:00:00Z",
                    "updatedAt": "2026-03-11T09:30:00Z"
                }
            ],
            "count": 1
        }"#;

        let page: AnnouncementPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.announcements[0].title, "Spring term schedule");
        assert_eq!(
            page.announcements[0].updated_at,
            "2026-03-11T09:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_empty_page_is_an_empty_array_not_null() {
        let json = r#"{"announcements": [], "count": 0}"#;
        let page: AnnouncementPage = serde_json::from_str(json).unwrap();
        assert!(page.announcements.is_empty());
        assert_eq!(page.count, 0);
    }

    #[test]
    fn test_draft_serializes_expected_fields() {
        let draft = AnnouncementDraft {
            title: "Title".to_string(),
            content: "Body".to_string(),
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["title"], "Title");
        assert_eq!(json["content"], "Body");
    }
}

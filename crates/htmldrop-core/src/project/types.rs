//! Project data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted metadata record (`metadata.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A stored project as read back from disk.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub html: String,
    pub metadata: ProjectMetadata,
    pub has_thumbnail: bool,
    /// Bytes of regular files in the project directory. Derived on read.
    pub size_bytes: u64,
}

/// One row of the project listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub file_size: u64,
    pub has_thumbnail: bool,
    /// Public preview URL.
    pub url: String,
}

impl ProjectSummary {
    pub fn from_project(project: &Project, host_url: &str) -> Self {
        Self {
            id: project.id.clone(),
            title: project.metadata.title.clone(),
            description: project.metadata.description.clone(),
            created_at: project.metadata.created_at,
            file_size: project.size_bytes,
            has_thumbnail: project.has_thumbnail,
            url: project_url(host_url, &project.id),
        }
    }
}

/// Public URL of a project's preview page.
pub fn project_url(host_url: &str, id: &str) -> String {
    format!("{}/static/{}/index.html", host_url.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_url() {
        assert_eq!(
            project_url("https://drop.example.com/", "abc12345"),
            "https://drop.example.com/static/abc12345/index.html"
        );
    }

    #[test]
    fn test_metadata_json_shape() {
        let metadata = ProjectMetadata {
            id: "abc12345".into(),
            title: "Hello".into(),
            description: "World".into(),
            created_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["id"], "abc12345");
        assert_eq!(json["created_at"], "2026-01-02T03:04:05Z");

        let back: ProjectMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
    }
}

//! Project operations.

use crate::error::{HtmlDropError, Result};
use crate::listing::ProjectPage;
use crate::project::{project_url, Project, ProjectMetadata, ProjectSummary};
use crate::HtmlDrop;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProject {
    pub project_id: String,
    pub url: String,
    pub metadata: ProjectMetadata,
}

impl HtmlDrop {
    // ========================================
    // Mutations
    // ========================================

    /// Store an HTML document as a new project.
    ///
    /// Rejected with `QuotaExceeded` before anything is written when the
    /// project tree is at or over its quota.
    pub async fn create_project(&self, html: &str) -> Result<CreatedProject> {
        if html.trim().is_empty() {
            return Err(HtmlDropError::invalid_input(
                "html_content",
                "No HTML content provided",
            ));
        }
        if html.len() as u64 > self.settings.max_upload_bytes {
            return Err(HtmlDropError::PayloadTooLarge {
                limit_bytes: self.settings.max_upload_bytes,
            });
        }

        self.quota.ensure_headroom()?;
        let metadata = self.store.create_unique(html).await?;
        self.listing.invalidate();

        info!("Uploaded project {} ({:?})", metadata.id, metadata.title);
        Ok(CreatedProject {
            project_id: metadata.id.clone(),
            url: project_url(&self.settings.host_url, &metadata.id),
            metadata,
        })
    }

    /// Attach a base64 image (optionally a `data:` URL) as a project's thumbnail.
    pub async fn attach_thumbnail(&self, id: &str, image: &str) -> Result<()> {
        let bytes = decode_image(image)?;
        if bytes.len() as u64 > self.settings.max_upload_bytes {
            return Err(HtmlDropError::PayloadTooLarge {
                limit_bytes: self.settings.max_upload_bytes,
            });
        }
        self.store.attach_thumbnail(id, &bytes).await?;
        self.listing.invalidate();
        Ok(())
    }

    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        self.listing.invalidate();
        Ok(())
    }

    // ========================================
    // Queries
    // ========================================

    /// Full project including its HTML body.
    pub async fn read_project(&self, id: &str) -> Result<Project> {
        self.store
            .read(id)
            .await?
            .ok_or_else(|| HtmlDropError::NotFound {
                project_id: id.to_string(),
            })
    }

    /// Listing row for one project.
    pub async fn get_project(&self, id: &str) -> Result<ProjectSummary> {
        let project = self.read_project(id).await?;
        Ok(ProjectSummary::from_project(&project, &self.settings.host_url))
    }

    /// One page of the cached project listing, newest first.
    pub async fn list_projects(&self, page: usize, per_page: usize) -> Result<ProjectPage> {
        self.listing.page(page, per_page).await
    }
}

/// Decode plain base64 or a `data:<type>;base64,<payload>` URL.
fn decode_image(image: &str) -> Result<Vec<u8>> {
    let payload = match image.trim().strip_prefix("data:") {
        Some(data_url) => {
            let (header, payload) = data_url.split_once(',').ok_or_else(|| {
                HtmlDropError::invalid_input("image", "Malformed data URL")
            })?;
            if !header.ends_with(";base64") {
                return Err(HtmlDropError::invalid_input(
                    "image",
                    "Data URL must be base64 encoded",
                ));
            }
            payload
        }
        None => image,
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(HtmlDropError::invalid_input("image", "No image data provided"));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| HtmlDropError::invalid_input("image", format!("Invalid base64 image: {}", e)))
}

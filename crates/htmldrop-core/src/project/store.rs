//! Directory-per-project storage.
//!
//! Layout under the store root:
//! ```text
//! {id}/index.html      HTML body
//! {id}/thumbnail.png   optional preview image
//! {id}/metadata.json   ProjectMetadata
//! ```
//! Every file is written atomically. Mutations take the write side of the
//! store lock and reads take the read side, so a reader never observes a
//! project halfway through deletion.

use super::extract::extract_metadata;
use super::id::{generate_project_id, is_single_component};
use super::types::{Project, ProjectMetadata, ProjectSummary};
use crate::atomic::{atomic_read_json, atomic_write_bytes, atomic_write_json};
use crate::config::PathsConfig;
use crate::error::{HtmlDropError, Result};
use crate::quota::tree_size;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Attempts at drawing an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Durable project tree.
pub struct ProjectStore {
    root: PathBuf,
    /// Guards multi-file mutations against concurrent readers.
    lock: RwLock<()>,
}

impl ProjectStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| HtmlDropError::io_with_path(e, &root))?;
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========================================
    // Mutations
    // ========================================

    /// Store `html` as a new project under a freshly drawn id.
    pub async fn create_unique(&self, html: &str) -> Result<ProjectMetadata> {
        let _guard = self.lock.write().await;
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = generate_project_id();
            match self.create_locked(&id, html)? {
                Some(metadata) => return Ok(metadata),
                None => debug!("Project id collision on {}, drawing again", id),
            }
        }
        Err(HtmlDropError::Internal(
            "Could not allocate an unused project id".to_string(),
        ))
    }

    /// Store `html` as a new project with the given id.
    pub async fn create(&self, id: &str, html: &str) -> Result<ProjectMetadata> {
        let _guard = self.lock.write().await;
        self.create_locked(id, html)?
            .ok_or_else(|| HtmlDropError::invalid_input("id", "Project already exists"))
    }

    /// Write or replace the thumbnail of an existing project.
    pub async fn attach_thumbnail(&self, id: &str, image: &[u8]) -> Result<()> {
        let _guard = self.lock.write().await;
        let dir = self.dir_for(id)?;
        if !dir.join(PathsConfig::HTML_FILENAME).is_file() {
            return Err(not_found(id));
        }
        atomic_write_bytes(&dir.join(PathsConfig::THUMBNAIL_FILENAME), image)?;
        debug!("Stored {} byte thumbnail for project {}", image.len(), id);
        Ok(())
    }

    /// Remove a project directory and everything in it.
    ///
    /// The resolved target must sit strictly inside the resolved store root;
    /// anything else is `Forbidden` and nothing is touched.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lock.write().await;
        let target = self.dir_for(id)?;
        if !target.is_dir() {
            return Err(not_found(id));
        }

        let root = self
            .root
            .canonicalize()
            .map_err(|e| HtmlDropError::io_with_path(e, &self.root))?;
        let resolved = target
            .canonicalize()
            .map_err(|e| HtmlDropError::io_with_path(e, &target))?;
        if resolved == root || !resolved.starts_with(&root) {
            warn!("Refusing to delete {} outside the project root", resolved.display());
            return Err(forbidden_path());
        }

        fs::remove_dir_all(&resolved).map_err(|e| HtmlDropError::io_with_path(e, &resolved))?;
        info!("Deleted project {}", id);
        Ok(())
    }

    // ========================================
    // Queries
    // ========================================

    pub async fn exists(&self, id: &str) -> bool {
        let _guard = self.lock.read().await;
        self.dir_for(id)
            .map(|dir| dir.join(PathsConfig::HTML_FILENAME).is_file())
            .unwrap_or(false)
    }

    /// Load a project with its HTML body.
    pub async fn read(&self, id: &str) -> Result<Option<Project>> {
        let _guard = self.lock.read().await;
        let dir = self.dir_for(id)?;
        let html = match fs::read_to_string(dir.join(PathsConfig::HTML_FILENAME)) {
            Ok(html) => html,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HtmlDropError::io_with_path(e, &dir)),
        };
        let metadata = self.load_metadata(id, &dir, Some(&html));
        Ok(Some(Project {
            id: id.to_string(),
            html,
            metadata,
            has_thumbnail: dir.join(PathsConfig::THUMBNAIL_FILENAME).is_file(),
            size_bytes: dir_size(&dir),
        }))
    }

    /// Ids of every stored project, in no particular order.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let _guard = self.lock.read().await;
        self.project_ids()
    }

    /// One summary per project, newest first.
    pub async fn summaries(&self, host_url: &str) -> Result<Vec<ProjectSummary>> {
        let _guard = self.lock.read().await;
        let mut summaries = Vec::new();
        for id in self.project_ids()? {
            let dir = self.root.join(&id);
            let metadata = self.load_metadata(&id, &dir, None);
            let project = Project {
                id: id.clone(),
                html: String::new(),
                metadata,
                has_thumbnail: dir.join(PathsConfig::THUMBNAIL_FILENAME).is_file(),
                size_bytes: dir_size(&dir),
            };
            summaries.push(ProjectSummary::from_project(&project, host_url));
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    /// Last-modified time of a project's HTML body.
    pub async fn last_modified(&self, id: &str) -> Result<SystemTime> {
        let _guard = self.lock.read().await;
        let path = self.dir_for(id)?.join(PathsConfig::HTML_FILENAME);
        fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => not_found(id),
                _ => HtmlDropError::io_with_path(e, &path),
            })
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.list_ids().await?.len())
    }

    // Internal methods

    fn dir_for(&self, id: &str) -> Result<PathBuf> {
        if !is_single_component(id) {
            warn!("Rejected project id {:?}", id);
            return Err(forbidden_path());
        }
        Ok(self.root.join(id))
    }

    /// Returns `None` when the id is already taken.
    fn create_locked(&self, id: &str, html: &str) -> Result<Option<ProjectMetadata>> {
        let dir = self.dir_for(id)?;
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(HtmlDropError::io_with_path(e, &dir)),
        }

        match write_project_files(id, &dir, html) {
            Ok(metadata) => {
                info!("Created project {} ({} bytes)", id, html.len());
                Ok(Some(metadata))
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!("Failed to remove partial project {}: {}", id, cleanup);
                }
                Err(e)
            }
        }
    }

    fn project_ids(&self) -> Result<Vec<String>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HtmlDropError::io_with_path(e, &self.root)),
        };

        Ok(read_dir
            .filter_map(|e| e.ok())
            .filter(|e| e.path().join(PathsConfig::HTML_FILENAME).is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect())
    }

    /// Stored metadata, or a reconstruction when the record is missing or
    /// unreadable. Reconstructions are not written back.
    fn load_metadata(&self, id: &str, dir: &Path, html: Option<&str>) -> ProjectMetadata {
        match atomic_read_json::<ProjectMetadata>(&dir.join(PathsConfig::METADATA_FILENAME)) {
            Ok(Some(metadata)) => return metadata,
            Ok(None) => debug!("Project {} has no metadata record, reconstructing", id),
            Err(e) => warn!("Unreadable metadata for project {}, reconstructing: {}", id, e),
        }

        let html_path = dir.join(PathsConfig::HTML_FILENAME);
        let html = match html {
            Some(html) => html.to_string(),
            None => fs::read_to_string(&html_path).unwrap_or_default(),
        };
        let extracted = extract_metadata(&html);
        ProjectMetadata {
            id: id.to_string(),
            title: extracted.title,
            description: extracted.description,
            created_at: file_created_at(&html_path),
        }
    }
}

fn write_project_files(id: &str, dir: &Path, html: &str) -> Result<ProjectMetadata> {
    atomic_write_bytes(&dir.join(PathsConfig::HTML_FILENAME), html.as_bytes())?;

    let extracted = extract_metadata(html);
    let metadata = ProjectMetadata {
        id: id.to_string(),
        title: extracted.title,
        description: extracted.description,
        created_at: Utc::now(),
    };
    atomic_write_json(&dir.join(PathsConfig::METADATA_FILENAME), &metadata)?;
    Ok(metadata)
}

/// Creation time where the filesystem records one, else modification time.
fn file_created_at(path: &Path) -> DateTime<Utc> {
    fs::metadata(path)
        .and_then(|meta| meta.created().or_else(|_| meta.modified()))
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn dir_size(dir: &Path) -> u64 {
    tree_size(dir).unwrap_or_else(|e| {
        warn!("Failed to size {}: {}", dir.display(), e);
        0
    })
}

fn not_found(id: &str) -> HtmlDropError {
    HtmlDropError::NotFound {
        project_id: id.to_string(),
    }
}

fn forbidden_path() -> HtmlDropError {
    HtmlDropError::Forbidden {
        reason: "Invalid project path".to_string(),
    }
}

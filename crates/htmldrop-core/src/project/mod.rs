//! User projects: storage, ids and derived metadata.

mod extract;
mod id;
mod store;
mod types;

pub use extract::{clean_text, decode_entities, extract_metadata, ExtractedMetadata};
pub use id::{generate_project_id, is_single_component};
pub use store::ProjectStore;
pub use types::{project_url, Project, ProjectMetadata, ProjectSummary};

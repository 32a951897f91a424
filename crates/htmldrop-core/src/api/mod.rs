//! API implementation submodules.
//!
//! Each submodule contains `impl HtmlDrop` blocks. The struct itself is
//! defined in `lib.rs`.

mod builder;
mod maintenance;
mod projects;
mod resources;

pub use builder::HtmlDropBuilder;
pub use maintenance::ReaperStatus;
pub use projects::CreatedProject;

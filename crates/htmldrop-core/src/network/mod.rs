//! Outbound side of the resource proxy.
//!
//! - [`OriginAllowList`]: which origins may be fetched at all
//! - [`ResourceFetcher`]: bounded fetch seam, implemented over HTTP by [`HttpFetcher`]

mod allowlist;
mod fetcher;

pub use allowlist::{OriginAllowList, DEFAULT_ALLOWED_HOSTS};
pub use fetcher::{DynFetcher, FetchedResource, HttpFetcher, ResourceFetcher};

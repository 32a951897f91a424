//! Builder for configuring HtmlDrop initialization.

use crate::cache::{PersistentCache, VolatileCache};
use crate::config::Settings;
use crate::error::Result;
use crate::listing::ListingCache;
use crate::network::{DynFetcher, HttpFetcher, OriginAllowList};
use crate::project::ProjectStore;
use crate::proxy::ResourceProxy;
use crate::quota::QuotaAccountant;
use crate::reaper::ExpiryReaper;
use crate::HtmlDrop;
use std::sync::Arc;
use tracing::info;

/// Builder for [`HtmlDrop`].
///
/// # Example
///
/// ```rust,ignore
/// let drop = HtmlDrop::builder(settings)
///     .with_allow_list(OriginAllowList::new(vec!["cdn.internal".into()]))
///     .build()?;
/// ```
pub struct HtmlDropBuilder {
    settings: Settings,
    fetcher: Option<DynFetcher>,
    allow_list: OriginAllowList,
}

impl HtmlDropBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            fetcher: None,
            allow_list: OriginAllowList::default(),
        }
    }

    /// Replace the HTTP fetcher used on cache misses.
    ///
    /// Default: [`HttpFetcher`]
    pub fn with_fetcher(mut self, fetcher: DynFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the trusted origin list.
    ///
    /// Default: the built-in CDN and font hosts
    pub fn with_allow_list(mut self, allow_list: OriginAllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Create directories and wire the components together.
    pub fn build(self) -> Result<HtmlDrop> {
        let settings = self.settings;
        let fetcher: DynFetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new()?),
        };

        let store = Arc::new(ProjectStore::new(settings.projects_dir())?);
        let quota = QuotaAccountant::new(settings.projects_dir(), settings.storage_quota_bytes);
        let listing = Arc::new(ListingCache::new(
            store.clone(),
            settings.host_url.clone(),
            settings.listing_cache_ttl,
        ));
        let proxy = ResourceProxy::new(
            self.allow_list,
            VolatileCache::new(settings.memory_cache_capacity),
            PersistentCache::new(settings.resource_cache_dir(), settings.resource_cache_ttl)?,
            fetcher,
            settings.max_resource_bytes,
            settings.fetch_timeout,
        );
        let reaper = Arc::new(ExpiryReaper::new(
            store.clone(),
            listing.clone(),
            settings.project_expiry,
        ));

        info!(
            "HTML Drop ready: projects in {}, resource cache in {}",
            settings.projects_dir().display(),
            settings.resource_cache_dir().display()
        );

        Ok(HtmlDrop {
            settings,
            store,
            quota,
            listing,
            proxy,
            reaper,
        })
    }
}

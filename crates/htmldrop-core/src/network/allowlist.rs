//! Trusted origin list for proxied resources.

/// CDN and font hosts the proxy may fetch from.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "cdn.tailwindcss.com",
    "cdn.jsdelivr.net",
    "unpkg.com",
    "cdnjs.cloudflare.com",
    "fonts.googleapis.com",
    "fonts.gstatic.com",
    "code.jquery.com",
    "stackpath.bootstrapcdn.com",
    "maxcdn.bootstrapcdn.com",
    "cdn.bootcdn.net",
    "use.fontawesome.com",
    "ajax.googleapis.com",
];

/// Coarse origin check.
///
/// A URL is allowed when it contains one of the listed hostnames anywhere in
/// its text. The list is operator-controlled and the fetch target is always
/// the full URL given, so substring matching is sufficient here.
#[derive(Debug, Clone)]
pub struct OriginAllowList {
    hosts: Vec<String>,
}

impl Default for OriginAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()))
    }
}

impl OriginAllowList {
    pub fn new(hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            hosts: hosts.into_iter().collect(),
        }
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        self.hosts.iter().any(|host| url.contains(host.as_str()))
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

//! Engine-facing policy record.

use url::Url;

use crate::Error;

/// Everything the policy engine needs to know about a deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Name of the current cache generation.
    pub version: String,
    /// Application origin; base for relative manifest entries.
    pub origin: Url,
    /// Critical assets, in order.
    pub manifest: Vec<String>,
    /// Lower-cased hostname substrings that bypass the cache entirely.
    pub excluded_hosts: Vec<String>,
}

impl PolicyConfig {
    pub fn new(version: impl Into<String>, origin: Url) -> Self {
        Self { version: version.into(), origin, manifest: Vec::new(), excluded_hosts: Vec::new() }
    }

    pub fn with_manifest<I, S>(mut self, manifest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = manifest.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excluded_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_hosts = hosts.into_iter().map(|host| normalize_host(host.into())).collect();
        self
    }

    /// Whether a hostname contains any excluded substring, ignoring ASCII case.
    ///
    /// Matching is deliberately loose: `googleapis.com` also excludes
    /// `storage.googleapis.com.example.org`.
    pub fn is_excluded(&self, hostname: &str) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        self.excluded_hosts.iter().any(|pattern| hostname.contains(&pattern.to_ascii_lowercase()))
    }

    /// Resolve a URL, absolute or relative to the origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        let mut url = self.origin.join(input.trim()).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))?;
        url.set_fragment(None);
        Ok(url)
    }

    /// Resolve every manifest entry, keeping manifest order.
    pub fn resolve_manifest(&self) -> Result<Vec<Url>, Error> {
        self.manifest.iter().map(|entry| self.resolve(entry)).collect()
    }
}

/// Hosts compare lower-cased, the way `Url` reports them.
pub(crate) fn normalize_host(host: String) -> String {
    host.trim().to_ascii_lowercase()
}

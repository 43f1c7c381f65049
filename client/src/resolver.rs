//! Image URL normalization.
//!
//! The backend hands out either absolute CDN URLs or paths into its local
//! storage (`/storage/...`). A client cannot always load the latter directly,
//! so storage paths are rewritten to a same-origin proxy route when one is
//! deployed, or to the backend origin otherwise.

/// Path prefix of backend-local storage.
pub const STORAGE_PREFIX: &str = "/storage";

/// Route on the client origin that proxies to backend storage.
pub const PROXY_ROUTE: &str = "/images/generated";

/// How storage-relative references reach the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageMode {
    /// Storage paths go through the proxy route.
    ///
    /// With `origin: None` the result stays origin-relative, for clients that
    /// are served from the proxy host themselves.
    Proxy { origin: Option<String> },
    /// Storage paths are fetched straight from the backend.
    Direct,
}

impl Default for ImageMode {
    fn default() -> Self {
        ImageMode::Proxy { origin: None }
    }
}

/// Resolves backend image references into loadable URLs.
#[derive(Debug, Clone)]
pub struct ImageUrlResolver {
    backend_origin: String,
    mode: ImageMode,
}

impl ImageUrlResolver {
    /// Creates a resolver for the given backend origin.
    pub fn new(backend_origin: impl Into<String>, mode: ImageMode) -> Self {
        let mode = match mode {
            ImageMode::Proxy { origin } => ImageMode::Proxy {
                origin: origin
                    .map(|o| o.trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty()),
            },
            ImageMode::Direct => ImageMode::Direct,
        };
        Self {
            backend_origin: backend_origin.into().trim_end_matches('/').to_string(),
            mode,
        }
    }

    /// Returns the configured backend origin.
    pub fn backend_origin(&self) -> &str {
        &self.backend_origin
    }

    /// Returns the configured mode.
    pub fn mode(&self) -> &ImageMode {
        &self.mode
    }

    /// Resolves a reference. Empty input yields `None`.
    ///
    /// The mapping is idempotent: feeding a resolved URL back in returns it
    /// unchanged.
    pub fn resolve(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference.map(str::trim).filter(|r| !r.is_empty())?;

        if is_absolute(reference) {
            return Some(reference.to_string());
        }

        if let ImageMode::Proxy { origin } = &self.mode {
            if let Some(rest) = strip_path_prefix(reference, STORAGE_PREFIX) {
                return Some(self.proxy_url(origin.as_deref(), rest));
            }
            if strip_path_prefix(reference, PROXY_ROUTE).is_some() {
                return Some(match origin {
                    Some(origin) => format!("{}{}", origin, reference),
                    None => reference.to_string(),
                });
            }
        }

        let path = reference.trim_start_matches('/');
        Some(format!("{}/{}", self.backend_origin, path))
    }

    /// Convenience wrapper for a present reference.
    pub fn resolve_str(&self, reference: &str) -> Option<String> {
        self.resolve(Some(reference))
    }

    fn proxy_url(&self, origin: Option<&str>, rest: &str) -> String {
        let rest = rest.trim_start_matches('/');
        format!("{}{}/{}", origin.unwrap_or_default(), PROXY_ROUTE, rest)
    }
}

fn is_absolute(reference: &str) -> bool {
    let lower = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Strips `prefix` when it is a whole path segment of `path`.
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxied() -> ImageUrlResolver {
        ImageUrlResolver::new("http://localhost:8000/", ImageMode::default())
    }

    #[test]
    fn test_empty_input() {
        let r = proxied();
        assert_eq!(r.resolve(None), None);
        assert_eq!(r.resolve(Some("")), None);
        assert_eq!(r.resolve(Some("   ")), None);
    }

    #[test]
    fn test_absolute_unchanged() {
        let r = proxied();
        let url = "https://cdn.example/x.jpg";
        assert_eq!(r.resolve_str(url).as_deref(), Some(url));
        assert_eq!(
            r.resolve_str("HTTP://cdn.example/y.png").as_deref(),
            Some("HTTP://cdn.example/y.png")
        );
    }

    #[test]
    fn test_storage_rewritten_to_proxy() {
        let r = proxied();
        let once = r.resolve_str("/storage/abc.jpg").unwrap();
        assert_eq!(once, "/images/generated/abc.jpg");
        assert_eq!(r.resolve_str(&once).unwrap(), once);
    }

    #[test]
    fn test_storage_with_proxy_origin() {
        let r = ImageUrlResolver::new(
            "https://api.example",
            ImageMode::Proxy {
                origin: Some("https://app.example/".to_string()),
            },
        );
        let once = r.resolve_str("/storage/out/1.jpg").unwrap();
        assert_eq!(once, "https://app.example/images/generated/out/1.jpg");
        assert_eq!(r.resolve_str(&once).unwrap(), once);
        assert_eq!(
            r.resolve_str("/images/generated/out/1.jpg").unwrap(),
            "https://app.example/images/generated/out/1.jpg"
        );
    }

    #[test]
    fn test_storage_prefix_is_segment_bound() {
        let r = proxied();
        assert_eq!(
            r.resolve_str("/storagefoo/a.jpg").unwrap(),
            "http://localhost:8000/storagefoo/a.jpg"
        );
    }

    #[test]
    fn test_other_relative_prefixed_with_backend() {
        let r = proxied();
        assert_eq!(
            r.resolve_str("/uploads/a.png").unwrap(),
            "http://localhost:8000/uploads/a.png"
        );
        assert_eq!(
            r.resolve_str("uploads/a.png").unwrap(),
            "http://localhost:8000/uploads/a.png"
        );
    }

    #[test]
    fn test_direct_mode() {
        let r = ImageUrlResolver::new("https://api.example", ImageMode::Direct);
        let once = r.resolve_str("/storage/abc.jpg").unwrap();
        assert_eq!(once, "https://api.example/storage/abc.jpg");
        assert_eq!(r.resolve_str(&once).unwrap(), once);
    }
}

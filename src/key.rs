//! Mapping between request URLs and manifest resource keys.

use reqwest::Url;

/// Resource key of the entry page.
pub const ROOT_KEY: &str = "/";

/// Query parameter appended by the build for cache busting.
const VERSION_PARAM: &str = "?v=";

/// Returns `url` relative to `origin`, without the separating slash.
///
/// Returns `None` for URLs on a different origin.
fn relative_to_origin<'a>(url: &'a str, origin: &str) -> Option<&'a str> {
    let rest = url.strip_prefix(origin)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix('/')
}

/// Removes the fragment; fragments never reach the network or the cache.
#[must_use]
pub fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(base, _)| base)
}

/// Canonical form of a request URL, used as its cache key.
///
/// The fragment is dropped and an empty path serializes as `/`, so
/// `https://app.test` and `https://app.test/#/home` share one entry with
/// `https://app.test/`. Unparseable URLs only lose their fragment.
#[must_use]
pub fn canonical_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => strip_fragment(url).to_string(),
    }
}

/// Computes the logical resource key of a stored request URL.
///
/// An empty path maps to [`ROOT_KEY`].
#[must_use]
pub fn stored_key(url: &str, origin: &str) -> Option<String> {
    let rel = relative_to_origin(url, origin)?;
    if rel.is_empty() {
        Some(ROOT_KEY.to_string())
    } else {
        Some(rel.to_string())
    }
}

/// Normalizes an incoming request URL to the key it is looked up under.
///
/// Drops the fragment and the `?v=` cache-busting suffix; the origin itself,
/// the origin root and in-page anchors all map to [`ROOT_KEY`].
#[must_use]
pub fn request_key(url: &str, origin: &str) -> Option<String> {
    let rel = relative_to_origin(strip_fragment(url), origin)?;
    let key = rel.split_once(VERSION_PARAM).map_or(rel, |(path, _)| path);
    if key.is_empty() {
        Some(ROOT_KEY.to_string())
    } else {
        Some(key.to_string())
    }
}

/// Builds the absolute URL a resource key is fetched from and cached under.
#[must_use]
pub fn resource_url(origin: &str, key: &str) -> String {
    if key == ROOT_KEY {
        format!("{origin}/")
    } else {
        format!("{origin}/{key}")
    }
}

/// Canonical origin form: no trailing slash.
#[must_use]
pub fn normalize_origin(origin: &str) -> String {
    origin.trim_end_matches('/').to_string()
}

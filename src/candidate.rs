use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier recorded in the used set.
///
/// Provider ids are used verbatim. Candidates without one are keyed by the
/// SHA-256 of their canonical media URL, prefixed with `url:` so the two
/// schemes can never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn native(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_media_url(url: &str) -> Self {
        let digest = Sha256::digest(canonical_media_url(url).as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("url:{hex}"))
    }

    /// Native id when the provider supplied a non-empty one, URL hash otherwise.
    pub fn resolve(native: Option<&str>, media_url: &str) -> Self {
        match native.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Self::native(id),
            None => Self::from_media_url(media_url),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scheme and host lowercased, query and fragment dropped. CDN links often
/// carry signed query strings that change between requests for the same file.
pub fn canonical_media_url(url: &str) -> String {
    let url = url.trim();
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);

    match without_query.split_once("://") {
        Some((scheme, rest)) => {
            let (host, path) = match rest.find('/') {
                Some(idx) => rest.split_at(idx),
                None => (rest, ""),
            };
            format!("{}://{}{}", scheme.to_ascii_lowercase(), host.to_ascii_lowercase(), path)
        }
        None => without_query.to_string(),
    }
}

/// A stock clip as returned by the catalog, before download.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub media_url: String,
    pub tags: BTreeSet<String>,
    pub duration_seconds: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Candidate {
    pub fn has_any_tag(&self, denied: &[String]) -> bool {
        denied
            .iter()
            .any(|tag| self.tags.contains(&tag.trim().to_lowercase()))
    }
}

/// Splits a provider tag string such as `"dog, puppy, Pet"` into lowercase tags.
pub fn parse_tag_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

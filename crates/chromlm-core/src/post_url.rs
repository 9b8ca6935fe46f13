use std::fmt;

use chromlm_error::Error;
use serde::{Deserialize, Serialize};
use url::Url;

const POST_HOST: &str = "www.instagram.com";
const POST_ID_MARKER: &str = "instagram.com/p/";
const UNKNOWN_POST_ID: &str = "unknown";

/// Address of a single Instagram post, validated on construction.
///
/// Surrounding whitespace is dropped; otherwise the string is kept exactly as
/// given. It is the dedup key of the history ledger, so two spellings of the
/// same post are two entries.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct PostUrl(String);

impl PostUrl {
    pub fn parse(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        let trimmed = s.trim();
        if is_instagram_post(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(Error::invalid_url(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn post_id(&self) -> String {
        extract_post_id(&self.0)
    }
}

impl fmt::Debug for PostUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PostUrl").field(&self.0).finish()
    }
}

impl fmt::Display for PostUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PostUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PostUrl {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PostUrl> for String {
    fn from(value: PostUrl) -> Self {
        value.0
    }
}

/// `https://www.instagram.com/p/<token>...` where `<token>` is non-empty.
pub fn is_instagram_post(s: &str) -> bool {
    let Ok(url) = Url::parse(s.trim()) else {
        return false;
    };
    if url.scheme() != "https" || url.host_str() != Some(POST_HOST) || url.port().is_some() {
        return false;
    }
    let mut segments = match url.path_segments() {
        Some(segments) => segments,
        None => return false,
    };
    matches!(
        (segments.next(), segments.next()),
        (Some("p"), Some(token)) if !token.is_empty()
    )
}

/// Post identifier: the token after `instagram.com/p/` up to the next `/` or
/// `?`, or `"unknown"` when there is none. The host is matched without
/// regard to case; the token keeps its case.
pub fn extract_post_id(s: &str) -> String {
    s.to_ascii_lowercase()
        .find(POST_ID_MARKER)
        .map(|start| &s[start + POST_ID_MARKER.len()..])
        .map(|rest| rest.split(['/', '?']).next().unwrap_or_default())
        .filter(|token| !token.is_empty())
        .unwrap_or(UNKNOWN_POST_ID)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_post_id() {
        assert_eq!(extract_post_id("https://www.instagram.com/p/ABC123/"), "ABC123");
        assert_eq!(
            extract_post_id("https://www.instagram.com/p/XYZ?igsh=abc"),
            "XYZ"
        );
        assert_eq!(extract_post_id("https://www.instagram.com/p/XYZ"), "XYZ");
    }

    #[test]
    fn unknown_post_id() {
        assert_eq!(extract_post_id("not a url"), "unknown");
        assert_eq!(extract_post_id(""), "unknown");
        assert_eq!(extract_post_id("https://www.instagram.com/p/"), "unknown");
        assert_eq!(extract_post_id("https://www.instagram.com/reel/ABC/"), "unknown");
    }

    #[test]
    fn accepts_post_urls() {
        for ok in [
            "https://www.instagram.com/p/ABC123/",
            "https://www.instagram.com/p/ABC123",
            "https://www.instagram.com/p/ABC123/?img_index=2",
            "https://www.instagram.com/p/C-x_Yz9/comments/",
        ] {
            assert!(is_instagram_post(ok), "{ok} should be accepted");
            assert!(PostUrl::parse(ok).is_ok());
        }
    }

    #[test]
    fn rejects_other_urls() {
        for bad in [
            "not a url",
            "http://www.instagram.com/p/ABC123/",
            "https://instagram.com/p/ABC123/",
            "https://www.instagram.com/reel/ABC123/",
            "https://www.instagram.com/p/",
            "https://www.instagram.com/p//",
            "https://www.instagram.com:8443/p/ABC123/",
            "https://www.example.com/p/ABC123/",
        ] {
            assert!(!is_instagram_post(bad), "{bad} should be rejected");
            assert!(matches!(PostUrl::parse(bad), Err(Error::InvalidUrl { .. })));
        }
    }

    #[test]
    fn keeps_original_spelling() {
        let url = PostUrl::parse("https://www.instagram.com/p/ABC123/?utm=1").unwrap();
        assert_eq!(url.as_str(), "https://www.instagram.com/p/ABC123/?utm=1");
        assert_eq!(url.post_id(), "ABC123");
    }

    #[test]
    fn mixed_case_host_keeps_its_post_id() {
        let url = PostUrl::parse("https://WWW.INSTAGRAM.COM/p/ABC123/").unwrap();
        assert_eq!(url.post_id(), "ABC123");
        assert_eq!(
            extract_post_id("https://www.Instagram.com/p/aBc_9?igsh=x"),
            "aBc_9"
        );
    }

    #[test]
    fn surrounding_whitespace_is_dropped() {
        let url = PostUrl::parse("  https://www.instagram.com/p/ABC123/\n").unwrap();
        assert_eq!(url.as_str(), "https://www.instagram.com/p/ABC123/");
        assert_eq!(url, PostUrl::parse("https://www.instagram.com/p/ABC123/").unwrap());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<PostUrl, _> =
            serde_json::from_str("\"https://www.instagram.com/p/ABC123/\"");
        assert!(ok.is_ok());
        let bad: Result<PostUrl, _> = serde_json::from_str("\"https://example.com\"");
        assert!(bad.is_err());
    }
}

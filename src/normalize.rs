//! URL normalization and channel path classification.
//!
//! Pure functions, no network access. The canonical form is rebuilt
//! from the classified path segments (rather than trimmed from the
//! input), which is what makes normalization idempotent and the
//! resulting string usable as an upsert key.

use url::Url;

use crate::error::NormalizeError;
use crate::models::{ChannelUrl, UrlShape};

const ALLOWED_HOSTS: [&str; 3] = ["youtube.com", "www.youtube.com", "youtu.be"];

/// Stable channel IDs are 24 characters and start with "UC".
const CHANNEL_ID_LEN: usize = 24;

const HANDLE_MAX_LEN: usize = 30;

/// RFC 3986 reserved characters, none of which may appear in a handle.
const URL_RESERVED: &[char] = &[
    ':', '/', '?', '#', '[', ']', '@', '!', '$', '&', '\'', '(', ')', '*', '+', ',', ';', '=',
];

/// Canonicalize a raw string into a channel URL, or reject it.
///
/// A missing scheme defaults to `https`; an explicit `http` is upgraded.
/// Query and fragment are dropped. The authority must be in the
/// youtube.com / youtu.be family and the path must match one of the
/// known channel shapes.
pub fn normalize(raw: &str) -> Result<ChannelUrl, NormalizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::InvalidDomain(String::new()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|_| NormalizeError::InvalidDomain(trimmed.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(NormalizeError::InvalidDomain(trimmed.to_string()));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| NormalizeError::InvalidDomain(trimmed.to_string()))?
        .to_ascii_lowercase();
    if !ALLOWED_HOSTS.contains(&host.as_str()) {
        return Err(NormalizeError::InvalidDomain(host));
    }

    let (shape, path) = classify_path(parsed.path())?;

    Ok(ChannelUrl {
        raw: raw.to_string(),
        normalized: format!("https://{host}{path}"),
        shape,
    })
}

/// Classify a URL path into a channel shape and return the canonical
/// path for it.
fn classify_path(path: &str) -> Result<(UrlShape, String), NormalizeError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["channel", id] if is_channel_id(id) => {
            Ok((UrlShape::ChannelId, format!("/channel/{id}")))
        }
        [handle] if handle.starts_with('@') && is_valid_handle(&handle[1..]) => {
            Ok((UrlShape::Handle, format!("/{handle}")))
        }
        ["user", name] if !name.is_empty() => Ok((UrlShape::LegacyUser, format!("/user/{name}"))),
        ["c", name] if !name.is_empty() => Ok((UrlShape::LegacyCustom, format!("/c/{name}"))),
        _ => Err(NormalizeError::InvalidPathFormat(path.to_string())),
    }
}

fn is_channel_id(id: &str) -> bool {
    id.len() == CHANNEL_ID_LEN
        && id.starts_with("UC")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle.chars().count() <= HANDLE_MAX_LEN
        && handle
            .chars()
            .all(|c| !c.is_whitespace() && !URL_RESERVED.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_defaulted() {
        let url = normalize("youtube.com/@SomeHandle").unwrap();
        assert_eq!(url.normalized, "https://youtube.com/@SomeHandle");
        assert_eq!(url.shape, UrlShape::Handle);
    }

    #[test]
    fn test_http_upgraded_to_https() {
        let url = normalize("http://www.youtube.com/@SomeHandle").unwrap();
        assert_eq!(url.normalized, "https://www.youtube.com/@SomeHandle");
    }

    #[test]
    fn test_normalize_idempotent() {
        for input in [
            "youtube.com/channel/UCabcdefghijklmnopqrstuv",
            "www.youtube.com/@handle",
            "https://www.youtube.com/user/legacyname/",
            "youtube.com/c/SomeCustomName?sub_confirmation=1",
        ] {
            let once = normalize(input).unwrap();
            let twice = normalize(&once.normalized).unwrap();
            assert_eq!(once.normalized, twice.normalized);
            assert_eq!(once.shape, twice.shape);
        }
    }

    #[test]
    fn test_rejects_foreign_domain() {
        let err = normalize("https://example.com/@foo").unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidDomain(_)));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(matches!(
            normalize("   "),
            Err(NormalizeError::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(matches!(
            normalize("ftp://youtube.com/@foo"),
            Err(NormalizeError::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_channel_id_path() {
        let url = normalize("youtube.com/channel/UCabcdefghijklmnopqrstuv").unwrap();
        assert_eq!(url.shape, UrlShape::ChannelId);
        assert_eq!(
            url.normalized,
            "https://youtube.com/channel/UCabcdefghijklmnopqrstuv"
        );
    }

    #[test]
    fn test_channel_id_must_be_well_formed() {
        // Wrong prefix
        assert!(matches!(
            normalize("youtube.com/channel/XXabcdefghijklmnopqrstuv"),
            Err(NormalizeError::InvalidPathFormat(_))
        ));
        // Wrong length
        assert!(matches!(
            normalize("youtube.com/channel/UCshort"),
            Err(NormalizeError::InvalidPathFormat(_))
        ));
    }

    #[test]
    fn test_handle_path() {
        let url = normalize("youtube.com/@SomeHandle").unwrap();
        assert_eq!(url.shape, UrlShape::Handle);
    }

    #[test]
    fn test_handle_length_bound() {
        let ok = format!("youtube.com/@{}", "a".repeat(30));
        assert!(normalize(&ok).is_ok());

        let too_long = format!("youtube.com/@{}", "a".repeat(31));
        assert!(matches!(
            normalize(&too_long),
            Err(NormalizeError::InvalidPathFormat(_))
        ));
    }

    #[test]
    fn test_legacy_shapes() {
        assert_eq!(
            normalize("youtube.com/user/somebody").unwrap().shape,
            UrlShape::LegacyUser
        );
        assert_eq!(
            normalize("youtube.com/c/SomeName").unwrap().shape,
            UrlShape::LegacyCustom
        );
    }

    #[test]
    fn test_rejects_other_paths() {
        for input in [
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/",
            "youtube.com/@handle/videos",
            "youtube.com/channel/UCabcdefghijklmnopqrstuv/about",
        ] {
            assert!(
                matches!(normalize(input), Err(NormalizeError::InvalidPathFormat(_))),
                "expected path rejection for {input}"
            );
        }
    }

    #[test]
    fn test_query_and_fragment_dropped() {
        let url = normalize("https://youtube.com/@handle?si=abc#about").unwrap();
        assert_eq!(url.normalized, "https://youtube.com/@handle");
    }
}

//! Conditional request evaluation.
//!
//! [`ConditionalProtocol`] turns version metadata into validators (a weak
//! entity tag and a last-modified instant) and decides whether a client's
//! `If-None-Match` / `If-Modified-Since` preconditions let a read stop before
//! any content is loaded.
//!
//! `If-None-Match` takes priority: when it is present, `If-Modified-Since` is
//! ignored.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use quill_persistence::conditional::{ConditionalProtocol, Evaluation, IfNoneMatch, Preconditions};
//! use quill_persistence::types::VersionMeta;
//!
//! let protocol = ConditionalProtocol::new();
//! let validators = protocol.compute_validators(&VersionMeta { version: 3, last_updated: Utc::now() });
//! assert_eq!(validators.etag.to_string(), "W/\"3\"");
//!
//! let preconditions = Preconditions {
//!     if_none_match: IfNoneMatch::parse("W/\"3\""),
//!     if_modified_since: None,
//! };
//! assert_eq!(protocol.evaluate(&preconditions, &validators), Evaluation::ShortCircuit);
//! ```

use std::fmt;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

use crate::lifecycle::ResponseClass;
use crate::types::VersionMeta;

/// An HTTP entity tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityTag {
    weak: bool,
    opaque: String,
}

impl EntityTag {
    /// The weak tag the store issues for a version number.
    pub fn for_version(version: u64) -> Self {
        Self {
            weak: true,
            opaque: version.to_string(),
        }
    }

    /// Parses a single tag such as `W/"3"` or `"3"`.
    ///
    /// Unquoted values are accepted as a courtesy to clients that drop the
    /// quotes.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (weak, rest) = match value.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let opaque = rest
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .unwrap_or(rest);
        if opaque.is_empty() || opaque.contains('"') {
            return None;
        }
        Some(Self {
            weak,
            opaque: opaque.to_string(),
        })
    }

    /// Returns true for weak tags.
    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// Returns the tag without quotes or weakness marker.
    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    /// Weak comparison: the opaque parts match, weakness is ignored.
    pub fn weak_eq(&self, other: &EntityTag) -> bool {
        self.opaque() == other.opaque()
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.opaque)
        } else {
            write!(f, "\"{}\"", self.opaque)
        }
    }
}

/// The value of an `If-None-Match` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfNoneMatch {
    /// `*`: matches any current representation.
    Any,
    /// A list of tags, compared weakly.
    Tags(Vec<EntityTag>),
}

impl IfNoneMatch {
    /// Parses a header value. Returns `None` if no tag in it is usable.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == "*" {
            return Some(IfNoneMatch::Any);
        }
        let tags: Vec<EntityTag> = value.split(',').filter_map(EntityTag::parse).collect();
        if tags.is_empty() {
            None
        } else {
            Some(IfNoneMatch::Tags(tags))
        }
    }

    /// Returns true if `tag` is matched.
    pub fn matches(&self, tag: &EntityTag) -> bool {
        match self {
            IfNoneMatch::Any => true,
            IfNoneMatch::Tags(tags) => tags.iter().any(|t| t.weak_eq(tag)),
        }
    }
}

/// Validators describing one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Weak tag derived from the version number.
    pub etag: EntityTag,
    /// Publication instant, truncated to whole seconds.
    pub last_modified: DateTime<Utc>,
}

impl Validators {
    /// Formats `last_modified` as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    pub fn http_last_modified(&self) -> String {
        format_http_date(self.last_modified)
    }
}

/// Client preconditions relevant to reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    /// Parsed `If-None-Match`.
    pub if_none_match: Option<IfNoneMatch>,
    /// Parsed `If-Modified-Since`.
    pub if_modified_since: Option<DateTime<Utc>>,
}

impl Preconditions {
    /// Returns true if no precondition is present.
    pub fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none()
    }
}

/// Verdict of [`ConditionalProtocol::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// The client's copy is current; answer "not modified" without a body.
    ShortCircuit,
    /// Build the full response.
    Proceed,
}

impl Evaluation {
    /// Returns [`ResponseClass::NotModified`] for a short circuit.
    pub fn response_class(&self) -> Option<ResponseClass> {
        match self {
            Evaluation::ShortCircuit => Some(ResponseClass::NotModified),
            Evaluation::Proceed => None,
        }
    }
}

/// Computes validators and evaluates read preconditions against them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalProtocol;

impl ConditionalProtocol {
    /// Creates the protocol.
    pub fn new() -> Self {
        Self
    }

    /// Derives validators from version metadata.
    pub fn compute_validators(&self, meta: &VersionMeta) -> Validators {
        Validators {
            etag: EntityTag::for_version(meta.version),
            last_modified: truncate_to_seconds(meta.last_updated),
        }
    }

    /// Decides whether a read can stop with "not modified".
    pub fn evaluate(&self, preconditions: &Preconditions, validators: &Validators) -> Evaluation {
        if let Some(if_none_match) = &preconditions.if_none_match {
            return if if_none_match.matches(&validators.etag) {
                Evaluation::ShortCircuit
            } else {
                Evaluation::Proceed
            };
        }

        match preconditions.if_modified_since {
            Some(since) if since >= validators.last_modified => Evaluation::ShortCircuit,
            _ => Evaluation::Proceed,
        }
    }
}

fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::seconds(1)).unwrap_or(ts)
}

/// Formats an instant as an IMF-fixdate.
pub fn format_http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses an HTTP date. Accepts IMF-fixdate and other RFC 2822 forms.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn validators_at(version: u64, secs: i64, micros: u32) -> Validators {
        let last_updated = Utc.timestamp_opt(secs, micros * 1_000).unwrap();
        ConditionalProtocol::new().compute_validators(&VersionMeta {
            version,
            last_updated,
        })
    }

    #[test]
    fn test_validators_are_weak_and_truncated() {
        let v = validators_at(7, 1_700_000_000, 654_321);
        assert_eq!(v.etag.to_string(), "W/\"7\"");
        assert!(v.etag.is_weak());
        assert_eq!(v.last_modified.timestamp(), 1_700_000_000);
        assert_eq!(v.last_modified.timestamp_subsec_nanos(), 0);
        assert_eq!(v.http_last_modified(), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn test_entity_tag_parsing() {
        assert_eq!(EntityTag::parse("W/\"2\"").unwrap().opaque(), "2");
        assert!(!EntityTag::parse("\"2\"").unwrap().is_weak());
        assert_eq!(EntityTag::parse("2").unwrap().opaque(), "2");
        assert!(EntityTag::parse("W/\"\"").is_none());
    }

    #[test]
    fn test_if_none_match_list_and_wildcard() {
        let list = IfNoneMatch::parse("\"1\", W/\"4\"").unwrap();
        assert!(list.matches(&EntityTag::for_version(4)));
        assert!(!list.matches(&EntityTag::for_version(2)));
        assert!(IfNoneMatch::parse("*").unwrap().matches(&EntityTag::for_version(9)));
        assert!(IfNoneMatch::parse(" , ").is_none());
    }

    #[test]
    fn test_matching_tag_short_circuits() {
        let protocol = ConditionalProtocol::new();
        let v = validators_at(3, 1_700_000_000, 0);
        let pre = Preconditions {
            if_none_match: IfNoneMatch::parse("W/\"3\""),
            if_modified_since: None,
        };
        assert_eq!(protocol.evaluate(&pre, &v), Evaluation::ShortCircuit);
        assert_eq!(
            protocol.evaluate(&pre, &v).response_class(),
            Some(ResponseClass::NotModified)
        );
    }

    #[test]
    fn test_mismatching_tag_proceeds() {
        let protocol = ConditionalProtocol::new();
        let v = validators_at(3, 1_700_000_000, 0);
        let pre = Preconditions {
            if_none_match: IfNoneMatch::parse("W/\"2\""),
            if_modified_since: None,
        };
        assert_eq!(protocol.evaluate(&pre, &v), Evaluation::Proceed);
    }

    #[test]
    fn test_if_modified_since_boundaries() {
        let protocol = ConditionalProtocol::new();
        let v = validators_at(1, 1_700_000_000, 900_000);

        let at = |secs| Preconditions {
            if_none_match: None,
            if_modified_since: Some(Utc.timestamp_opt(secs, 0).unwrap()),
        };
        // Sub-second part of the stored instant is ignored.
        assert_eq!(protocol.evaluate(&at(1_700_000_000), &v), Evaluation::ShortCircuit);
        assert_eq!(protocol.evaluate(&at(1_700_000_100), &v), Evaluation::ShortCircuit);
        assert_eq!(protocol.evaluate(&at(1_699_999_999), &v), Evaluation::Proceed);
    }

    #[test]
    fn test_if_none_match_takes_priority() {
        let protocol = ConditionalProtocol::new();
        let v = validators_at(5, 1_700_000_000, 0);
        let pre = Preconditions {
            if_none_match: IfNoneMatch::parse("W/\"4\""),
            if_modified_since: Some(Utc.timestamp_opt(1_800_000_000, 0).unwrap()),
        };
        assert_eq!(protocol.evaluate(&pre, &v), Evaluation::Proceed);
    }

    #[test]
    fn test_no_preconditions_proceed() {
        let protocol = ConditionalProtocol::new();
        let pre = Preconditions::default();
        assert!(pre.is_empty());
        assert_eq!(
            protocol.evaluate(&pre, &validators_at(1, 1_700_000_000, 0)),
            Evaluation::Proceed
        );
    }

    #[test]
    fn test_http_date_round_trip() {
        let parsed = parse_http_date("Tue, 14 Nov 2023 22:13:20 GMT").unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
        assert_eq!(format_http_date(parsed), "Tue, 14 Nov 2023 22:13:20 GMT");
        assert!(parse_http_date("yesterday").is_none());
    }
}

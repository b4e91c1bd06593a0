//! Bundle response building.
//!
//! Only history bundles are produced: one entry per version, newest first,
//! with tombstones rendered as `DELETE` requests without a resource.

use quill_persistence::conditional::ConditionalProtocol;
use quill_persistence::types::ResourceVersion;
use serde_json::Value;

use super::format::{format_instant, resource_body};

/// Bundle types produced by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleType {
    /// History results bundle.
    History,
}

impl BundleType {
    /// Returns the code string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleType::History => "history",
        }
    }
}

/// A link in a Bundle.
#[derive(Debug, Clone)]
pub struct BundleLink {
    /// The relation type.
    pub relation: String,
    /// The URL.
    pub url: String,
}

impl BundleLink {
    /// Creates a self link.
    pub fn self_link(url: impl Into<String>) -> Self {
        Self {
            relation: "self".to_string(),
            url: url.into(),
        }
    }

    /// Converts to JSON.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "relation": self.relation,
            "url": self.url
        })
    }
}

/// Request information in a history entry: the write that produced the version.
#[derive(Debug, Clone)]
pub struct BundleEntryRequest {
    /// HTTP method.
    pub method: &'static str,
    /// URL, relative to the base.
    pub url: String,
}

/// Response information in a history entry.
#[derive(Debug, Clone)]
pub struct BundleEntryResponse {
    /// HTTP status line.
    pub status: &'static str,
    /// ETag of the version.
    pub etag: String,
    /// Publication instant of the version.
    pub last_modified: String,
}

/// An entry in a Bundle.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Full URL of the resource.
    pub full_url: String,
    /// The resource itself, absent for tombstones.
    pub resource: Option<Value>,
    /// The write that produced this version.
    pub request: BundleEntryRequest,
    /// The outcome of that write.
    pub response: BundleEntryResponse,
}

impl BundleEntry {
    /// Creates the history entry for one version.
    ///
    /// `revived` is true when the version follows a tombstone.
    ///
    /// The log does not record whether version 1 came from a POST or from a
    /// PUT upsert, so version 1 always renders as `POST [type]` / `201 Created`.
    pub fn for_version(base_url: &str, version: &ResourceVersion, revived: bool) -> Self {
        let instance = format!("{}/{}", version.resource_type(), version.resource_id());
        let (method, status, url) = if version.is_tombstone() {
            ("DELETE", "204 No Content", instance.clone())
        } else if version.version() == 1 {
            ("POST", "201 Created", version.resource_type().to_string())
        } else if revived {
            ("PUT", "201 Created", instance.clone())
        } else {
            ("PUT", "200 OK", instance.clone())
        };

        let validators = ConditionalProtocol::new().compute_validators(&version.meta());

        Self {
            full_url: format!("{}/{}", base_url, instance),
            resource: (!version.is_tombstone()).then(|| resource_body(version)),
            request: BundleEntryRequest { method, url },
            response: BundleEntryResponse {
                status,
                etag: validators.etag.to_string(),
                last_modified: format_instant(version.published_at()),
            },
        }
    }

    /// Converts to JSON.
    pub fn to_json(&self) -> Value {
        let mut entry = serde_json::json!({
            "fullUrl": self.full_url,
            "request": {
                "method": self.request.method,
                "url": self.request.url
            },
            "response": {
                "status": self.response.status,
                "etag": self.response.etag,
                "lastModified": self.response.last_modified
            }
        });

        if let Some(resource) = &self.resource {
            entry["resource"] = resource.clone();
        }

        entry
    }
}

/// Builder for Bundle resources.
#[derive(Debug)]
pub struct BundleBuilder {
    bundle_type: BundleType,
    total: Option<usize>,
    links: Vec<BundleLink>,
    entries: Vec<BundleEntry>,
    timestamp: Option<String>,
}

impl BundleBuilder {
    /// Creates a new builder for a specific bundle type.
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            bundle_type,
            total: None,
            links: Vec::new(),
            entries: Vec::new(),
            timestamp: None,
        }
    }

    /// Creates a history bundle builder.
    pub fn history() -> Self {
        Self::new(BundleType::History)
    }

    /// Sets the total count.
    pub fn total(mut self, count: usize) -> Self {
        self.total = Some(count);
        self
    }

    /// Adds a self link.
    pub fn self_link(mut self, url: impl Into<String>) -> Self {
        self.links.push(BundleLink::self_link(url));
        self
    }

    /// Adds an entry.
    pub fn add_entry(mut self, entry: BundleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sets the timestamp.
    pub fn timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    /// Builds the Bundle resource.
    pub fn build(self) -> Value {
        let mut bundle = serde_json::json!({
            "resourceType": "Bundle",
            "type": self.bundle_type.as_str()
        });

        if let Some(total) = self.total {
            bundle["total"] = serde_json::json!(total);
        }

        if !self.links.is_empty() {
            bundle["link"] =
                serde_json::json!(self.links.iter().map(|l| l.to_json()).collect::<Vec<_>>());
        }

        bundle["entry"] =
            serde_json::json!(self.entries.iter().map(|e| e.to_json()).collect::<Vec<_>>());

        if let Some(ts) = self.timestamp {
            bundle["timestamp"] = serde_json::json!(ts);
        }

        bundle
    }
}

/// Builds the history bundle of one resource.
///
/// `versions` must be ordered oldest first, as the log lists them; the
/// bundle lists them newest first.
pub fn history_bundle(base_url: &str, self_url: &str, versions: &[ResourceVersion]) -> Value {
    let mut entries: Vec<BundleEntry> = versions
        .iter()
        .enumerate()
        .map(|(index, version)| {
            let revived = index > 0 && versions[index - 1].is_tombstone();
            BundleEntry::for_version(base_url, version, revived)
        })
        .collect();
    entries.reverse();

    entries
        .into_iter()
        .fold(
            BundleBuilder::history()
                .total(versions.len())
                .self_link(self_url)
                .timestamp(format_instant(chrono::Utc::now())),
            BundleBuilder::add_entry,
        )
        .build()
}

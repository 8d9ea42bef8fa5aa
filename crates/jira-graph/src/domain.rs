//! Issue records as returned by the tracker's search API.
//!
//! Only the fields needed to build a link graph are modelled. Every member of
//! `fields` is optional on the wire, so the accessors fall back to empty values
//! instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Avatar size preferred when picking a node icon.
pub const PREFERRED_ICON_SIZE: &str = "32x32";

/// A tracked work item.
///
/// Issues are immutable once fetched: the store never replaces an entry, so
/// the record seen by the graph builder is the first one the tracker returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable numeric identifier, used for store keys and graph node ids.
    pub id: String,
    /// Human-facing key such as `PROJ-42`.
    #[serde(default)]
    pub key: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Fields>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuetype: Option<IssueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuelinks: Option<Vec<IssueLink>>,
}

/// Owning project. Only its avatars matter here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Size label (`16x16`, `32x32`, ...) to avatar URL.
    #[serde(default)]
    pub avatar_urls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
}

/// Type of a link, e.g. `Blocks` with `is blocked by` / `blocks` phrasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outward: Option<String>,
}

/// Directional relationship between the owning issue and another issue.
///
/// The tracker fills exactly one of `inward_issue` / `outward_issue`, but both
/// are optional so a partially populated record never fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inward_issue: Option<IssueRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outward_issue: Option<IssueRef>,
}

/// Partial issue embedded in a link. Only the id is relied upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl IssueRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: None,
        }
    }
}

impl Issue {
    /// Create an issue with a summary and status and no links.
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        summary: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            self_url: None,
            fields: Some(Fields {
                summary: Some(summary.into()),
                status: Some(Status {
                    name: status.into(),
                }),
                ..Fields::default()
            }),
        }
    }

    /// Attach a project carrying the given avatar map.
    pub fn with_project<I, K, V>(mut self, key: &str, avatars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.fields_mut().project = Some(Project {
            key: Some(key.to_string()),
            avatar_urls: avatars
                .into_iter()
                .map(|(size, url)| (size.into(), url.into()))
                .collect(),
        });
        self
    }

    /// Add a link whose other end points at this issue (`other -> self`).
    pub fn with_inward_link(mut self, other_id: impl Into<String>) -> Self {
        self.push_link(IssueLink {
            inward_issue: Some(IssueRef::new(other_id)),
            ..IssueLink::default()
        });
        self
    }

    /// Add a link from this issue to another (`self -> other`).
    pub fn with_outward_link(mut self, other_id: impl Into<String>) -> Self {
        self.push_link(IssueLink {
            outward_issue: Some(IssueRef::new(other_id)),
            ..IssueLink::default()
        });
        self
    }

    fn fields_mut(&mut self) -> &mut Fields {
        self.fields.get_or_insert_with(Fields::default)
    }

    fn push_link(&mut self, link: IssueLink) {
        self.fields_mut()
            .issuelinks
            .get_or_insert_with(Vec::new)
            .push(link);
    }

    pub fn summary(&self) -> &str {
        self.fields
            .as_ref()
            .and_then(|f| f.summary.as_deref())
            .unwrap_or("")
    }

    pub fn status_name(&self) -> Option<&str> {
        self.fields
            .as_ref()
            .and_then(|f| f.status.as_ref())
            .map(|s| s.name.as_str())
    }

    pub fn project(&self) -> Option<&Project> {
        self.fields.as_ref().and_then(|f| f.project.as_ref())
    }

    /// Link records, empty when the tracker omitted the collection.
    pub fn links(&self) -> &[IssueLink] {
        self.fields
            .as_ref()
            .and_then(|f| f.issuelinks.as_deref())
            .unwrap_or(&[])
    }

    /// Ids of every issue referenced by a link, inward and outward alike.
    pub fn link_targets(&self) -> impl Iterator<Item = &str> + '_ {
        self.links().iter().flat_map(|link| {
            link.inward_issue
                .iter()
                .chain(link.outward_issue.iter())
                .map(|r| r.id.as_str())
        })
    }

    /// Icon reference used to deduplicate icon fetches.
    ///
    /// Prefers the 32x32 avatar, then the first available size. The empty
    /// string means "no icon".
    pub fn icon_reference(&self) -> &str {
        let Some(project) = self.project() else {
            return "";
        };
        project
            .avatar_urls
            .get(PREFERRED_ICON_SIZE)
            .or_else(|| project.avatar_urls.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Browser URL of this issue on the tracker.
    pub fn browse_url(&self, base_url: &str) -> String {
        format!("{}/browse/{}", base_url.trim_end_matches('/'), self.key)
    }
}

/// One page of a search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub issues: Option<Vec<Issue>>,
}

impl SearchPage {
    /// Offset of the page that follows this one.
    pub fn next_start_at(&self) -> u64 {
        self.start_at.saturating_add(self.max_results)
    }

    pub fn has_more(&self) -> bool {
        self.total > self.next_start_at()
    }
}

/// Status names that disqualify an issue from the graph.
///
/// Matching is case-insensitive. Issues without a status are never admitted
/// since they cannot be classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionPolicy {
    statuses: BTreeSet<String>,
}

impl ExclusionPolicy {
    pub fn new<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            statuses: statuses
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn admits(&self, issue: &Issue) -> bool {
        match issue.status_name() {
            Some(status) => !self.statuses.contains(&status.to_lowercase()),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

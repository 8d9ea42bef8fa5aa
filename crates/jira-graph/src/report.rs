//! Report generation: seed search, link closure, icons, graph, rendering.
//!
//! Every stage that talks to the tracker is fatal on failure except icon
//! downloads, which degrade to "no icon". Nothing is rendered until the
//! closure is complete.

use crate::config::{OutputFormat, ReportSettings};
use crate::domain::ExclusionPolicy;
use crate::graph::{build_graph, GraphElements};
use crate::icons::{IconMap, IconResolver};
use crate::resolver::ClosureResolver;
use crate::tracker::IssueTracker;
use crate::visualization;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Resolved graph and bookkeeping of one run.
#[derive(Debug, Clone)]
pub struct Report {
    pub elements: GraphElements,
    /// Linked issue ids that were excluded or not visible.
    pub unresolved: BTreeSet<String>,
    /// Issues matched by the seed query.
    pub seeded: usize,
    /// Closure fetch passes.
    pub passes: usize,
    pub generated_at: DateTime<Utc>,
}

/// Document written by the `json` format.
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub title: &'a str,
    pub generated_at: DateTime<Utc>,
    pub base_url: &'a str,
    pub jql: &'a str,
    pub unresolved: &'a BTreeSet<String>,
    pub elements: &'a GraphElements,
}

/// Runs the report pipeline against a tracker.
pub struct ReportGenerator<'a, T: IssueTracker> {
    tracker: &'a T,
    settings: &'a ReportSettings,
}

impl<'a, T: IssueTracker> ReportGenerator<'a, T> {
    pub fn new(tracker: &'a T, settings: &'a ReportSettings) -> Self {
        Self { tracker, settings }
    }

    pub fn generate(&self) -> Result<Report> {
        let settings = self.settings;
        let policy = ExclusionPolicy::new(&settings.exclude_status);
        let resolver =
            ClosureResolver::new(self.tracker, &policy).with_batch_size(settings.batch_size);

        let mut store = resolver
            .seed(&settings.jql)
            .with_context(|| format!("Seed query failed for JQL '{}'", settings.jql))?;
        let seeded = store.len();

        let closure = resolver
            .resolve(&mut store)
            .context("Failed to resolve linked issues")?;

        let icons = if settings.fetch_icons {
            IconResolver::new(settings.icon_workers).resolve(self.tracker, store.all())
        } else {
            IconMap::new()
        };

        let elements = build_graph(&store, &icons, &settings.base_url);
        info!(
            nodes = elements.nodes.len(),
            edges = elements.edges.len(),
            linked = closure.fetched,
            "graph built"
        );

        Ok(Report {
            elements,
            unresolved: closure.unresolved,
            seeded,
            passes: closure.passes,
            generated_at: Utc::now(),
        })
    }

    /// Render `report` in the configured format.
    pub fn render(&self, report: &Report) -> Result<String> {
        let settings = self.settings;
        let rendered = match settings.format {
            OutputFormat::Html => visualization::export_html(&report.elements, &settings.title)
                .context("Failed to render HTML report")?,
            OutputFormat::Json => {
                let document = ReportDocument {
                    title: &settings.title,
                    generated_at: report.generated_at,
                    base_url: &settings.base_url,
                    jql: &settings.jql,
                    unresolved: &report.unresolved,
                    elements: &report.elements,
                };
                serde_json::to_string_pretty(&document).context("Failed to render JSON report")?
            }
            OutputFormat::Dot => visualization::export_dot(&report.elements),
            OutputFormat::Mermaid => visualization::export_mermaid(&report.elements),
        };
        Ok(rendered)
    }
}

//! Cluster report rendering
//!
//! Generates formatted output in various formats (Terminal, Markdown, JSON, CSV).

use chrono::{DateTime, Utc};

use crate::types::{Cluster, ClusterReport};

/// Sample messages longer than this are cut in terminal/markdown tables
const SAMPLE_WIDTH: usize = 120;

/// Output format for cluster reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact terminal output
    Terminal,
    /// Human-readable Markdown
    Markdown,
    /// Machine-readable JSON
    Json,
    /// Spreadsheet-compatible CSV, one row per cluster
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" | "term" | "console" => Ok(Self::Terminal),
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(anyhow::anyhow!("Unknown format: {}", s)),
        }
    }
}

/// Cluster report generator
pub struct Reporter {
    format: OutputFormat,
    show_members: bool,
    generated_at: DateTime<Utc>,
}

impl Reporter {
    /// Create a new reporter with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            show_members: false,
            generated_at: Utc::now(),
        }
    }

    /// List member test names under each cluster (terminal/markdown)
    pub fn with_members(mut self, show_members: bool) -> Self {
        self.show_members = show_members;
        self
    }

    /// Pin the report timestamp
    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// Render a full report
    pub fn render(&self, report: &ClusterReport) -> String {
        match self.format {
            OutputFormat::Terminal => self.render_terminal(report),
            OutputFormat::Markdown => self.render_markdown(report),
            OutputFormat::Json => self.render_json(report),
            OutputFormat::Csv => self.render_csv(report),
        }
    }

    // === Terminal ===

    fn render_terminal(&self, report: &ClusterReport) -> String {
        let mut output = String::new();
        let summary = &report.summary;

        output.push_str(&format!(
            "\n{} failures -> {} clusters (largest: {}, unclustered: {})\n",
            summary.total_failures,
            summary.unique_clusters,
            summary.largest_cluster,
            summary.unclustered
        ));

        if report.clusters.is_empty() {
            output.push_str("   No clusters on this page.\n");
            return output;
        }

        output.push_str(&format!(
            "   Showing {} from #{}\n\n",
            report.page.returned,
            report.page.skip + 1
        ));

        for (offset, cluster) in report.clusters.iter().enumerate() {
            output.push_str(&format!(
                "   #{:<3} {:>5} x {} [{}]\n",
                report.page.skip + offset + 1,
                cluster.count,
                cluster.error_category(),
                cluster.match_type
            ));
            output.push_str(&format!(
                "         {}\n",
                truncate(&cluster.sample_message, SAMPLE_WIDTH)
            ));
            if let Some(location) = &cluster.signature.source_location {
                output.push_str(&format!("         at {}\n", location));
            }
            if !cluster.topologies.is_empty() {
                output.push_str(&format!(
                    "         topologies: {}\n",
                    cluster.topologies.join(", ")
                ));
            }
            output.push_str(&format!("         priorities: {}\n", priorities(cluster)));

            if self.show_members {
                for name in cluster.member_names() {
                    output.push_str(&format!("           - {}\n", name));
                }
            }
        }

        output.push('\n');
        output
    }

    // === Markdown ===

    fn render_markdown(&self, report: &ClusterReport) -> String {
        let mut output = String::new();
        let summary = &report.summary;

        output.push_str("# Failure Clusters\n\n");
        output.push_str(&format!(
            "**Date:** {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        output.push_str("## Summary\n\n");
        output.push_str(&format!("- **Total Failures:** {}\n", summary.total_failures));
        output.push_str(&format!("- **Clusters:** {}\n", summary.unique_clusters));
        output.push_str(&format!("- **Largest Cluster:** {}\n", summary.largest_cluster));
        output.push_str(&format!("- **Unclustered:** {}\n\n", summary.unclustered));

        output.push_str("## Clusters\n\n");
        output.push_str("| # | Count | Category | Match | Topologies | Priorities | Sample |\n");
        output.push_str("|---|-------|----------|-------|------------|------------|--------|\n");

        for (offset, cluster) in report.clusters.iter().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | `{}` |\n",
                report.page.skip + offset + 1,
                cluster.count,
                cluster.error_category(),
                cluster.match_type,
                cluster.topologies.join(", "),
                priorities(cluster),
                truncate(&cluster.sample_message, SAMPLE_WIDTH)
                    .replace('|', "\\|")
                    .replace('`', "'")
            ));
        }

        if self.show_members {
            for (offset, cluster) in report.clusters.iter().enumerate() {
                output.push_str(&format!(
                    "\n### #{} {} ({})\n\n",
                    report.page.skip + offset + 1,
                    cluster.error_category(),
                    cluster.count
                ));
                for name in cluster.member_names() {
                    output.push_str(&format!("- {}\n", name));
                }
            }
        }

        output
    }

    // === JSON ===

    fn render_json(&self, report: &ClusterReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    // === CSV ===

    fn render_csv(&self, report: &ClusterReport) -> String {
        let mut output = String::new();
        output.push_str("rank,count,error_category,match_type,fingerprint,topologies,sample_message\n");

        for (offset, cluster) in report.clusters.iter().enumerate() {
            output.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                report.page.skip + offset + 1,
                cluster.count,
                cluster.error_category(),
                cluster.match_type,
                cluster.signature.fingerprint,
                csv_field(&cluster.topologies.join(";")),
                csv_field(&cluster.sample_message)
            ));
        }

        output
    }
}

fn priorities(cluster: &Cluster) -> String {
    cluster
        .priorities
        .iter()
        .map(|(priority, count)| format!("{}={}", priority, count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// First line only, cut to `max` characters
fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

//! Report shaping and emission.
//!
//! Classification runs concurrently, so findings arrive in no particular
//! order. Rows are sorted by source, edge type, target and isACL before
//! anything leaves the crate, making the same findings always produce the
//! same file.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::canonical::canonical_hash_hex;
use crate::findings::FindingsSet;
use crate::types::Crossing;

/// CSV header row.
pub const CSV_HEADER: &str = "Source, ConnectionType, Target, isACL";

/// One dangerous crossing as it appears in the report.
///
/// Field order is the sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportRow {
    /// Name of the node the edge starts at.
    pub source: String,
    /// Relationship type.
    pub edge_type: String,
    /// Name of the node the edge ends at.
    pub target: String,
    /// Whether the relationship comes from an ACL.
    pub is_acl: bool,
}

impl From<&Crossing> for ReportRow {
    fn from(crossing: &Crossing) -> Self {
        Self {
            source: crossing.start.name.clone(),
            edge_type: crossing.edge.edge_type.clone(),
            target: crossing.end.name.clone(),
            is_acl: crossing.edge.is_acl,
        }
    }
}

/// Output format for [`Report::write_to_dir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Comma-separated rows under [`CSV_HEADER`].
    #[default]
    Csv,
    /// Pretty-printed JSON document.
    Json,
}

impl ReportFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// File name for a report written at `timestamp` (unix seconds).
pub fn report_file_name(timestamp: i64, format: ReportFormat) -> String {
    format!("badConnections{}.{}", timestamp, format.extension())
}

/// Ordered set of dangerous crossings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    /// Build a report from crossings in any order.
    pub fn from_crossings<'a>(crossings: impl IntoIterator<Item = &'a Crossing>) -> Self {
        let mut rows: Vec<ReportRow> = crossings.into_iter().map(ReportRow::from).collect();
        rows.sort();
        Self { rows }
    }

    /// Build a report from the current contents of a findings set.
    pub fn from_findings(findings: &FindingsSet) -> Self {
        Self::from_crossings(&findings.snapshot())
    }

    /// Rows in report order.
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Number of dangerous crossings.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the report has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable hash of the ordered rows.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&self.rows)
    }

    /// Write the report as CSV.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{}", CSV_HEADER)?;
        for row in &self.rows {
            writeln!(
                writer,
                "{},{},{},{}",
                csv_field(&row.source),
                csv_field(&row.edge_type),
                csv_field(&row.target),
                row.is_acl
            )?;
        }
        writer.flush()
    }

    /// Render the report as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            dangerous_crossings: usize,
            fingerprint: String,
            rows: &'a [ReportRow],
        }

        serde_json::to_string_pretty(&JsonReport {
            dangerous_crossings: self.len(),
            fingerprint: self.fingerprint(),
            rows: &self.rows,
        })
    }

    /// Write the report into `dir` under [`report_file_name`].
    ///
    /// Returns the path written.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>, timestamp: i64, format: ReportFormat) -> io::Result<PathBuf> {
        let path = dir.as_ref().join(report_file_name(timestamp, format));
        let file = io::BufWriter::new(std::fs::File::create(&path)?);
        match format {
            ReportFormat::Csv => self.write_csv(file)?,
            ReportFormat::Json => {
                let json = self.to_json().map_err(io::Error::other)?;
                let mut file = file;
                file.write_all(json.as_bytes())?;
                file.write_all(b"\n")?;
                file.flush()?;
            }
        }
        Ok(path)
    }
}

/// Quote a field when it would otherwise break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

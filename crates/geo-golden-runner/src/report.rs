//! The run report: aggregate counts plus ordered per-test results.
//!
//! Written as `validation_report.json` and a self-contained
//! `validation_report.html` into the run directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use geo_golden_core::{Error, Result, TestResult, TestStatus};

use crate::filter::TestFilter;

/// JSON report file name.
pub const REPORT_JSON: &str = "validation_report.json";

/// HTML report file name.
pub const REPORT_HTML: &str = "validation_report.html";

/// Filters that were active for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilters {
    /// Selected names
    pub names: Vec<String>,
    /// Selected tags
    pub tags: Vec<String>,
}

impl From<&TestFilter> for ReportFilters {
    fn from(filter: &TestFilter) -> Self {
        Self {
            names: filter.names.clone(),
            tags: filter.tags.clone(),
        }
    }
}

/// Aggregated results of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Run start, RFC 3339
    pub started: String,
    /// Environment root
    pub environment: PathBuf,
    /// Active filters
    pub filters: ReportFilters,
    /// Definitions discovered in the environment
    pub total: usize,
    /// Definitions selected by the filters
    pub selected: usize,
    /// Tests with status SUCCESS
    pub success: usize,
    /// Tests with status ERROR
    pub error: usize,
    /// Tests with status FAILURE
    pub failure: usize,
    /// Per-test results, in execution order
    pub results: Vec<TestResult>,
}

impl RunReport {
    /// Build a report, deriving the status counts from `results`.
    pub fn new(
        started: String,
        environment: PathBuf,
        filter: &TestFilter,
        total: usize,
        results: Vec<TestResult>,
    ) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status() == status).count();
        Self {
            started,
            environment,
            filters: filter.into(),
            total,
            selected: results.len(),
            success: count(TestStatus::Success),
            error: count(TestStatus::Error),
            failure: count(TestStatus::Failure),
            results,
        }
    }

    /// Whether every selected test succeeded.
    pub fn all_passed(&self) -> bool {
        self.success == self.selected
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} tests selected: {} succeeded, {} with errors, {} failed",
            self.selected, self.total, self.success, self.error, self.failure
        )
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Self-contained HTML page.
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str("<title>Validation Report</title>\n");
        html.push_str("<style>\n");
        html.push_str("body { font-family: sans-serif; margin: 20px; }\n");
        html.push_str(".SUCCESS { background-color: #d4edda; }\n");
        html.push_str(".ERROR { background-color: #fff3cd; }\n");
        html.push_str(".FAILURE { background-color: #f8d7da; }\n");
        html.push_str(".section { margin: 20px 0; padding: 10px; border: 1px solid #ddd; }\n");
        html.push_str("table { border-collapse: collapse; width: 100%; }\n");
        html.push_str("th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n");
        html.push_str("th { background-color: #f5f5f5; }\n");
        html.push_str("pre { white-space: pre-wrap; margin: 0; }\n");
        html.push_str("</style>\n</head>\n<body>\n");

        html.push_str("<h1>Validation Report</h1>\n");
        html.push_str(&format!(
            "<p><strong>Started:</strong> {}<br><strong>Environment:</strong> {}</p>\n",
            escape(&self.started),
            escape(&self.environment.display().to_string())
        ));

        html.push_str("<div class=\"section\">\n<h2>Summary</h2>\n<table>\n");
        for (label, value) in [
            ("Discovered", self.total),
            ("Selected", self.selected),
            ("Success", self.success),
            ("Error", self.error),
            ("Failure", self.failure),
        ] {
            html.push_str(&format!("<tr><td>{label}</td><td>{value}</td></tr>\n"));
        }
        html.push_str("</table>\n</div>\n");

        html.push_str("<div class=\"section\">\n<h2>Tests</h2>\n<table>\n");
        html.push_str(
            "<tr><th>Test</th><th>Status</th><th>Duration</th><th>Product</th><th>Details</th></tr>\n",
        );
        for result in &self.results {
            html.push_str(&result_row(result));
        }
        html.push_str("</table>\n</div>\n");

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Write both report files into `dir`.
    ///
    /// Any I/O failure is a reporting error; the report itself is untouched.
    pub fn write(&self, dir: &Path) -> Result<ReportFiles> {
        let json = dir.join(REPORT_JSON);
        let html = dir.join(REPORT_HTML);

        let content = self.to_json().map_err(|e| Error::Report(e.to_string()))?;
        std::fs::write(&json, content)
            .map_err(|e| Error::Report(format!("{}: {e}", json.display())))?;
        std::fs::write(&html, self.to_html())
            .map_err(|e| Error::Report(format!("{}: {e}", html.display())))?;

        Ok(ReportFiles { json, html })
    }
}

/// Locations of the written report files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    /// JSON report
    pub json: PathBuf,
    /// HTML report
    pub html: PathBuf,
}

fn result_row(result: &TestResult) -> String {
    let status = result.status();
    let name = match &result.description {
        Some(description) => format!(
            "{}<br><small>{}</small>",
            escape(&result.test_name),
            escape(description)
        ),
        None => escape(&result.test_name),
    };
    let product = result
        .target_path
        .as_ref()
        .map(|p| escape(&p.display().to_string()))
        .unwrap_or_else(|| "-".to_string());

    let details = if let Some(exception) = &result.exception {
        format!("<pre>{}</pre>", escape(exception))
    } else if result.violations.is_empty() {
        String::new()
    } else {
        let items: String = result
            .violations
            .iter()
            .map(|v| format!("<li>{}</li>", escape(&v.to_string())))
            .collect();
        format!("<ul>{items}</ul>")
    };

    format!(
        "<tr class=\"{status}\"><td>{name}</td><td>{status}</td><td>{} ms</td><td>{product}</td><td>{details}</td></tr>\n",
        result.duration.as_millis()
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_golden_core::{Violation, ViolationKind};
    use std::time::Duration;

    fn report() -> RunReport {
        let ok = TestResult::new("alpha", Some("subset of MERIS".to_string()));

        let mut mismatch = TestResult::new("beta", None);
        mismatch.duration = Duration::from_millis(1500);
        mismatch.target_path = Some(PathBuf::from("/env/results/x/products/beta.dim"));
        mismatch.record_violations(vec![Violation::mismatch(
            ViolationKind::Name,
            "dataset name differs",
            "'<a>'",
            "'b'",
        )]);

        let mut failed = TestResult::new("gamma", None);
        failed.record_exception(&Error::Execution("exit status 1".to_string()));

        RunReport::new(
            "2024-03-01T10:00:00+00:00".to_string(),
            PathBuf::from("/env"),
            &TestFilter::from_lists(None, Some("ABC")),
            7,
            vec![ok, mismatch, failed],
        )
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(
            (report.total, report.selected, report.success, report.error, report.failure),
            (7, 3, 1, 1, 1)
        );
        assert!(!report.all_passed());
        assert_eq!(
            report.summary(),
            "3 of 7 tests selected: 1 succeeded, 1 with errors, 1 failed"
        );
    }

    #[test]
    fn test_json_contract() {
        let value: serde_json::Value = serde_json::from_str(&report().to_json().unwrap()).unwrap();
        assert_eq!(value["selected"], 3);
        assert_eq!(value["filters"]["tags"][0], "ABC");

        let results = value["results"].as_array().unwrap();
        assert_eq!(results[0]["testName"], "alpha");
        assert_eq!(results[0]["status"], "SUCCESS");
        assert!(results[0]["targetPath"].is_null());
        assert_eq!(results[1]["status"], "ERROR");
        assert_eq!(results[1]["durationMs"], 1500);
        assert_eq!(results[1]["violations"][0]["kind"], "name");
        assert_eq!(results[2]["status"], "FAILURE");
        assert_eq!(results[2]["exception"], "Execution failed: exit status 1");
    }

    #[test]
    fn test_html_escapes_and_lists() {
        let html = report().to_html();
        assert!(html.contains("Validation Report"));
        assert!(html.contains("<tr class=\"ERROR\">"));
        assert!(html.contains("&#39;&lt;a&gt;&#39;"));
        assert!(html.contains("Execution failed: exit status 1"));
        assert!(!html.contains("'<a>'"));
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = report().write(dir.path()).unwrap();
        assert!(files.json.is_file());
        assert!(files.html.is_file());

        let back: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert_eq!(back.results.len(), 3);
        assert_eq!(back.results[2].status(), TestStatus::Failure);
    }

    #[test]
    fn test_write_failure_is_report_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does/not/exist");
        assert!(matches!(report().write(&missing), Err(Error::Report(_))));
    }
}

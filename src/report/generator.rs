//! HTML report generation.
//!
//! This module renders the aggregated daily steps into a self-contained
//! HTML page: a summary block followed by a table of every date, most
//! recent first.

use crate::models::ReportSummary;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;

/// Marker shown instead of a value when a date has too few participants.
pub const INSUFFICIENT_DATA: &str = "Not enough participants";

/// Rendering options for the HTML report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Page title and heading.
    pub title: String,
    /// Participants needed before a date's value is shown.
    pub min_participants: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "Daily Steps Report".to_string(),
            min_participants: 2,
        }
    }
}

impl From<&crate::config::ReportConfig> for ReportOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            title: config.title.clone(),
            min_participants: config.min_participants,
        }
    }
}

/// Compute the headline statistics.
///
/// A date is valid once it has at least `min_participants` participants.
pub fn summarize(
    values: &BTreeMap<String, f64>,
    participants: &BTreeMap<String, u32>,
    min_participants: u32,
) -> ReportSummary {
    let valid_counts: Vec<u32> = values
        .keys()
        .map(|date| participants.get(date).copied().unwrap_or(0))
        .filter(|count| *count >= min_participants)
        .collect();

    let average_participants = if valid_counts.is_empty() {
        0.0
    } else {
        let total: u64 = valid_counts.iter().map(|c| u64::from(*c)).sum();
        total as f64 / valid_counts.len() as f64
    };

    ReportSummary {
        valid_dates: valid_counts.len(),
        average_participants,
        total_dates: values.len(),
    }
}

/// Generate the complete HTML report.
pub fn generate_html_report(
    values: &BTreeMap<String, f64>,
    participants: &BTreeMap<String, u32>,
    options: &ReportOptions,
    generated_at: DateTime<Utc>,
) -> String {
    let summary = summarize(values, participants, options.min_participants);
    let title = escape_html(&options.title);

    let mut html = String::new();

    html.push_str(&generate_head(&title));
    html.push_str("<body>\n    <div class=\"container\">\n");
    html.push_str(&format!("        <h1>{}</h1>\n", title));
    html.push_str(&generate_summary_section(&summary));
    html.push_str(&generate_table(values, participants, options.min_participants));
    html.push_str(&format!(
        "        <p class=\"footer\">Generated {}</p>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("    </div>\n</body>\n</html>\n");

    html
}

fn generate_head(title: &str) -> String {
    let mut head = String::new();

    head.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    head.push_str("    <meta charset=\"UTF-8\">\n");
    head.push_str(&format!("    <title>{}</title>\n", title));
    head.push_str(
        r#"    <style>
        body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
        .container { max-width: 800px; margin: 0 auto; }
        .stats-box { background-color: #f5f5f5; padding: 20px; border-radius: 5px; margin-bottom: 20px; }
        .table-container { max-height: 600px; overflow-y: auto; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        thead { position: sticky; top: 0; z-index: 1; }
        th, td { padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background-color: #4CAF50; color: white; }
        tr:nth-child(even) { background-color: #f2f2f2; }
        .insufficient-data { color: #999; font-style: italic; }
        .footer { color: #999; font-size: 0.8em; margin-top: 20px; }
    </style>
"#,
    );
    head.push_str("</head>\n");

    head
}

fn generate_summary_section(summary: &ReportSummary) -> String {
    let mut section = String::new();

    section.push_str("        <div class=\"stats-box\">\n");
    section.push_str("            <h2>Overview</h2>\n");
    section.push_str(&format!(
        "            <p>Total number of unique dates: {}</p>\n",
        summary.valid_dates
    ));
    section.push_str(&format!(
        "            <p>Average number of participants per day: {:.1}</p>\n",
        summary.average_participants
    ));
    section.push_str("        </div>\n");

    section
}

fn generate_table(
    values: &BTreeMap<String, f64>,
    participants: &BTreeMap<String, u32>,
    min_participants: u32,
) -> String {
    let mut table = String::new();

    table.push_str("        <div class=\"table-container\">\n");
    table.push_str("            <table>\n");
    table.push_str("                <thead>\n");
    table.push_str("                    <tr><th>Date</th><th>Average Steps</th><th>Number of Participants</th></tr>\n");
    table.push_str("                </thead>\n");
    table.push_str("                <tbody>\n");

    for (date, value) in values.iter().rev() {
        let count = participants.get(date).copied().unwrap_or(0);
        let steps = if count < min_participants {
            format!("<span class=\"insufficient-data\">{}</span>", INSUFFICIENT_DATA)
        } else {
            format_thousands(*value)
        };

        table.push_str(&format!(
            "                    <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&format_date(date)),
            steps,
            count
        ));
    }

    table.push_str("                </tbody>\n");
    table.push_str("            </table>\n");
    table.push_str("        </div>\n");

    table
}

/// Format a date key as `YYYY-MM-DD`.
///
/// Keys that are not an ISO date or datetime are returned unchanged.
pub fn format_date(key: &str) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(key, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(key) {
        return dt.format("%Y-%m-%d").to_string();
    }
    key.to_string()
}

/// Round to a whole number and group digits with commas.
pub fn format_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    // inf / NaN
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return rounded;
    }

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

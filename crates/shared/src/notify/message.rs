//! Subject and HTML body of the summary emails

use chrono::NaiveDate;

use super::backend::ReportNotice;
use crate::models::RegionId;

pub fn subject(region: RegionId, is_test: bool) -> String {
    let subject = format!("Hangar Projects Report - {}", region.display_name());
    if is_test {
        format!("[Test] {}", subject)
    } else {
        subject
    }
}

pub fn report_body(notice: &ReportNotice) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        "<h2>Hangar Projects Weekly Report - {}</h2>\n",
        escape_html(notice.region.display_name())
    ));
    html.push_str(&format!("<p>Date: {}</p>\n", format_date(notice.date)));
    html.push_str(&format!("<p>New articles found: {}</p>\n", notice.new_count));
    html.push_str(&format!(
        "<p>Total projects in report: {}</p>\n",
        notice.total_rows
    ));

    if !notice.headlines.is_empty() {
        html.push_str("<ul>\n");
        for (title, url) in &notice.headlines {
            html.push_str(&format!(
                "  <li><a href=\"{}\">{}</a></li>\n",
                escape_html(url),
                escape_html(title)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("<p>Please find the attached report.</p>\n");
    html
}

pub fn no_updates_body(region: RegionId, date: NaiveDate) -> String {
    format!(
        "<h2>Hangar Projects Weekly Report - {}</h2>\n<p>Date: {}</p>\n<p>No new articles were found this week.</p>\n",
        escape_html(region.display_name()),
        format_date(date)
    )
}

fn format_date(date: NaiveDate) -> String {
    // "October 19, 2026"
    date.format("%B %d, %Y").to_string()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

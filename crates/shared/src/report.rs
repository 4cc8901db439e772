//! Per-region CSV report files
//!
//! Each region owns one CSV file that only ever grows. Existing bytes are
//! carried over verbatim on every append, and the new file replaces the old
//! one through a rename so a crash mid-write leaves the previous report
//! intact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::dedupe::StoredHistory;
use crate::error::{Result, ScoutError};
use crate::models::{Article, RegionConfig};

pub const COLUMNS: [&str; 7] = [
    "Project Title",
    "Source URL",
    "Summary",
    "Country/Region",
    "Language",
    "Date Published",
    "Week Collected",
];

const URL_COLUMN: usize = 1;
const WEEK_COLUMN: usize = 6;
const DATE_FORMAT: &str = "%Y-%m-%d";
/// Spreadsheet applications cap formula string literals at 255 characters
const MAX_HYPERLINK_LEN: usize = 255;
/// Leading characters that make a spreadsheet treat a cell as a formula
const FORMULA_TRIGGERS: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

#[derive(Debug, Clone)]
pub struct ReportFileInfo {
    pub exists: bool,
    pub path: PathBuf,
    pub size: u64,
    pub last_modified: Option<DateTime<Local>>,
    pub row_count: usize,
}

pub struct ReportStore;

impl ReportStore {
    /// Read the URLs and collection weeks already stored for a region. A
    /// missing file is an empty history.
    pub fn load_history(region: &RegionConfig) -> Result<StoredHistory> {
        let path = &region.output_path;
        let mut history = StoredHistory::new();

        let Some(content) = Self::read_existing(path)? else {
            debug!(path = %path.display(), "No report yet, starting with empty history");
            return Ok(history);
        };

        for row in Self::data_rows(path, &content)? {
            let url = row
                .get(URL_COLUMN)
                .map(|cell| Self::url_from_cell(cell))
                .unwrap_or_default();
            let week = row
                .get(WEEK_COLUMN)
                .and_then(|cell| NaiveDate::parse_from_str(cell.trim(), DATE_FORMAT).ok());
            history.record(&url, week);
        }

        debug!(
            path = %path.display(),
            urls = history.len(),
            rows = history.row_count(),
            "Loaded stored history"
        );
        Ok(history)
    }

    /// Append `articles` below the existing rows and return the report path.
    /// No uniqueness check happens here; callers dedupe first.
    pub fn append(region: &RegionConfig, articles: &[Article]) -> Result<PathBuf> {
        let path = &region.output_path;

        let existing = match Self::read_existing(path)? {
            Some(mut existing) => {
                Self::data_rows(path, &existing)?;
                if !existing.ends_with('\n') {
                    existing.push('\n');
                }
                Some(existing)
            }
            None => None,
        };

        Self::write_atomic(path, existing.as_deref(), articles)?;

        info!(
            region = %region.region_id,
            path = %path.display(),
            appended = articles.len(),
            "Updated report"
        );
        Ok(path.clone())
    }

    pub fn file_info(region: &RegionConfig) -> Result<ReportFileInfo> {
        let path = &region.output_path;

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(ReportFileInfo {
                    exists: false,
                    path: path.clone(),
                    size: 0,
                    last_modified: None,
                    row_count: 0,
                });
            }
            Err(e) => return Err(ScoutError::storage(path, e)),
        };

        let history = Self::load_history(region)?;

        Ok(ReportFileInfo {
            exists: true,
            path: path.clone(),
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Local>::from),
            row_count: history.row_count(),
        })
    }

    fn read_existing(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ScoutError::storage(path, e)),
        }
    }

    /// Parse `content`, check the header and return the data rows
    fn data_rows(path: &Path, content: &str) -> Result<Vec<StringRecord>> {
        let malformed = |message: String| ScoutError::MalformedReport {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(content.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| malformed(e.to_string()))?
            .iter()
            .map(|cell| cell.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        if header != COLUMNS {
            return Err(malformed(format!(
                "unexpected header {:?}, expected {:?}",
                header, COLUMNS
            )));
        }

        reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| malformed(e.to_string()))
    }

    fn write_atomic(path: &Path, existing: Option<&str>, articles: &[Article]) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&dir).map_err(|e| ScoutError::storage(&dir, e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| ScoutError::storage(&dir, e))?;
        let tmp_path = tmp.path().to_path_buf();
        Self::write_rows(&mut tmp, existing, articles)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ScoutError::storage(&tmp_path, e))?;
        tmp.persist(path)
            .map_err(|e| ScoutError::storage(path, e.error))?;

        Ok(())
    }

    /// Copy `existing` through untouched, then write the new rows. A new file
    /// (`existing` is `None`) gets the header first.
    fn write_rows<W: Write>(out: &mut W, existing: Option<&str>, articles: &[Article]) -> io::Result<()> {
        if let Some(existing) = existing {
            out.write_all(existing.as_bytes())?;
        }

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);

        if existing.is_none() {
            writer.write_record(COLUMNS)?;
        }
        for article in articles {
            writer.write_record(Self::format_row(article))?;
        }
        writer.flush()?;

        Ok(())
    }

    fn format_row(article: &Article) -> [String; 7] {
        let published = article
            .published_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();

        [
            Self::text_cell(&article.title),
            Self::hyperlink_cell(&article.url),
            Self::text_cell(article.summary.as_deref().unwrap_or("")),
            article.country_or_region.clone(),
            article.language.clone(),
            published,
            article.collected_week.format(DATE_FORMAT).to_string(),
        ]
    }

    /// Free text that a spreadsheet would evaluate as a formula gets a
    /// leading apostrophe so it renders as typed.
    fn text_cell(text: &str) -> String {
        if text.starts_with(&FORMULA_TRIGGERS[..]) {
            format!("'{}", text)
        } else {
            text.to_string()
        }
    }

    /// Render a URL as a clickable link. Links too long for a formula are
    /// written bare.
    fn hyperlink_cell(url: &str) -> String {
        if url.len() > MAX_HYPERLINK_LEN {
            return url.to_string();
        }
        let quoted = url.replace('"', "\"\"");
        format!("=HYPERLINK(\"{}\",\"{}\")", quoted, quoted)
    }

    /// Recover the URL from a hyperlink formula or a bare cell
    fn url_from_cell(cell: &str) -> String {
        let cell = cell.trim();
        let Some(rest) = cell.strip_prefix("=HYPERLINK(\"") else {
            return cell.to_string();
        };

        let mut url = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    url.push('"');
                    chars.next();
                    continue;
                }
                break;
            }
            url.push(c);
        }
        url
    }
}

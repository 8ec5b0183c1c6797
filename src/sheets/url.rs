// src/sheets/url.rs
use crate::utils::error::SheetError;
use once_cell::sync::Lazy;
use regex::Regex;

const GOOGLE_SHEETS_HOST: &str = "docs.google.com/spreadsheets";

// Trailing viewer/editor path of a shared sheet link, e.g. `/edit#gid=0`
static EDIT_OR_VIEW_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(?:edit|view)(?:[/?#].*)?$").expect("Failed to compile EDIT_OR_VIEW_SUFFIX_RE")
});

// Published-to-web HTML link, e.g. `/pubhtml?gid=0&single=true`
static PUBHTML_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/pubhtml(?:[/?#].*)?$").expect("Failed to compile PUBHTML_SUFFIX_RE")
});

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Rewrites a Google Sheets share link into a direct download link for `format`.
pub fn clean_sheet_url(sheet_url: &str, format: ExportFormat) -> Result<String, SheetError> {
    let sheet_url = sheet_url.trim();
    if sheet_url.is_empty() {
        return Err(SheetError::InvalidUrl("spreadsheet url missing".to_string()));
    }
    if !sheet_url.contains(GOOGLE_SHEETS_HOST) {
        return Err(SheetError::InvalidUrl(format!("spreadsheet url malformed: {}", sheet_url)));
    }

    let fmt = format.as_str();
    let export = format!("/export?format={}", fmt);
    let publish = format!("/pub?output={}", fmt);

    if sheet_url.contains(&export[1..]) || sheet_url.contains(&publish[1..]) {
        tracing::debug!("sheet_url formed correctly for {}", fmt);
        return Ok(sheet_url.to_string());
    }
    if EDIT_OR_VIEW_SUFFIX_RE.is_match(sheet_url) {
        tracing::debug!("sheet_url edit/view rewritten to export?format={}", fmt);
        return Ok(EDIT_OR_VIEW_SUFFIX_RE.replace(sheet_url, export.as_str()).into_owned());
    }
    if PUBHTML_SUFFIX_RE.is_match(sheet_url) {
        tracing::debug!("sheet_url pubhtml rewritten to pub?output={}", fmt);
        return Ok(PUBHTML_SUFFIX_RE.replace(sheet_url, publish.as_str()).into_owned());
    }

    tracing::warn!("sheet_url has no recognised suffix, using it unchanged");
    Ok(sheet_url.to_string())
}

//! SVG template substitution.
//!
//! The template is treated as opaque text. Two fixed tokens are replaced literally wherever they
//! appear; every other substitution targets a placeholder element whose entire text content is a
//! mapping key (`<text>JOY_B1</text>`, surrounding whitespace and case ignored).

use crate::error::{Error, Result};
use crate::mapping::MappingTable;
use crate::sanitize::sanitize_value;
use chrono::NaiveDate;
use regex::{NoExpand, Regex, RegexBuilder};
use std::path::Path;

pub const TEMPLATE_NAME_TOKEN: &str = "TEMPLATE_NAME";
pub const CURRENT_DATE_TOKEN: &str = "CURRENT_DATE";
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Overrides the date written for `CURRENT_DATE`. When `None`, the current local date is
    /// used.
    pub today: Option<NaiveDate>,
}

impl RenderOptions {
    pub fn with_fixed_today(mut self, today: Option<NaiveDate>) -> Self {
        self.today = today;
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// What a render pass did with the mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Keys that matched at least one placeholder, in processing order.
    pub substituted: Vec<String>,
    /// Keys with no placeholder in the template, in processing order.
    pub missing: Vec<String>,
}

impl RenderReport {
    pub fn replacements(&self) -> usize {
        self.substituted.len()
    }
}

#[derive(Debug, Clone)]
pub struct SvgTemplate {
    raw: String,
}

impl SvgTemplate {
    pub fn from_text(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::from_read(path, e))?;
        Ok(Self { raw })
    }

    pub fn text(&self) -> &str {
        &self.raw
    }

    pub fn into_text(self) -> String {
        self.raw
    }

    /// Fills the template in place. See [`render`].
    pub fn replace_fields(
        &mut self,
        mappings: &MappingTable,
        source_document: &Path,
        options: &RenderOptions,
    ) -> RenderReport {
        let (text, report) = render(&self.raw, mappings, source_document, options);
        self.raw = text;
        report
    }
}

/// Base filename of the source document with its extension stripped.
pub fn template_name(source_document: &Path) -> String {
    source_document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Orders keys longest first so that `B1` cannot claim the placeholder of `B10`. Keys of equal
/// length are ordered lexicographically.
pub fn substitution_order(mappings: &MappingTable) -> Vec<&str> {
    let mut keys: Vec<&str> = mappings.keys().collect();
    keys.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    keys
}

/// Floor for the compiled size of one placeholder pattern (the `regex` default).
const PATTERN_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Builds the case-insensitive `>\s*KEY\s*<` pattern for one key.
///
/// The compiled-size limit grows with the key, so only pathological keys can fail to build.
pub fn placeholder_pattern(key: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r">\s*{}\s*<", regex::escape(key)))
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT.max(key.len().saturating_mul(1024)))
        .build()
}

/// Renders `template_text` against `mappings`.
///
/// Fixed tokens are replaced first. Keys are then processed in [`substitution_order`]; every
/// placeholder matching a key is rewritten to `>` + sanitized value + `<`.
pub fn render(
    template_text: &str,
    mappings: &MappingTable,
    source_document: &Path,
    options: &RenderOptions,
) -> (String, RenderReport) {
    let current_date = options.today().format(DATE_FORMAT).to_string();
    let mut text = template_text
        .replace(TEMPLATE_NAME_TOKEN, &template_name(source_document))
        .replace(CURRENT_DATE_TOKEN, &current_date);

    let mut report = RenderReport::default();
    for key in substitution_order(mappings) {
        let value = mappings.get(key).unwrap_or_default();
        let pattern = match placeholder_pattern(key) {
            Ok(pattern) => pattern,
            Err(err) => {
                tracing::warn!("Key '{key}' cannot be searched for in SVG: {err}");
                report.missing.push(key.to_string());
                continue;
            }
        };
        if !pattern.is_match(&text) {
            tracing::warn!("Key '{key}' not found in SVG.");
            report.missing.push(key.to_string());
            continue;
        }

        let replacement_value = sanitize_value(value);
        tracing::info!("Found key '{key}' in SVG. Replacing with '{replacement_value}'.");
        let replacement = format!(">{replacement_value}<");
        text = pattern.replace_all(&text, NoExpand(&replacement)).into_owned();
        report.substituted.push(key.to_string());
    }

    if report.replacements() > 0 {
        tracing::info!("Total of {} replacements were made.", report.replacements());
    } else {
        tracing::warn!("No replacements were made in the SVG file.");
    }

    (text, report)
}

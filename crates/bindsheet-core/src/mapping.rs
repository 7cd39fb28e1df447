//! Extraction of placeholder mappings from a Joystick Gremlin profile.
//!
//! Gremlin lets users annotate containers and actions with a free-form `description`. bindsheet
//! reads those descriptions as `KEY1|VALUE1|KEY2|VALUE2|...` lists; the final value may be
//! omitted, in which case the key maps to an empty string.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::path::Path;

pub const DESCRIPTION_ATTRIBUTE: &str = "description";
pub const PAIR_DELIMITER: char = '|';

/// Placeholder key → display value.
///
/// Iteration follows the order in which keys were first seen. Re-inserting a key replaces its
/// value in place, so the last occurrence in document order wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: IndexMap<String, String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Applies one `description` attribute value to the table.
    pub fn absorb_description(&mut self, description: &str) {
        let description = description.trim();
        if description.is_empty() {
            return;
        }

        let parts: Vec<&str> = description.split(PAIR_DELIMITER).collect();
        for pair in parts.chunks(2) {
            let key = pair[0].trim();
            if key.is_empty() {
                continue;
            }
            let value = pair.get(1).map(|v| v.trim()).unwrap_or("");
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MappingTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    }
}

/// Walks every element of a parsed document (document order, root included) and collects the
/// mappings carried by `description` attributes.
pub fn extract(doc: &roxmltree::Document<'_>) -> MappingTable {
    let mut table = MappingTable::new();
    for node in doc.root().descendants().filter(|n| n.is_element()) {
        if let Some(description) = node.attribute(DESCRIPTION_ATTRIBUTE) {
            table.absorb_description(description);
        }
    }

    if table.is_empty() {
        tracing::warn!("No mappings were found in the XML file.");
    } else {
        tracing::debug!(count = table.len(), "extracted mappings");
    }
    table
}

/// Parses `text` as XML and extracts its mappings.
///
/// `origin` only labels the error when the text is not well-formed.
pub fn extract_str(text: &str, origin: &Path) -> Result<MappingTable> {
    let doc = roxmltree::Document::parse_with_options(text, parsing_options()).map_err(|e| {
        Error::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    Ok(extract(&doc))
}

pub fn extract_file(path: impl AsRef<Path>) -> Result<MappingTable> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::from_read(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: format!("document is not valid UTF-8: {e}"),
    })?;
    extract_str(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(xml: &str) -> MappingTable {
        extract_str(xml, Path::new("test.xml")).unwrap()
    }

    fn pairs(table: &MappingTable) -> Vec<(&str, &str)> {
        table.iter().collect()
    }

    #[test]
    fn odd_trailing_key_maps_to_empty_value() {
        let t = table_of(r#"<profile><device description="A|1|B|2|C"/></profile>"#);
        assert_eq!(pairs(&t), vec![("A", "1"), ("B", "2"), ("C", "")]);
    }

    #[test]
    fn empty_key_discards_its_value() {
        let t = table_of(r#"<profile><device description="|1|B|2"/></profile>"#);
        assert_eq!(pairs(&t), vec![("B", "2")]);
    }

    #[test]
    fn tokens_are_trimmed() {
        let t = table_of(r#"<profile description="  JOY_B1 | Fire Guns |  JOY_B2|Flares  "/>"#);
        assert_eq!(t.get("JOY_B1"), Some("Fire Guns"));
        assert_eq!(t.get("JOY_B2"), Some("Flares"));
    }

    #[test]
    fn last_occurrence_in_document_order_wins() {
        let t = table_of(
            r#"<profile>
                 <device description="B1|first">
                   <button description="B1|nested"/>
                 </device>
                 <device description="B1|last|B2|two"/>
               </profile>"#,
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("B1"), Some("last"));
        assert_eq!(t.get("B2"), Some("two"));
    }

    #[test]
    fn blank_descriptions_and_other_attributes_are_ignored() {
        let t = table_of(
            r#"<profile name="A|1">
                 <device description="   "/>
                 <device label="B|2"/>
               </profile>"#,
        );
        assert!(t.is_empty());
    }

    #[test]
    fn keys_are_case_preserved() {
        let t = table_of(r#"<p description="Rudder|Yaw|rudder|yaw"/>"#);
        assert_eq!(pairs(&t), vec![("Rudder", "Yaw"), ("rudder", "yaw")]);
    }

    #[test]
    fn entity_references_in_attributes_are_decoded_by_the_parser() {
        let t = table_of(r#"<p description="TRIM|Nose &amp; Tail"/>"#);
        assert_eq!(t.get("TRIM"), Some("Nose & Tail"));
    }

    #[test]
    fn doctype_is_accepted() {
        let t = table_of(
            r#"<?xml version="1.0"?><!DOCTYPE profile [<!ENTITY gear "Gear">]><profile description="G|&gear;"/>"#,
        );
        assert_eq!(t.get("G"), Some("Gear"));
    }

    #[test]
    fn malformed_document_is_a_parse_failure() {
        let err = extract_str("<profile><device></profile>", Path::new("bad.xml")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err:?}");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_file(dir.path().join("missing.xml")).unwrap_err();
        assert!(err.is_not_found(), "{err:?}");
    }

    #[test]
    fn extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.xml");
        std::fs::write(&path, r#"<profile><a description="X|y"/></profile>"#).unwrap();
        let t = extract_file(&path).unwrap();
        assert_eq!(t.get("X"), Some("y"));
    }
}

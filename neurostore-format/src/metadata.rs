// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Flat XML metadata documents.
//!
//! A document is one root element whose children are `<key>value</key>`
//! pairs. The root element name is not significant when reading.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{FormatError, Result};
use crate::timestamp;

/// Root element written by [`write_metadata`].
pub const ROOT_ELEMENT: &str = "metadata";

/// Parsed key/value metadata.
pub type MetadataMap = BTreeMap<String, String>;

/// Parse metadata from a string.
pub fn parse_metadata(xml: &str, origin: &Path) -> Result<MetadataMap> {
    quick_xml::de::from_str(xml).map_err(|source| FormatError::XmlRead {
        path: origin.to_owned(),
        source,
    })
}

/// Read a metadata document.
pub fn read_metadata(path: &Path) -> Result<MetadataMap> {
    let xml = std::fs::read_to_string(path).map_err(|e| FormatError::io(path, e))?;
    parse_metadata(&xml, path)
}

/// Render metadata as an XML document.
pub fn render_metadata(metadata: &MetadataMap) -> Result<String> {
    let body = quick_xml::se::to_string_with_root(ROOT_ELEMENT, metadata)?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}\n"))
}

/// Write a metadata document, replacing any existing file.
pub fn write_metadata(path: &Path, metadata: &MetadataMap) -> Result<()> {
    let xml = render_metadata(metadata)?;
    std::fs::write(path, xml).map_err(|e| FormatError::io(path, e))
}

/// Required string value.
pub fn require<'a>(metadata: &'a MetadataMap, key: &str, origin: &Path) -> Result<&'a str> {
    metadata
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| FormatError::MissingKey {
            path: origin.to_owned(),
            key: key.to_string(),
        })
}

/// Optional string value; empty strings and `None` spellings count as absent.
pub fn optional<'a>(metadata: &'a MetadataMap, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "None" && *v != "null")
}

/// Optional timestamp value.
pub fn timestamp(metadata: &MetadataMap, key: &str) -> Result<Option<NaiveDateTime>> {
    optional(metadata, key).map(timestamp::parse).transpose()
}

// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Storage container codec.
//!
//! A container is a fixed magic, a length-prefixed JSON header and an opaque
//! payload. Only the header is ever interpreted; the payload is carried
//! through upgrades byte for byte.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{FormatError, Result};
use crate::timestamp;

/// Magic bytes at the start of every container.
pub const MAGIC: &[u8; 8] = b"\x89NSF\r\n\x1a\n";

/// Upper bound for the JSON header.
pub const MAX_HEADER_LEN: u32 = 1 << 20;

/// `written_by` of view-model containers.
pub const VIEW_MODEL_WRITER: &str = "ViewModel";

/// `written_by` of burst configuration containers.
pub const BURST_WRITER: &str = "BurstConfiguration";

/// Metadata header of a storage container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerHeader {
    /// Writer that produced the file; drives classification
    pub written_by: String,
    /// Declared class name of the stored object
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
    /// Format version; 0 when the header does not declare one
    #[serde(default)]
    pub data_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    /// Every other attribute, kept verbatim
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ContainerHeader {
    pub fn new(written_by: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            written_by: written_by.into(),
            type_name: type_name.into(),
            gid: None,
            data_version: 0,
            create_date: None,
            attributes: BTreeMap::new(),
        }
    }

    /// String attribute, if present and a string.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// Boolean attribute; accepts JSON booleans and "True"/"False" strings.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.attributes.get(key)? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Parsed creation timestamp, if present and readable.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.create_date
            .as_deref()
            .and_then(|s| timestamp::parse(s).ok())
    }
}

fn read_header_from<R: Read>(reader: &mut R, path: &Path) -> Result<ContainerHeader> {
    let mut magic = [0u8; 8];
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(FormatError::BadMagic(path.to_owned()));
        }
        Err(e) => return Err(FormatError::io(path, e)),
    }
    if &magic != MAGIC {
        return Err(FormatError::BadMagic(path.to_owned()));
    }

    let mut len = [0u8; 4];
    reader
        .read_exact(&mut len)
        .map_err(|e| FormatError::io(path, e))?;
    let len = u32::from_le_bytes(len);
    if len > MAX_HEADER_LEN {
        return Err(FormatError::HeaderTooLarge {
            path: path.to_owned(),
            len,
        });
    }

    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .map_err(|e| FormatError::io(path, e))?;
    serde_json::from_slice(&buf).map_err(|source| FormatError::Header {
        path: path.to_owned(),
        source,
    })
}

fn write_to<W: Write>(writer: &mut W, header: &ContainerHeader, payload: &[u8]) -> io::Result<()> {
    let json = serde_json::to_vec(header).map_err(io::Error::other)?;
    let len = u32::try_from(json.len())
        .ok()
        .filter(|len| *len <= MAX_HEADER_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "container header too large"))?;
    writer.write_all(MAGIC)?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read only the header of a container.
pub fn read_header(path: &Path) -> Result<ContainerHeader> {
    let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let header = read_header_from(&mut reader, path)?;
    trace!("Read header of {}: {}", path.display(), header.written_by);
    Ok(header)
}

/// Read header and payload of a container.
pub fn read_container(path: &Path) -> Result<(ContainerHeader, Vec<u8>)> {
    let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let header = read_header_from(&mut reader, path)?;
    let mut payload = Vec::new();
    reader
        .read_to_end(&mut payload)
        .map_err(|e| FormatError::io(path, e))?;
    Ok((header, payload))
}

/// Create (or truncate) a container at `path`.
pub fn write_container(path: &Path, header: &ContainerHeader, payload: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(|e| FormatError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_to(&mut writer, header, payload).map_err(|e| FormatError::io(path, e))
}

/// Replace the header of an existing container, keeping its payload.
///
/// The new file is written next to the old one and renamed over it, so a
/// failure never leaves a half-written container behind.
pub fn rewrite_header(path: &Path, header: &ContainerHeader) -> Result<()> {
    let (_, payload) = read_container(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| FormatError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_to(&mut writer, header, &payload).map_err(|e| FormatError::io(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| FormatError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> ContainerHeader {
        let mut header = ContainerHeader::new("Connectivity", "Connectivity");
        header.gid = Some("3f2b".into());
        header.data_version = 3;
        header.create_date = Some("2020-01-02,03-04-05.000006".into());
        header
            .attributes
            .insert("subject".into(), serde_json::json!("John Doe"));
        header
            .attributes
            .insert("visible".into(), serde_json::json!("False"));
        header
    }

    #[test]
    fn test_header_without_payload_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.nsf");
        write_container(&path, &header(), b"weights and tracts").unwrap();

        let read = read_header(&path).unwrap();
        assert_eq!(read, header());
        assert_eq!(read.attribute("subject"), Some("John Doe"));
        assert_eq!(read.flag("visible"), Some(false));
        assert!(read.created_at().is_some());
    }

    #[test]
    fn test_rewrite_keeps_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.nsf");
        write_container(&path, &header(), b"\x00\x01payload").unwrap();

        let mut updated = header();
        updated.gid = Some("other".into());
        rewrite_header(&path, &updated).unwrap();

        let (read, payload) = read_container(&path).unwrap();
        assert_eq!(read.gid.as_deref(), Some("other"));
        assert_eq!(payload, b"\x00\x01payload");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.nsf");
        std::fs::write(&path, b"\x89HDF\r\n\x1a\nrest").unwrap();
        assert!(matches!(read_header(&path), Err(FormatError::BadMagic(_))));

        std::fs::write(&path, b"").unwrap();
        assert!(matches!(read_header(&path), Err(FormatError::BadMagic(_))));
    }

    #[test]
    fn test_oversized_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.nsf");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&(MAX_HEADER_LEN + 1).to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            read_header(&path),
            Err(FormatError::HeaderTooLarge { .. })
        ));
    }

    #[test]
    fn test_missing_version_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.nsf");
        let json = br#"{"written_by":"ViewModel","type":"SimulatorAdapterModel"}"#;
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&(json.len() as u32).to_le_bytes());
        bytes.extend_from_slice(json);
        std::fs::write(&path, bytes).unwrap();

        let read = read_header(&path).unwrap();
        assert_eq!(read.data_version, 0);
        assert!(read.gid.is_none());
    }
}

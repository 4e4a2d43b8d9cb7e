// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Storage file classification.

use std::path::Path;

use derive_more::Display;
use tracing::debug;

use crate::container::{BURST_WRITER, ContainerHeader, VIEW_MODEL_WRITER, read_header};

/// What a storage file holds, decided from its header alone.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Configuration used to launch an operation
    #[display("view model")]
    ViewModel,
    /// A scientific data product
    #[display("data product")]
    DataProduct,
    /// A simulation burst configuration
    #[display("burst configuration")]
    BurstConfig,
    /// Unreadable or unrecognized
    #[display("unknown")]
    Unknown,
}

/// Classify a header that has already been read.
pub fn classify_header(header: &ContainerHeader) -> FormatKind {
    match header.written_by.as_str() {
        VIEW_MODEL_WRITER => FormatKind::ViewModel,
        BURST_WRITER => FormatKind::BurstConfig,
        "" => FormatKind::Unknown,
        _ => FormatKind::DataProduct,
    }
}

/// Classify a storage file without deserializing its payload.
///
/// Files whose header cannot be read are [`FormatKind::Unknown`].
pub fn classify(path: &Path) -> FormatKind {
    match read_header(path) {
        Ok(header) => classify_header(&header),
        Err(e) => {
            debug!("Cannot classify {}: {e}", path.display());
            FormatKind::Unknown
        }
    }
}

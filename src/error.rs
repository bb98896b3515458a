use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::map_document::PropId;

/// Fatal errors. Anything here aborts the whole operation before the scene
/// is touched; per-item problems are reported as [`Warning`]s instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("prop libraries directory not found: {0}")]
    LibrariesDirNotFound(PathBuf),

    #[error("failed to read map file {path}: {source}")]
    MapFileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a map file: root element is <{0}>")]
    NotAMapFile(String),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Recoverable per-item problems, collected into the import/export reports
/// and surfaced as a summary at the end of the operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("library folder '{folder}' has an unreadable library.xml: {reason}")]
    MalformedLibrary { folder: String, reason: String },

    #[error("prop element #{index} is malformed: {reason}")]
    MalformedProp { index: usize, reason: String },

    #[error("prop {0} not found in any library")]
    UnresolvedProp(PropId),

    #[error("failed to load model for {id}: {reason}")]
    ModelLoadFailed { id: PropId, reason: String },

    #[error("failed to place {id}: {reason}")]
    PlacementFailed { id: PropId, reason: String },

    #[error("object '{0}' is not recognisable as a prop placement")]
    NotAProp(String),

    #[error("no exportable prop objects found in scene")]
    NoExportableObjects,
}

//! Prop library scanning.
//!
//! A libraries directory holds one subfolder per library; each subfolder
//! with a `library.xml` manifest contributes entries mapping a [`PropId`]
//! to a mesh file and its texture variants, all relative to that subfolder.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Warning};
use crate::map_document::PropId;

/// One texture variant declared for a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRef {
    pub name: String,
    pub diffuse_map: PathBuf,
}

/// A resolved prop: mesh path plus texture variants, both absolute.
/// Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PropLibraryEntry {
    pub id: PropId,
    pub mesh_path: PathBuf,
    pub textures: Vec<TextureRef>,
}

impl PropLibraryEntry {
    pub fn texture(&self, name: &str) -> Option<&TextureRef> {
        self.textures.iter().find(|t| t.name == name)
    }
}

/// What to do when two libraries declare the same prop id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Later-scanned libraries overwrite earlier ones.
    #[default]
    LastWins,
    /// The first declaration sticks.
    FirstWins,
}

/// Mapping from prop id to library entry, rebuilt fresh per operation.
#[derive(Debug, Default)]
pub struct PropLibraryIndex {
    entries: HashMap<PropId, PropLibraryEntry>,
}

impl PropLibraryIndex {
    /// Scan the immediate subdirectories of `root`. Folders without a
    /// `library.xml` are skipped; folders with an unparseable one yield a
    /// [`Warning::MalformedLibrary`] and are omitted. A missing root is the
    /// only fatal case. Subfolders are visited in sorted order so the
    /// result is deterministic for a fixed directory snapshot.
    pub fn build(
        root: &Path,
        policy: DuplicatePolicy,
    ) -> Result<(PropLibraryIndex, Vec<Warning>), Error> {
        if !root.is_dir() {
            return Err(Error::LibrariesDirNotFound(root.to_path_buf()));
        }

        let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let mut index = PropLibraryIndex::default();
        let mut warnings = Vec::new();

        for dir in dirs {
            let manifest = dir.join("library.xml");
            if !manifest.is_file() {
                log::debug!("skipping {}: no library.xml", dir.display());
                continue;
            }

            let folder = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match load_library(&manifest, &dir) {
                Ok(entries) => {
                    log::info!("loaded {} props from library '{folder}'", entries.len());
                    for entry in entries {
                        match policy {
                            DuplicatePolicy::LastWins => {
                                if index.entries.insert(entry.id.clone(), entry).is_some() {
                                    log::debug!("duplicate prop id overridden by '{folder}'");
                                }
                            }
                            DuplicatePolicy::FirstWins => {
                                index.entries.entry(entry.id.clone()).or_insert(entry);
                            }
                        }
                    }
                }
                Err(reason) => {
                    log::warn!("failed to load prop library {}: {reason}", dir.display());
                    warnings.push(Warning::MalformedLibrary { folder, reason });
                }
            }
        }

        Ok((index, warnings))
    }

    pub fn lookup(&self, id: &PropId) -> Option<&PropLibraryEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropLibraryEntry> {
        self.entries.values()
    }
}

// library.xml manifest shape:
//   <library name="..">
//     <prop-group name="..">
//       <prop name=".."><mesh file=".."><texture name=".." diffuse-map=".."/></mesh></prop>
//     </prop-group>
//   </library>

#[derive(Debug, Deserialize)]
struct LibraryXml {
    name: Option<String>,
    #[serde(rename = "prop-group", default)]
    groups: Vec<PropGroupXml>,
}

#[derive(Debug, Deserialize)]
struct PropGroupXml {
    name: String,
    #[serde(rename = "prop", default)]
    props: Vec<PropXml>,
}

#[derive(Debug, Deserialize)]
struct PropXml {
    name: String,
    mesh: Option<MeshXml>,
}

#[derive(Debug, Deserialize)]
struct MeshXml {
    file: String,
    #[serde(rename = "texture", default)]
    textures: Vec<TextureXml>,
}

#[derive(Debug, Deserialize)]
struct TextureXml {
    name: String,
    #[serde(rename = "diffuse-map")]
    diffuse_map: String,
}

fn load_library(manifest: &Path, dir: &Path) -> Result<Vec<PropLibraryEntry>, String> {
    let text = fs::read_to_string(manifest).map_err(|e| e.to_string())?;
    let library: LibraryXml = quick_xml::de::from_str(&text).map_err(|e| e.to_string())?;
    let library_name = library.name.ok_or("missing name attribute on <library>")?;

    let mut entries = Vec::new();
    for group in library.groups {
        for prop in group.props {
            let Some(mesh) = prop.mesh else {
                log::debug!(
                    "prop '{}/{}' in library '{library_name}' has no mesh, skipping",
                    group.name,
                    prop.name
                );
                continue;
            };
            entries.push(PropLibraryEntry {
                id: PropId::new(&library_name, &group.name, &prop.name),
                mesh_path: dir.join(&mesh.file),
                textures: mesh
                    .textures
                    .into_iter()
                    .map(|t| TextureRef {
                        name: t.name,
                        diffuse_map: dir.join(&t.diffuse_map),
                    })
                    .collect(),
            });
        }
    }
    Ok(entries)
}

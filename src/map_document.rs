//! In-memory model of one Tanki XML map file and its parse/serialize pair.
//!
//! The map format places props under `<static-geometry>`, addressed by the
//! `library-name`/`group-name`/`name` attribute triple, with `<position>`,
//! `<rotation>` and `<texture-name>` children. Collision geometry, spawn
//! points and foliage are recognised but intentionally not modeled.

use std::fmt;
use std::path::PathBuf;

use glam::Vec3;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Warning};

/// Composite prop identifier: which library, which group inside it, which prop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropId {
    pub library: String,
    pub group: String,
    pub name: String,
}

impl PropId {
    pub fn new(
        library: impl Into<String>,
        group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            library: library.into(),
            group: group.into(),
            name: name.into(),
        }
    }

    /// Scene object naming convention used when placing this prop.
    pub fn scene_name(&self) -> String {
        format!("{}::{}::{}", self.library, self.group, self.name).replace(' ', "_")
    }
}

impl fmt::Display for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.library, self.group, self.name)
    }
}

/// One `<prop>` record. Position, rotation and scale are in source map
/// space; rotation is an Euler triple in whatever angle unit the file uses
/// (the format itself only ever carries a Z component).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedProp {
    pub id: PropId,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub texture_name: Option<String>,
}

/// A parsed map: the ordered prop placements plus where they came from.
/// Built fresh per import/export operation, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapDocument {
    pub placed_props: Vec<PlacedProp>,
    pub source_path: Option<PathBuf>,
}

impl MapDocument {
    /// Parse map XML. Malformed prop elements are skipped with a
    /// [`Warning::MalformedProp`] so a map with a few corrupt entries still
    /// imports partially; only an unparseable document or a wrong root
    /// element is fatal.
    pub fn parse(bytes: &[u8]) -> Result<(MapDocument, Vec<Warning>), Error> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        // Root element must be <map>.
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => {
                    if e.name().as_ref() != b"map" {
                        return Err(Error::NotAMapFile(
                            String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                        ));
                    }
                    break;
                }
                Event::Eof => {
                    return Err(Error::Xml(quick_xml::Error::UnexpectedEof("map".into())))
                }
                _ => {}
            }
        }

        let mut placed_props = Vec::new();
        let mut warnings = Vec::new();
        let mut in_static_geometry = false;
        let mut prop_index = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"static-geometry" => in_static_geometry = true,
                    b"prop" if in_static_geometry => {
                        prop_index += 1;
                        match read_prop(&mut reader, &e)? {
                            Ok(prop) => placed_props.push(prop),
                            Err(reason) => {
                                log::warn!("skipping prop element #{prop_index}: {reason}");
                                warnings.push(Warning::MalformedProp {
                                    index: prop_index,
                                    reason,
                                });
                            }
                        }
                    }
                    b"collision-geometry" | b"spawn-points" | b"foliage" => {
                        let name = e.name().as_ref().to_vec();
                        log::debug!(
                            "ignoring <{}> subtree",
                            String::from_utf8_lossy(&name)
                        );
                        skip_subtree(&mut reader, &name)?;
                    }
                    _ => {}
                },
                Event::Empty(e) => {
                    // A self-closing <prop/> cannot carry a position.
                    if in_static_geometry && e.name().as_ref() == b"prop" {
                        prop_index += 1;
                        warnings.push(Warning::MalformedProp {
                            index: prop_index,
                            reason: "missing <position> element".into(),
                        });
                    }
                }
                Event::End(e) => {
                    if e.name().as_ref() == b"static-geometry" {
                        in_static_geometry = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        log::debug!(
            "parsed {} props ({} skipped as malformed)",
            placed_props.len(),
            warnings.len()
        );

        Ok((
            MapDocument {
                placed_props,
                source_path: None,
            },
            warnings,
        ))
    }

    /// Serialize back to map XML. Structural inverse of [`MapDocument::parse`]
    /// for the fields the model owns; collision/spawn/foliage elements are
    /// never fabricated.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut map = BytesStart::new("map");
        map.push_attribute(("version", "1.0.Light"));
        writer.write_event(Event::Start(map))?;
        writer.write_event(Event::Start(BytesStart::new("static-geometry")))?;

        for prop in &self.placed_props {
            let mut el = BytesStart::new("prop");
            el.push_attribute(("library-name", prop.id.library.as_str()));
            el.push_attribute(("group-name", prop.id.group.as_str()));
            el.push_attribute(("name", prop.id.name.as_str()));
            writer.write_event(Event::Start(el))?;

            // Rotation is usually Z-only in this format; X/Y appear only
            // when they carry something.
            writer.write_event(Event::Start(BytesStart::new("rotation")))?;
            if prop.rotation.x != 0.0 {
                write_scalar(&mut writer, "x", prop.rotation.x)?;
            }
            if prop.rotation.y != 0.0 {
                write_scalar(&mut writer, "y", prop.rotation.y)?;
            }
            write_scalar(&mut writer, "z", prop.rotation.z)?;
            writer.write_event(Event::End(BytesEnd::new("rotation")))?;

            match prop.texture_name.as_deref() {
                Some(texture) if !texture.is_empty() => {
                    writer.write_event(Event::Start(BytesStart::new("texture-name")))?;
                    writer.write_event(Event::Text(BytesText::new(texture)))?;
                    writer.write_event(Event::End(BytesEnd::new("texture-name")))?;
                }
                _ => {
                    writer.write_event(Event::Empty(BytesStart::new("texture-name")))?;
                }
            }

            writer.write_event(Event::Start(BytesStart::new("position")))?;
            write_scalar(&mut writer, "x", prop.position.x)?;
            write_scalar(&mut writer, "y", prop.position.y)?;
            write_scalar(&mut writer, "z", prop.position.z)?;
            writer.write_event(Event::End(BytesEnd::new("position")))?;

            if prop.scale != Vec3::ONE {
                writer.write_event(Event::Start(BytesStart::new("scale")))?;
                write_scalar(&mut writer, "x", prop.scale.x)?;
                write_scalar(&mut writer, "y", prop.scale.y)?;
                write_scalar(&mut writer, "z", prop.scale.z)?;
                writer.write_event(Event::End(BytesEnd::new("scale")))?;
            }

            writer.write_event(Event::End(BytesEnd::new("prop")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("static-geometry")))?;
        writer.write_event(Event::End(BytesEnd::new("map")))?;

        Ok(writer.into_inner())
    }
}

fn write_scalar(writer: &mut Writer<Vec<u8>>, name: &str, value: f32) -> Result<(), Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(&format!("{value:.6}"))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Consume events until the matching end tag of an already-read start tag.
fn skip_subtree(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<(), Error> {
    let mut depth = 1usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == name => depth += 1,
            Event::End(e) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(Error::Xml(quick_xml::Error::UnexpectedEof(
                    String::from_utf8_lossy(name).into_owned(),
                )))
            }
            _ => {}
        }
    }
}

/// Which xyz triple a text value belongs to while walking a prop subtree.
#[derive(Clone, Copy, PartialEq)]
enum Triple {
    Position,
    Rotation,
    Scale,
}

/// Read one `<prop>` subtree. The outer `Result` is for XML-level failures
/// (fatal); the inner one carries the reason a structurally broken prop is
/// skipped. The subtree is always fully consumed either way.
fn read_prop(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<Result<PlacedProp, String>, Error> {
    let mut reason: Option<String> = None;

    let get_attr = |key: &str| -> Option<String> {
        match start.try_get_attribute(key) {
            Ok(Some(attr)) => match attr.unescape_value() {
                Ok(value) => Some(value.into_owned()),
                Err(_) => None,
            },
            _ => None,
        }
    };

    let library = get_attr("library-name");
    let group = get_attr("group-name");
    let name = get_attr("name");

    let mut saw_position = false;
    let mut position = [None::<f32>; 3];
    let mut rotation = Vec3::ZERO;
    let mut scale = Vec3::ONE;
    let mut texture_name: Option<String> = None;

    let mut current: Option<Triple> = None;
    let mut axis: Option<usize> = None;
    let mut in_texture = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"position" => {
                    saw_position = true;
                    current = Some(Triple::Position);
                }
                b"rotation" => current = Some(Triple::Rotation),
                b"scale" => current = Some(Triple::Scale),
                b"texture-name" => in_texture = true,
                b"x" if current.is_some() => axis = Some(0),
                b"y" if current.is_some() => axis = Some(1),
                b"z" if current.is_some() => axis = Some(2),
                other => {
                    let unknown = other.to_vec();
                    skip_subtree(reader, &unknown)?;
                }
            },
            Event::Text(t) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(e) => {
                        if reason.is_none() {
                            reason = Some(format!("bad text content: {e}"));
                        }
                        continue;
                    }
                };
                if in_texture {
                    if !text.trim().is_empty() {
                        texture_name = Some(text.trim().to_string());
                    }
                } else if let (Some(triple), Some(axis)) = (current, axis) {
                    match text.trim().parse::<f32>() {
                        Ok(value) => match triple {
                            Triple::Position => position[axis] = Some(value),
                            Triple::Rotation => rotation[axis] = value,
                            Triple::Scale => scale[axis] = value,
                        },
                        Err(_) => {
                            if reason.is_none() {
                                reason = Some(format!(
                                    "non-numeric {} value '{}'",
                                    ["x", "y", "z"][axis],
                                    text.trim()
                                ));
                            }
                        }
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"prop" => break,
                b"position" | b"rotation" | b"scale" => {
                    current = None;
                    axis = None;
                }
                b"x" | b"y" | b"z" => axis = None,
                b"texture-name" => in_texture = false,
                _ => {}
            },
            Event::Eof => {
                return Err(Error::Xml(quick_xml::Error::UnexpectedEof("prop".into())))
            }
            _ => {}
        }
    }

    if reason.is_none() {
        if library.is_none() {
            reason = Some("missing library-name attribute".into());
        } else if group.is_none() {
            reason = Some("missing group-name attribute".into());
        } else if name.is_none() {
            reason = Some("missing name attribute".into());
        } else if !saw_position {
            reason = Some("missing <position> element".into());
        } else if position.iter().any(Option::is_none) {
            reason = Some("incomplete <position> element".into());
        }
    }

    if let Some(reason) = reason {
        return Ok(Err(reason));
    }

    Ok(Ok(PlacedProp {
        id: PropId::new(library.unwrap(), group.unwrap(), name.unwrap()),
        position: Vec3::new(
            position[0].unwrap(),
            position[1].unwrap(),
            position[2].unwrap(),
        ),
        rotation,
        scale,
        texture_name,
    }))
}

//! `BuildMetadata.xml`: what downstream modules need to know about each
//! processed library version.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <BuildMetadata>
//!   <Library name="glm">
//!     <Version number="0.9.9">
//!       <PublicDefinitions>
//!         <Definition>GLM_FORCE_RADIANS</Definition>
//!       </PublicDefinitions>
//!     </Version>
//!   </Library>
//! </BuildMetadata>
//! ```
//!
//! Only versions that passed validation are recorded, so the document
//! reflects what was actually processed rather than what was declared.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;

use crate::util::fs::{read_to_string, write_bytes};

const ROOT: &str = "BuildMetadata";
const LIBRARY: &str = "Library";
const VERSION: &str = "Version";
const PUBLIC_DEFINITIONS: &str = "PublicDefinitions";
const DEFINITION: &str = "Definition";

/// Exported settings for one library version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionMetadata {
    pub public_definitions: Vec<String>,
}

/// Per-library, per-version metadata in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryMetadata {
    libraries: IndexMap<String, IndexMap<String, VersionMetadata>>,
}

impl LibraryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed version. Recording the same version again
    /// replaces its definitions.
    pub fn record(&mut self, library: &str, version: &str, public_definitions: &[String]) {
        self.libraries
            .entry(library.to_string())
            .or_default()
            .insert(
                version.to_string(),
                VersionMetadata {
                    public_definitions: public_definitions.to_vec(),
                },
            );
    }

    pub fn get(&self, library: &str, version: &str) -> Option<&VersionMetadata> {
        self.libraries.get(library)?.get(version)
    }

    /// Case-insensitive lookup, matching how module names are written by
    /// consumers.
    pub fn find_ignore_case(&self, library: &str, version: &str) -> Option<&VersionMetadata> {
        let (_, versions) = self
            .libraries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(library))?;
        versions
            .iter()
            .find(|(number, _)| number.eq_ignore_ascii_case(version))
            .map(|(_, meta)| meta)
    }

    pub fn contains(&self, library: &str, version: &str) -> bool {
        self.get(library, version).is_some()
    }

    /// Libraries with their versions, in recording order.
    pub fn libraries(
        &self,
    ) -> impl Iterator<Item = (&str, &IndexMap<String, VersionMetadata>)> {
        self.libraries.iter().map(|(name, versions)| (name.as_str(), versions))
    }

    /// Number of recorded versions across all libraries.
    pub fn version_count(&self) -> usize {
        self.libraries.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Render the metadata document.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new(ROOT)))?;

        for (library, versions) in &self.libraries {
            writer.write_event(Event::Start(
                BytesStart::new(LIBRARY).with_attributes([("name", library.as_str())]),
            ))?;

            for (version, meta) in versions {
                let element =
                    BytesStart::new(VERSION).with_attributes([("number", version.as_str())]);

                if meta.public_definitions.is_empty() {
                    writer.write_event(Event::Empty(element))?;
                    continue;
                }

                writer.write_event(Event::Start(element))?;
                writer.write_event(Event::Start(BytesStart::new(PUBLIC_DEFINITIONS)))?;
                for definition in &meta.public_definitions {
                    writer.write_event(Event::Start(BytesStart::new(DEFINITION)))?;
                    writer.write_event(Event::Text(BytesText::new(definition)))?;
                    writer.write_event(Event::End(BytesEnd::new(DEFINITION)))?;
                }
                writer.write_event(Event::End(BytesEnd::new(PUBLIC_DEFINITIONS)))?;
                writer.write_event(Event::End(BytesEnd::new(VERSION)))?;
            }

            writer.write_event(Event::End(BytesEnd::new(LIBRARY)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(ROOT)))?;

        let mut xml = writer.into_inner();
        xml.push(b'\n');
        Ok(xml)
    }

    /// Parse a metadata document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut metadata = LibraryMetadata::new();
        let mut library: Option<String> = None;
        let mut version: Option<String> = None;
        let mut definition: Option<String> = None;

        loop {
            let event = reader.read_event().with_context(|| {
                format!("malformed metadata at byte {}", reader.buffer_position())
            })?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"Library" => {
                            let name = required_attr(e, "name")?;
                            metadata.libraries.entry(name.clone()).or_default();
                            library = (!empty).then_some(name);
                        }
                        b"Version" => {
                            let lib = library
                                .as_ref()
                                .context("`Version` element outside of a `Library`")?;
                            let number = required_attr(e, "number")?;
                            metadata
                                .libraries
                                .entry(lib.clone())
                                .or_default()
                                .entry(number.clone())
                                .or_default();
                            version = (!empty).then_some(number);
                        }
                        b"Definition" if !empty => definition = Some(String::new()),
                        _ => {}
                    }
                }
                Event::Text(ref t) => {
                    if let Some(ref mut text) = definition {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"Definition" => {
                        if let (Some(lib), Some(ver), Some(text)) =
                            (library.as_ref(), version.as_ref(), definition.take())
                        {
                            if let Some(meta) = metadata
                                .libraries
                                .get_mut(lib)
                                .and_then(|versions| versions.get_mut(ver))
                            {
                                meta.public_definitions.push(text);
                            }
                        }
                    }
                    b"Version" => version = None,
                    b"Library" => library = None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(metadata)
    }
}

fn required_attr(element: &BytesStart<'_>, name: &str) -> Result<String> {
    let element_name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let attr = element.try_get_attribute(name)?.with_context(|| {
        format!(
            "`{}` element is missing the `{}` attribute",
            element_name, name
        )
    })?;
    Ok(attr.unescape_value()?.into_owned())
}

/// Write the metadata document to `path`.
pub fn write_metadata(metadata: &LibraryMetadata, path: &Path) -> Result<()> {
    let xml = metadata.to_xml()?;
    write_bytes(path, &xml)?;
    tracing::info!(
        "Output metadata to {} ({} versions)",
        path.display(),
        metadata.version_count()
    );
    Ok(())
}

/// Read a metadata document back from `path`.
pub fn read_metadata(path: &Path) -> Result<LibraryMetadata> {
    let xml = read_to_string(path)?;
    LibraryMetadata::from_xml(&xml)
        .with_context(|| format!("failed to parse metadata: {}", path.display()))
}

//! Fixtures shared by the unit tests.

use std::io;

use resdir_pe::writer::{build_minimal_pe, ResourceName, ResourceSectionWriter, ResourceSpec};
use resdir_pe::{PeImage, ResourceTree};

use crate::output::Output;
use crate::Resources;

pub const SECTION_RVA: u32 = 0x4000;

/// An image built from resource specs, with its parsed tree.
pub struct Fixture {
    image: PeImage,
    tree: ResourceTree,
}

impl Fixture {
    pub fn new(specs: Vec<ResourceSpec>) -> Self {
        let section = ResourceSectionWriter::new(SECTION_RVA)
            .entries(specs)
            .build()
            .unwrap();
        Self::from_section(section, |_| {})
    }

    /// Build from raw section bytes, edited by `patch` before the image is made.
    pub fn from_section(mut section: Vec<u8>, patch: impl FnOnce(&mut [u8])) -> Self {
        patch(&mut section);
        let image = PeImage::parse(build_minimal_pe(&section, SECTION_RVA)).unwrap();
        let tree = ResourceTree::parse(&image).unwrap();
        Self { image, tree }
    }

    pub fn image(&self) -> &PeImage {
        &self.image
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    pub fn resources(&self) -> Resources<'_> {
        Resources::new(&self.image, &self.tree)
    }
}

pub fn named_dir(name: ResourceName, children: Vec<ResourceSpec>) -> ResourceSpec {
    ResourceSpec::dir(name, children)
}

pub fn leaf(lang: u32, bytes: &[u8]) -> ResourceSpec {
    ResourceSpec::data(ResourceName::Id(lang), bytes.to_vec())
}

/// A type/name/language chain ending in a single payload.
pub fn resource(type_id: u32, name: ResourceName, lang: u32, bytes: &[u8]) -> ResourceSpec {
    named_dir(
        ResourceName::Id(type_id),
        vec![named_dir(name, vec![leaf(lang, bytes)])],
    )
}

/// Sink that records everything emitted.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    pub items: Vec<(String, String)>,
    pub lines: Vec<String>,
    pub opened: usize,
    pub closed: usize,
}

impl RecordingOutput {
    pub fn values(&self, label: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(l, _)| l.trim_start_matches('\n') == label)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

impl Output for RecordingOutput {
    fn open_document(&mut self) -> io::Result<()> {
        self.opened += 1;
        Ok(())
    }

    fn emit(&mut self, label: &str, value: &str) -> io::Result<()> {
        self.items.push((label.to_string(), value.to_string()));
        Ok(())
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.lines.push(text.to_string());
        Ok(())
    }

    fn close_document(&mut self) -> io::Result<()> {
        self.closed += 1;
        Ok(())
    }
}

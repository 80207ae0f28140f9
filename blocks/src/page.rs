use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::block::{CustomBlock, create_default};
use crate::config::MountOptions;
use crate::editor::Editor;
use crate::mount::mount_with;
use crate::node::{ElementNode, RenderNode};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("no section with id {0}")]
    SectionNotFound(Uuid),

    #[error("section {0} is not a custom code block")]
    NotCustomCode(Uuid),

    #[error("cannot insert at position {index}, the page has {len} sections")]
    OutOfRange { index: usize, len: usize },

    #[error("failed to parse page: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize page: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Hero,
    GalleryEmbed,
    CustomCode,
}

impl SectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Hero => "hero",
            SectionKind::GalleryEmbed => "gallery-embed",
            SectionKind::CustomCode => "custom-code",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub id: Uuid,
    #[serde(default)]
    pub heading: String,
}

/// Reference to a gallery held by the gallery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEmbed {
    pub id: Uuid,
    pub gallery: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Section {
    Hero(Hero),
    GalleryEmbed(GalleryEmbed),
    CustomCode(CustomBlock),
}

impl Section {
    pub fn id(&self) -> Uuid {
        match self {
            Section::Hero(hero) => hero.id,
            Section::GalleryEmbed(gallery) => gallery.id,
            Section::CustomCode(block) => block.id,
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Hero(_) => SectionKind::Hero,
            Section::GalleryEmbed(_) => SectionKind::GalleryEmbed,
            Section::CustomCode(block) => block.kind(),
        }
    }

    fn render(&self, options: &MountOptions) -> RenderNode {
        match self {
            Section::Hero(hero) => RenderNode::Element(ElementNode {
                tag: "section".to_string(),
                attributes: vec![("class".to_string(), Some("hero".to_string()))],
                children: vec![RenderNode::Element(ElementNode {
                    tag: "h1".to_string(),
                    attributes: Vec::new(),
                    children: vec![RenderNode::Text(hero.heading.clone())],
                })],
            }),
            Section::GalleryEmbed(gallery) => RenderNode::Element(ElementNode {
                tag: "div".to_string(),
                attributes: vec![
                    ("class".to_string(), Some("gallery-embed".to_string())),
                    ("data-gallery".to_string(), Some(gallery.gallery.clone())),
                ],
                children: Vec::new(),
            }),
            Section::CustomCode(block) => mount_with(block, options),
        }
    }
}

/// A page and its ordered sections. The in-memory owner of custom blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Page {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, PageError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, PageError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Insert a default custom block before the section at `index` and
    /// return its id.
    pub fn insert_custom_block(&mut self, index: usize) -> Result<Uuid, PageError> {
        if index > self.sections.len() {
            return Err(PageError::OutOfRange {
                index,
                len: self.sections.len(),
            });
        }
        let block = create_default();
        let id = block.id;
        self.sections.insert(index, Section::CustomCode(block));
        Ok(id)
    }

    pub fn remove_section(&mut self, id: Uuid) -> Result<Section, PageError> {
        let index = self
            .sections
            .iter()
            .position(|section| section.id() == id)
            .ok_or(PageError::SectionNotFound(id))?;
        Ok(self.sections.remove(index))
    }

    pub fn custom_block(&self, id: Uuid) -> Option<&CustomBlock> {
        self.sections.iter().find_map(|section| match section {
            Section::CustomCode(block) if block.id == id => Some(block),
            _ => None,
        })
    }

    pub fn custom_blocks(&self) -> impl Iterator<Item = &CustomBlock> {
        self.sections.iter().filter_map(|section| match section {
            Section::CustomCode(block) => Some(block),
            _ => None,
        })
    }

    /// Replace the source of a custom block. The next render uses it.
    pub fn set_source(&mut self, id: Uuid, source: &str) -> Result<(), PageError> {
        let section = self
            .sections
            .iter_mut()
            .find(|section| section.id() == id)
            .ok_or(PageError::SectionNotFound(id))?;
        match section {
            Section::CustomCode(block) => {
                block.source.clear();
                block.source.push_str(source);
                Ok(())
            }
            _ => Err(PageError::NotCustomCode(id)),
        }
    }

    /// One node per section, in order. Custom blocks are recompiled from
    /// source on every call.
    pub fn render(&self, options: &MountOptions) -> Vec<RenderNode> {
        self.sections
            .iter()
            .map(|section| section.render(options))
            .collect()
    }

    pub fn render_html(&self, options: &MountOptions) -> String {
        self.render(options)
            .iter()
            .map(|node| node.to_html_with(&options.error_class))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// An editor over a custom block's source whose changes are written back
    /// into `page`.
    pub fn editor(page: &Rc<RefCell<Page>>, id: Uuid) -> Result<Editor<impl FnMut(&str) + use<>>, PageError> {
        let source = {
            let page = page.borrow();
            match page.sections.iter().find(|section| section.id() == id) {
                Some(Section::CustomCode(block)) => block.source.clone(),
                Some(_) => return Err(PageError::NotCustomCode(id)),
                None => return Err(PageError::SectionNotFound(id)),
            }
        };
        let page = Rc::downgrade(page);
        Ok(Editor::new(source, move |text: &str| {
            let Some(page) = page.upgrade() else {
                warn!(block = %id, "edit after the page was dropped");
                return;
            };
            if let Err(e) = page.borrow_mut().set_source(id, text) {
                warn!(block = %id, error = %e, "edit was not applied");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::DEFAULT_SOURCE;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"
title = "Launch"

[[sections]]
kind = "hero"
id = "6f9619ff-8b86-4011-b42d-00c04fc964ff"
heading = "Welcome"

[[sections]]
kind = "custom-code"
id = "0b1b6a4e-1f4c-4c55-9c1b-7a6de9a0c2d1"
source = "() => <p>hi</p>"

[[sections]]
kind = "gallery-embed"
id = "f3c0e2a8-5b7d-4e2a-8f4e-0c6b9e1d2a3b"
gallery = "spring"
"#;

    fn block_id() -> Uuid {
        Uuid::parse_str("0b1b6a4e-1f4c-4c55-9c1b-7a6de9a0c2d1").unwrap()
    }

    #[test]
    fn pages_load_from_toml() {
        let page = Page::from_toml(PAGE).unwrap();
        let kinds: Vec<SectionKind> = page.sections.iter().map(Section::kind).collect();
        assert_eq!(
            kinds,
            vec![SectionKind::Hero, SectionKind::CustomCode, SectionKind::GalleryEmbed]
        );
        assert_eq!(page.custom_block(block_id()).unwrap().source, "() => <p>hi</p>");
    }

    #[test]
    fn pages_survive_serialization() {
        let page = Page::from_toml(PAGE).unwrap();
        let text = page.to_toml().unwrap();
        assert!(text.contains("kind = \"custom-code\""));
        assert_eq!(Page::from_toml(&text).unwrap(), page);
    }

    #[test]
    fn unknown_section_kinds_are_rejected() {
        let err = Page::from_toml("title = \"x\"\n[[sections]]\nkind = \"video\"\nid = \"6f9619ff-8b86-4011-b42d-00c04fc964ff\"\n")
            .unwrap_err();
        assert!(matches!(err, PageError::Parse(_)));
    }

    #[test]
    fn insert_and_remove_blocks() {
        let mut page = Page::new("t");
        let first = page.insert_custom_block(0).unwrap();
        let second = page.insert_custom_block(0).unwrap();
        assert_eq!(page.sections[0].id(), second);
        assert_eq!(page.custom_block(first).unwrap().source, DEFAULT_SOURCE);
        assert!(matches!(
            page.insert_custom_block(5),
            Err(PageError::OutOfRange { index: 5, len: 2 })
        ));

        let removed = page.remove_section(first).unwrap();
        assert_eq!(removed.id(), first);
        assert!(matches!(
            page.remove_section(first),
            Err(PageError::SectionNotFound(id)) if id == first
        ));
        assert_eq!(page.custom_blocks().count(), 1);
    }

    #[test]
    fn set_source_only_targets_custom_blocks() {
        let mut page = Page::from_toml(PAGE).unwrap();
        page.set_source(block_id(), "() => 'new'").unwrap();
        assert_eq!(page.custom_block(block_id()).unwrap().source, "() => 'new'");

        let hero = page.sections[0].id();
        assert!(matches!(
            page.set_source(hero, "x"),
            Err(PageError::NotCustomCode(_))
        ));
    }

    #[test]
    fn render_html_keeps_section_order() {
        let page = Page::from_toml(PAGE).unwrap();
        assert_eq!(
            page.render_html(&MountOptions::default()),
            "<section class=\"hero\"><h1>Welcome</h1></section>\n<p>hi</p>\n<div class=\"gallery-embed\" data-gallery=\"spring\"></div>"
        );
    }

    #[test]
    fn editor_writes_through_to_the_page() {
        let page = Rc::new(RefCell::new(Page::from_toml(PAGE).unwrap()));
        let mut editor = Page::editor(&page, block_id()).unwrap();
        assert_eq!(editor.text(), "() => <p>hi</p>");
        editor.insert(11, " there");
        assert_eq!(
            page.borrow().custom_block(block_id()).unwrap().source,
            "() => <p>hi there</p>"
        );

        let hero = page.borrow().sections[0].id();
        assert!(matches!(
            Page::editor(&page, hero),
            Err(PageError::NotCustomCode(_))
        ));
    }
}

//! Document elements and chunks.
//!
//! An [`Element`] is one structural unit produced by the partitioner
//! (heading, paragraph, figure, table, running header/footer). A [`Chunk`]
//! is what the title-based chunker groups elements into. Both kinds are
//! closed enums so every stage handles each variant explicitly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The structural role of an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Running page header (repeated at the top of pages).
    Header,
    /// Running page footer (page numbers, copyright lines).
    Footer,
    /// Embedded figure or picture.
    Image,
    /// Section heading; starts a new chunk.
    Title,
    /// Body paragraph.
    NarrativeText,
    /// Bulleted or numbered list entry.
    ListItem,
    /// Tabular region, with an HTML rendering in the metadata.
    Table,
}

impl ElementKind {
    /// Parse the type label the layout model emits.
    ///
    /// Unknown labels fall back to [`ElementKind::NarrativeText`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "header" | "page_header" => ElementKind::Header,
            "footer" | "page_footer" | "page_number" => ElementKind::Footer,
            "image" | "figure" | "picture" | "chart" => ElementKind::Image,
            "title" | "heading" | "section_header" => ElementKind::Title,
            "list_item" | "list" | "bullet" => ElementKind::ListItem,
            "table" => ElementKind::Table,
            _ => ElementKind::NarrativeText,
        }
    }
}

/// Size of the pixel space that [`Coordinates::points`] are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSize {
    pub width: f32,
    pub height: f32,
}

/// Four corner points of an element's bounding box.
///
/// Points are in pixels of the page rendered at the partition DPI, origin
/// top-left, ordered top-left, bottom-left, bottom-right, top-right. Points
/// 0 and 2 are therefore opposite corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub points: [(f32, f32); 4],
    pub layout: LayoutSize,
}

impl Coordinates {
    /// Build coordinates from a `(left, top, right, bottom)` pixel box.
    pub fn from_box(left: f32, top: f32, right: f32, bottom: f32, layout: LayoutSize) -> Self {
        Self {
            points: [(left, top), (left, bottom), (right, bottom), (right, top)],
            layout,
        }
    }

    /// Width and height measured between corner points 0 and 2.
    pub fn extent(&self) -> (f32, f32) {
        let (x0, y0) = self.points[0];
        let (x2, y2) = self.points[2];
        ((x2 - x0).abs(), (y2 - y0).abs())
    }
}

/// Metadata attached to an [`Element`] by the partitioner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
    /// 1-indexed page the element was found on.
    pub page_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Where an extracted figure was written, for image elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    /// HTML rendering of a table element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_as_html: Option<String>,
}

/// One structural unit of a partitioned document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub text: String,
    pub metadata: ElementMetadata,
}

impl Element {
    pub fn new(kind: ElementKind, text: impl Into<String>, page_number: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            metadata: ElementMetadata {
                page_number,
                ..Default::default()
            },
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.metadata.coordinates = Some(coordinates);
        self
    }

    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata.image_path = Some(path.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.metadata.text_as_html = Some(html.into());
        self
    }

    /// Running headers and footers are dropped before any other processing.
    pub fn is_page_furniture(&self) -> bool {
        matches!(self.kind, ElementKind::Header | ElementKind::Footer)
    }
}

/// Merged narrative text under one section title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeChunk {
    pub text: String,
    /// Page of the first element in the chunk.
    pub page_number: usize,
}

/// A table isolated into its own chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChunk {
    pub text: String,
    /// HTML rendering carried over from the table element. Empty when the
    /// partitioner produced none.
    pub text_as_html: String,
    pub page_number: usize,
}

/// Output of the title-based chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chunk {
    Composite(CompositeChunk),
    Table(TableChunk),
}

impl Chunk {
    pub fn text(&self) -> &str {
        match self {
            Chunk::Composite(c) => &c.text,
            Chunk::Table(t) => &t.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_label() {
        assert_eq!(ElementKind::from_label("Title"), ElementKind::Title);
        assert_eq!(ElementKind::from_label("list-item"), ElementKind::ListItem);
        assert_eq!(ElementKind::from_label("Page Header"), ElementKind::Header);
        assert_eq!(ElementKind::from_label("figure"), ElementKind::Image);
        assert_eq!(ElementKind::from_label("caption"), ElementKind::NarrativeText);
    }

    #[test]
    fn extent_uses_opposite_corners() {
        let layout = LayoutSize {
            width: 1700.0,
            height: 2200.0,
        };
        let c = Coordinates::from_box(100.0, 200.0, 400.0, 470.0, layout);
        assert_eq!(c.extent(), (300.0, 270.0));
    }

    #[test]
    fn header_and_footer_are_page_furniture() {
        assert!(Element::new(ElementKind::Header, "ACME Corp", 1).is_page_furniture());
        assert!(Element::new(ElementKind::Footer, "3", 1).is_page_furniture());
        assert!(!Element::new(ElementKind::Table, "a b", 1).is_page_furniture());
    }
}

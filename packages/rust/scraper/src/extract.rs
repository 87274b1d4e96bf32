//! Text and image-description extraction from source HTML.
//!
//! Image descriptions are collected first because caption lookup needs the
//! ancestor context (figure/div/p) that chrome removal may discard. Text is
//! then serialized from the tree with the chrome subtrees skipped.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use regassist_shared::{ImageDescription, RegAssistError, Result};

use crate::fetch::FetchedPage;

/// Elements whose whole subtree is dropped from the extracted text.
pub const REMOVED_ELEMENTS: [&str; 6] = ["script", "style", "nav", "footer", "header", "aside"];

/// Ancestors that delimit an image's caption context.
const CAPTION_CONTAINERS: [&str; 2] = ["figure", "div"];

/// Elements whose text can serve as a caption.
const CAPTION_ELEMENTS: [&str; 3] = ["figcaption", "caption", "p"];

/// How far up from an image the container search goes.
const MAX_ANCESTOR_DEPTH: usize = 16;

/// How far below the container the caption search goes.
const MAX_DESCENDANT_DEPTH: usize = 16;

/// Content types treated as markup or text.
const TEXT_CONTENT_TYPES: [&str; 3] = ["text/html", "application/xhtml+xml", "text/plain"];

/// Output of the extractor for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Raw visible text, whitespace untouched.
    pub text: String,
    /// One entry per described image, in document order.
    pub images: Vec<ImageDescription>,
}

/// Extract from a fetched page, rejecting bodies that are not markup or text.
pub fn extract_page(page: &FetchedPage) -> Result<Extraction> {
    if let Some(content_type) = page.content_type.as_deref() {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if !mime.is_empty() && !TEXT_CONTENT_TYPES.contains(&mime.as_str()) {
            return Err(RegAssistError::parse(format!(
                "{}: unsupported content type {mime}",
                page.url
            )));
        }
    }

    Ok(extract(&page.body))
}

/// Extract visible text and image descriptions from an HTML document.
///
/// Malformed markup never fails: the HTML5 parser recovers and whatever
/// text it could place in the tree is returned.
pub fn extract(html: &str) -> Extraction {
    let doc = Html::parse_document(html);
    if !doc.errors.is_empty() {
        debug!(errors = doc.errors.len(), "recovered from malformed HTML");
    }

    let images = image_descriptions(&doc);
    let text = visible_text(&doc);

    debug!(
        text_len = text.len(),
        images = images.len(),
        "extraction complete"
    );

    Extraction { text, images }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

fn image_descriptions(doc: &Html) -> Vec<ImageDescription> {
    let img_sel = Selector::parse("img").unwrap();

    doc.select(&img_sel)
        .filter_map(|img| {
            let alt = img.value().attr("alt").unwrap_or_default();
            let title = img.value().attr("title").unwrap_or_default();
            let caption = find_caption(img);
            ImageDescription::new(alt, title, caption.as_deref())
        })
        .collect()
}

/// Caption text for an image: the first caption-like descendant of its
/// nearest figure/div ancestor.
fn find_caption(img: ElementRef<'_>) -> Option<String> {
    let container = img
        .ancestors()
        .take(MAX_ANCESTOR_DEPTH)
        .filter_map(ElementRef::wrap)
        .find(|el| CAPTION_CONTAINERS.contains(&el.value().name()))?;

    let caption = find_caption_element(container, 0)?;
    Some(caption.text().map(str::trim).collect())
}

/// Pre-order search so the first match is the first in document order.
fn find_caption_element(node: ElementRef<'_>, depth: usize) -> Option<ElementRef<'_>> {
    if depth >= MAX_DESCENDANT_DEPTH {
        return None;
    }

    for child in node.children().filter_map(ElementRef::wrap) {
        if CAPTION_ELEMENTS.contains(&child.value().name()) {
            return Some(child);
        }
        if let Some(found) = find_caption_element(child, depth + 1) {
            return Some(found);
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Concatenate every text node outside the removed element kinds.
fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    let mut stack = vec![doc.tree.root()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                out.push_str(text);
                continue;
            }
            Node::Element(el) if REMOVED_ELEMENTS.contains(&el.name()) => continue,
            Node::Document | Node::Fragment | Node::Element(_) => {}
            _ => continue,
        }

        // Children pushed in reverse so they pop in document order.
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }

    out
}

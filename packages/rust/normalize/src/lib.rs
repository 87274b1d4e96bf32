//! Text normalization for extracted pages.
//!
//! Collapses the raw text of a page into clean lines (see [`cleanup`]) and
//! appends a block of image descriptions when the page had any.

mod cleanup;

use tracing::debug;

use regassist_shared::ImageDescription;

/// Heading of the image-description block.
pub const VISUAL_CONTENT_HEADING: &str = "--- Visual Content Descriptions ---";

/// Closing note of the image-description block.
pub const VISUAL_CONTENT_NOTE: &str = "[NOTE: These are descriptions of images from the original page. For full visual guides, visit the source URL above]";

/// Normalize extracted text and append the image-description block.
///
/// Output lines keep the original line order, and within a line the
/// left-to-right order of its phrases. A page with images but no text still
/// yields a non-empty document.
pub fn normalize(text: &str, images: &[ImageDescription]) -> String {
    let mut out = cleanup::clean_text(text);

    if !images.is_empty() {
        out.push_str("\n\n");
        out.push_str(VISUAL_CONTENT_HEADING);
        out.push('\n');
        let lines: Vec<String> = images.iter().map(ToString::to_string).collect();
        out.push_str(&lines.join("\n"));
        out.push('\n');
        out.push_str(VISUAL_CONTENT_NOTE);
    }

    debug!(
        input_len = text.len(),
        output_len = out.len(),
        images = images.len(),
        "normalized page text"
    );

    out
}

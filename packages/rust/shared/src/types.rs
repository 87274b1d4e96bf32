//! Core domain types for the registration knowledge base.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RegAssistError, Result};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// The official pages scraped into the knowledge base, in visiting order.
///
/// Only these pages (plus the fixed instructions footer) may contribute text
/// to the knowledge base.
pub const SOURCES: [&str; 3] = [
    "https://www.missouristate.edu/Registrar/FacultyAndStaff/Advisor-Toolkit.htm",
    "https://outreach.missouristate.edu/registration-services-faq.htm",
    "https://studentaffairs.missouristate.edu/academic-advising-and-program-declaration.htm",
];

/// One configured URL scraped for content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source {
    url: Url,
}

impl Source {
    /// Parse a source URL. Only `http` and `https` are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| RegAssistError::validation(format!("invalid source URL '{raw}': {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(Self { url }),
            other => Err(RegAssistError::validation(format!(
                "source URL '{raw}' has unsupported scheme '{other}'"
            ))),
        }
    }

    /// The built-in source list, in order.
    pub fn defaults() -> Vec<Self> {
        SOURCES
            .iter()
            .map(|raw| Self {
                url: Url::parse(raw).expect("built-in source URLs are valid"),
            })
            .collect()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// ---------------------------------------------------------------------------
// ImageDescription
// ---------------------------------------------------------------------------

/// Textual stand-in for an image, built from its alt text, title and nearby caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescription {
    /// `alt` attribute, trimmed.
    pub alt: String,
    /// `title` attribute, trimmed.
    pub title: String,
    /// Text of the nearest caption-like element, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl ImageDescription {
    /// Build a description, or `None` when alt, title and caption are all blank.
    pub fn new(alt: &str, title: &str, caption: Option<&str>) -> Option<Self> {
        let alt = alt.trim().to_string();
        let title = title.trim().to_string();
        let caption = caption
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        if alt.is_empty() && title.is_empty() && caption.is_none() {
            return None;
        }

        Some(Self {
            alt,
            title,
            caption,
        })
    }

    /// Alt text, falling back to the title.
    pub fn label(&self) -> &str {
        if self.alt.is_empty() {
            &self.title
        } else {
            &self.alt
        }
    }

    /// Caption to render after the label; hidden when it repeats the alt text or title.
    fn distinct_caption(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .filter(|c| *c != self.alt && *c != self.title)
    }
}

impl std::fmt::Display for ImageDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = self.label();
        match self.distinct_caption() {
            Some(caption) => write!(f, "[IMAGE DESCRIPTION: {label} - {caption}]"),
            None => write!(f, "[IMAGE DESCRIPTION: {label}]"),
        }
    }
}

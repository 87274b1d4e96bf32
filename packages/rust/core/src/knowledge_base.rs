//! Knowledge base document: rendering, persistence and quality checks.
//!
//! The document is rendered fully in memory and written with a single
//! temp-file-then-rename, so an interrupted run never leaves a partial file.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use regassist_shared::policy::{
    KEY_TERMS, KNOWLEDGE_BASE_INSTRUCTIONS, KNOWLEDGE_BASE_TITLE, METADATA_HEADING,
};
use regassist_shared::{RegAssistError, Result, Source};

/// Width of the `=` rules in the document.
const RULE_WIDTH: usize = 80;

/// One scraped source in the knowledge base body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub source: Source,
    pub content: String,
}

/// Ordered source sections plus the fixed banner and footer.
///
/// Sections can only be added by the collection pipeline, so the rendered
/// document holds nothing but source-derived text and the policy footer.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    sections: Vec<Section>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_section(&mut self, source: Source, content: String) {
        self.sections.push(Section { source, content });
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Render the flat text artifact.
    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);

        let mut parts: Vec<String> = vec![
            rule.clone(),
            KNOWLEDGE_BASE_TITLE.to_string(),
            rule.clone(),
            String::new(),
        ];

        for section in &self.sections {
            parts.push(format!("\n--- Source: {} ---\n", section.source));
            parts.push(section.content.clone());
            parts.push(format!("\n{rule}\n"));
        }

        parts.push(format!("\n{METADATA_HEADING}\n"));
        parts.push(KNOWLEDGE_BASE_INSTRUCTIONS.to_string());

        parts.join("\n")
    }
}

/// Where and what was written.
#[derive(Debug, Clone)]
pub struct PersistedArtifact {
    pub path: PathBuf,
    /// Length in characters.
    pub chars: usize,
    /// Hex SHA-256 of the bytes written.
    pub sha256: String,
}

/// Write `contents` to `path`, replacing any previous file in one rename.
#[instrument(skip(contents), fields(path = %path.display(), bytes = contents.len()))]
pub fn persist(path: &Path, contents: &str) -> Result<PersistedArtifact> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| RegAssistError::io(&parent, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| {
            RegAssistError::validation(format!("{} is not a file path", path.display()))
        })?
        .to_string_lossy();
    let temp = parent.join(format!(".{file_name}.tmp"));

    if let Err(e) = std::fs::write(&temp, contents) {
        let _ = std::fs::remove_file(&temp);
        return Err(RegAssistError::io(&temp, e));
    }

    // Atomic rename
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        RegAssistError::io(path, e)
    })?;

    let artifact = PersistedArtifact {
        path: path.to_path_buf(),
        chars: contents.chars().count(),
        sha256: sha256_hex(contents),
    };

    info!(chars = artifact.chars, sha256 = %artifact.sha256, "knowledge base written");
    Ok(artifact)
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Quality checks
// ---------------------------------------------------------------------------

/// Presence of one key term in the finished document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTermCheck {
    pub term: &'static str,
    pub description: &'static str,
    pub present: bool,
}

/// Heuristic completeness checks. Not a correctness guarantee.
#[derive(Debug, Clone)]
pub struct QualityReport {
    pub key_terms: Vec<KeyTermCheck>,
    pub total_chars: usize,
    /// Set when the document is shorter than the configured minimum.
    pub is_small: bool,
}

impl QualityReport {
    pub fn missing_terms(&self) -> impl Iterator<Item = &KeyTermCheck> {
        self.key_terms.iter().filter(|c| !c.present)
    }
}

/// Run the key-term and size checks on a rendered knowledge base.
pub fn quality_report(document: &str, min_chars: usize) -> QualityReport {
    let haystack = document.to_lowercase();

    let key_terms = KEY_TERMS
        .iter()
        .map(|&(term, description)| KeyTermCheck {
            term,
            description,
            present: haystack.contains(&term.to_lowercase()),
        })
        .collect();

    let total_chars = document.chars().count();
    let report = QualityReport {
        key_terms,
        total_chars,
        is_small: total_chars < min_chars,
    };

    debug!(
        missing = report.missing_terms().count(),
        is_small = report.is_small,
        "quality checks complete"
    );

    report
}

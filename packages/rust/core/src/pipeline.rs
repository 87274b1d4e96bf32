//! End-to-end `collect` pipeline: sources → fetch → extract → normalize → knowledge base.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use regassist_scraper::{Fetcher, extract_page};
use regassist_shared::{RegAssistError, Result, ScrapeConfig, Source};

use crate::knowledge_base::{self, KnowledgeBase, QualityReport};

/// Why a source did not make it into the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Network error, timeout or non-2xx status.
    Fetch(String),
    /// The response was not a usable page.
    Parse(String),
    /// Cleaned text was not longer than the minimum.
    InsufficientContent { chars: usize, min: usize },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            Self::Parse(msg) => write!(f, "unusable page: {msg}"),
            Self::InsufficientContent { chars, min } => {
                write!(f, "insufficient content ({chars} chars, need more than {min})")
            }
        }
    }
}

/// Terminal state of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Succeeded,
    Failed(FailureReason),
}

/// Outcome of one source visit.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: Source,
    pub status: SourceStatus,
    /// Characters of normalized text (0 when nothing was extracted).
    pub chars: usize,
}

impl SourceReport {
    pub fn succeeded(&self) -> bool {
        self.status == SourceStatus::Succeeded
    }
}

/// Result of the `collect` pipeline.
#[derive(Debug)]
pub struct CollectResult {
    /// One report per source, in visiting order.
    pub reports: Vec<SourceReport>,
    pub succeeded: usize,
    pub failed: usize,
    /// Path of the written knowledge base.
    pub output_path: PathBuf,
    /// Length of the written knowledge base in characters.
    pub total_chars: usize,
    /// Hex SHA-256 of the written knowledge base.
    pub sha256: String,
    pub quality: QualityReport,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a source is fetched. `current` is 1-based.
    fn source_started(&self, source: &Source, current: usize, total: usize);
    /// Called once a source reaches a terminal state.
    fn source_finished(&self, report: &SourceReport);
    /// Called after the knowledge base has been written.
    fn persisted(&self, path: &std::path::Path, chars: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &CollectResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn source_started(&self, _source: &Source, _current: usize, _total: usize) {}
    fn source_finished(&self, _report: &SourceReport) {}
    fn persisted(&self, _path: &std::path::Path, _chars: usize) {}
    fn done(&self, _result: &CollectResult) {}
}

/// Run the full `collect` pipeline.
///
/// 1. Visit each source in order, pausing between consecutive sources
/// 2. Fetch, extract and normalize the page
/// 3. Keep pages whose cleaned text exceeds the minimum
/// 4. Render and persist the knowledge base
/// 5. Run the quality checks
///
/// Per-source failures are recorded and skipped. Only a failure to write
/// the knowledge base is returned as an error.
#[instrument(skip_all, fields(sources = config.sources.len(), output = %config.output_path.display()))]
pub async fn collect(
    config: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<CollectResult> {
    let fetcher = Fetcher::new(config.timeout)?;
    collect_with(config, &fetcher, progress).await
}

/// Run the pipeline with a caller-supplied fetcher.
pub async fn collect_with(
    config: &ScrapeConfig,
    fetcher: &Fetcher,
    progress: &dyn ProgressReporter,
) -> Result<CollectResult> {
    let start = Instant::now();
    let total = config.sources.len();
    let mut kb = KnowledgeBase::new();
    let mut reports = Vec::with_capacity(total);

    info!(total, "starting collection");

    for (index, source) in config.sources.iter().enumerate() {
        if index > 0 && !config.politeness_delay.is_zero() {
            debug!(delay_ms = config.politeness_delay.as_millis() as u64, "politeness delay");
            tokio::time::sleep(config.politeness_delay).await;
        }

        progress.source_started(source, index + 1, total);

        let report = match scrape_source(fetcher, source).await {
            Ok(content) => {
                let chars = content.chars().count();
                if chars > config.min_content_chars {
                    info!(url = %source, chars, "source scraped");
                    kb.push_section(source.clone(), content);
                    SourceReport {
                        source: source.clone(),
                        status: SourceStatus::Succeeded,
                        chars,
                    }
                } else {
                    warn!(url = %source, chars, min = config.min_content_chars, "insufficient content");
                    SourceReport {
                        source: source.clone(),
                        status: SourceStatus::Failed(FailureReason::InsufficientContent {
                            chars,
                            min: config.min_content_chars,
                        }),
                        chars,
                    }
                }
            }
            Err(e) if e.is_source_local() => {
                warn!(url = %source, error = %e, "source skipped");
                let reason = match e {
                    RegAssistError::Parse { message } => FailureReason::Parse(message),
                    other => FailureReason::Fetch(other.to_string()),
                };
                SourceReport {
                    source: source.clone(),
                    status: SourceStatus::Failed(reason),
                    chars: 0,
                }
            }
            Err(e) => return Err(e),
        };

        progress.source_finished(&report);
        reports.push(report);
    }

    let document = kb.render();
    let artifact = knowledge_base::persist(&config.output_path, &document)?;
    progress.persisted(&artifact.path, artifact.chars);

    let quality = knowledge_base::quality_report(&document, config.min_knowledge_base_chars);
    if quality.is_small {
        warn!(
            chars = quality.total_chars,
            min = config.min_knowledge_base_chars,
            "knowledge base is smaller than expected"
        );
    }

    let succeeded = reports.iter().filter(|r| r.succeeded()).count();
    let result = CollectResult {
        failed: reports.len() - succeeded,
        succeeded,
        reports,
        output_path: artifact.path,
        total_chars: artifact.chars,
        sha256: artifact.sha256,
        quality,
        elapsed: start.elapsed(),
    };

    info!(
        succeeded = result.succeeded,
        total,
        chars = result.total_chars,
        sha256 = %result.sha256,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "collection complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Fetch, extract and normalize one source.
async fn scrape_source(fetcher: &Fetcher, source: &Source) -> Result<String> {
    let page = fetcher.fetch(source).await?;
    let extraction = extract_page(&page)?;
    Ok(regassist_normalize::normalize(
        &extraction.text,
        &extraction.images,
    ))
}

use std::{future::Future, sync::Arc, sync::LazyLock, time::Duration};

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    api::SourceApi,
    config::{DEFAULT_KEY_EXCERPT_CHARS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_VERIFY_PREFIX_CHARS},
    sanitize::sanitize_html,
    table::{looks_tabular, normalize_tables},
    types::{normalize_whitespace, Citation, ContentOrigin, ExpandRequest, ResolvedContent, Section},
};

/// Leading "[Schedule: Fees] [Table 2]" style metadata on an excerpt.
static LEADING_METADATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\[[^\]]*\]\s*)+")
        .unwrap_or_else(|e| unreachable!("invalid metadata pattern: {e}"))
});

/// Level prefixes of structured element ids.
const KNOWN_ID_PREFIXES: &[&str] = &[
    "sec_", "subsec_", "para_", "subpara_", "art_", "chp_", "part_", "reg_", "rule_", "item_",
];

/// Ids naming schedule or table data rather than a structural section.
const TABULAR_ID_MARKERS: &[&str] = &["sched", "table", "tbl"];

#[derive(Debug, Clone)]
pub struct ResolveSettings {
    pub verify_prefix_chars: usize,
    pub key_excerpt_chars: usize,
    /// Deadline per backend call. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            verify_prefix_chars: DEFAULT_VERIFY_PREFIX_CHARS,
            key_excerpt_chars: DEFAULT_KEY_EXCERPT_CHARS,
            request_timeout: Some(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)),
        }
    }
}

/// Whether a `section_id` is worth a direct section lookup.
pub fn looks_like_section_id(section_id: &str) -> bool {
    let id = section_id.trim().to_ascii_lowercase();
    if id.is_empty() || TABULAR_ID_MARKERS.iter().any(|m| id.contains(m)) {
        return false;
    }
    id.contains("__") || KNOWN_ID_PREFIXES.iter().any(|p| id.starts_with(p))
}

/// The normalized, lowercased excerpt opening that a fetched section must contain.
pub fn verification_probe(excerpt: &str, chars: usize) -> Option<String> {
    let stripped = LEADING_METADATA_RE.replace(excerpt, "");
    let normalized = normalize_whitespace(&stripped);
    // Truncation ellipses are not part of the source text.
    let probe: String = normalized
        .trim_matches(|c: char| c == '.' || c == '…' || c.is_whitespace())
        .chars()
        .take(chars)
        .collect::<String>()
        .trim_end()
        .to_lowercase();
    (!probe.is_empty()).then_some(probe)
}

/// Case- and whitespace-insensitive check that `section_content` contains the excerpt opening.
pub fn content_matches(section_content: &str, excerpt: &str, chars: usize) -> bool {
    match verification_probe(excerpt, chars) {
        Some(probe) => normalize_whitespace(section_content)
            .to_lowercase()
            .contains(&probe),
        None => false,
    }
}

enum Outcome<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

async fn guarded<T>(
    cancel: &CancellationToken,
    deadline: Option<Duration>,
    fut: impl Future<Output = T>,
) -> Outcome<T> {
    let timed = async move {
        match deadline {
            Some(d) => tokio::time::timeout(d, fut).await.ok(),
            None => Some(fut.await),
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Outcome::Cancelled,
        r = timed => match r {
            Some(v) => Outcome::Done(v),
            None => Outcome::TimedOut,
        },
    }
}

/// Resolves a citation's truncated excerpt into the fullest verified content available.
///
/// Strategy: a direct section lookup for non-tabular excerpts with a structured id,
/// accepted only if the section contains the excerpt opening; otherwise the
/// excerpt-expansion endpoint; otherwise the excerpt itself.
pub struct ContentExpander {
    api: Arc<dyn SourceApi>,
    settings: ResolveSettings,
}

impl ContentExpander {
    pub fn new(api: Arc<dyn SourceApi>, settings: ResolveSettings) -> Self {
        Self { api, settings }
    }

    pub fn settings(&self) -> &ResolveSettings {
        &self.settings
    }

    /// Resolve `citation`. Returns `None` only if `cancel` fired first.
    ///
    /// Backend failures are logged and never surface: the worst case is the excerpt.
    pub async fn resolve(
        &self,
        citation: &Citation,
        cancel: &CancellationToken,
    ) -> Option<ResolvedContent> {
        let tabular = looks_tabular(&citation.excerpt);

        if let Some(section_id) = citation.section_id.as_deref() {
            if !tabular && looks_like_section_id(section_id) {
                match self.try_section(citation, section_id, cancel).await {
                    Outcome::Done(Some(resolved)) => return Some(resolved),
                    Outcome::Cancelled => return None,
                    Outcome::Done(None) | Outcome::TimedOut => {}
                }
            }
        }

        match self.try_expansion(citation, cancel).await {
            Outcome::Done(Some(resolved)) => Some(resolved),
            Outcome::Cancelled => None,
            Outcome::Done(None) | Outcome::TimedOut => Some(ResolvedContent::from_excerpt(citation)),
        }
    }

    async fn try_section(
        &self,
        citation: &Citation,
        section_id: &str,
        cancel: &CancellationToken,
    ) -> Outcome<Option<ResolvedContent>> {
        let fetched = guarded(
            cancel,
            self.settings.request_timeout,
            self.api.fetch_section(&citation.document_id, section_id),
        )
        .await;

        let section = match fetched {
            Outcome::Done(Ok(Some(section))) => section,
            Outcome::Done(Ok(None)) => {
                debug!(document_id = %citation.document_id, section_id, "section not found");
                return Outcome::Done(None);
            }
            Outcome::Done(Err(e)) => {
                warn!(document_id = %citation.document_id, section_id, "section fetch failed: {e:#}");
                return Outcome::Done(None);
            }
            Outcome::TimedOut => {
                warn!(document_id = %citation.document_id, section_id, "section fetch timed out");
                return Outcome::TimedOut;
            }
            Outcome::Cancelled => return Outcome::Cancelled,
        };

        if !content_matches(&section.content, &citation.excerpt, self.settings.verify_prefix_chars) {
            debug!(
                document_id = %citation.document_id,
                section_id,
                eid = %section.eid,
                "section content does not contain excerpt, falling back to expansion"
            );
            return Outcome::Done(None);
        }

        Outcome::Done(Some(from_section(section)))
    }

    async fn try_expansion(
        &self,
        citation: &Citation,
        cancel: &CancellationToken,
    ) -> Outcome<Option<ResolvedContent>> {
        let request = ExpandRequest::for_citation(citation);
        let expanded = match guarded(
            cancel,
            self.settings.request_timeout,
            self.api.expand_source(&request),
        )
        .await
        {
            Outcome::Done(Ok(expanded)) => expanded,
            Outcome::Done(Err(e)) => {
                warn!(document_id = %citation.document_id, "source expansion failed: {e:#}");
                return Outcome::Done(None);
            }
            Outcome::TimedOut => {
                warn!(document_id = %citation.document_id, "source expansion timed out");
                return Outcome::TimedOut;
            }
            Outcome::Cancelled => return Outcome::Cancelled,
        };

        // Never regress to shorter text.
        let longer =
            expanded.full_excerpt.trim().chars().count() > citation.excerpt.trim().chars().count();
        let (content, origin) = if longer {
            (expanded.full_excerpt, ContentOrigin::Expansion)
        } else {
            (citation.excerpt.clone(), ContentOrigin::Excerpt)
        };
        debug!(
            document_id = %citation.document_id,
            expanded = longer,
            tables = expanded.tables.len(),
            "source expansion resolved"
        );

        Outcome::Done(Some(ResolvedContent {
            content,
            html: None,
            tables: normalize_tables(expanded.tables),
            section_data: None,
            section_id: expanded.section_id.or_else(|| citation.section_id.clone()),
            origin,
        }))
    }
}

fn from_section(section: Section) -> ResolvedContent {
    ResolvedContent {
        content: section.content.clone(),
        html: section.html_content.as_deref().map(sanitize_html),
        tables: Vec::new(),
        section_id: Some(section.eid.clone()),
        section_data: Some(section),
        origin: ContentOrigin::Section,
    }
}

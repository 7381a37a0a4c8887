use serde::{Deserialize, Serialize};

// ── Citations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Act,
    Judgment,
    Regulation,
    Constitution,
}

/// A backend-supplied reference from an AI answer to an excerpt of a source document.
///
/// The `excerpt` is always renderable as-is; it is the fallback until expansion succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub document_type: DocumentType,
    pub title: String,
    #[serde(default)]
    pub human_readable_id: String,
    pub excerpt: String,
    #[serde(default)]
    pub relevance_score: f64,
    /// Free-text breadcrumb label, e.g. "Part II > 9. Equality".
    #[serde(default)]
    pub section: Option<String>,
    /// Structured element id, e.g. "sec_9__subsec_2". May be partial or absent.
    #[serde(default)]
    pub section_id: Option<String>,
    /// Pre-formatted reference computed by the backend.
    #[serde(default)]
    pub legal_reference: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<String>,
}

impl Citation {
    /// Whether two citations point at the same quoted passage.
    pub fn same_source(&self, other: &Citation) -> bool {
        self.document_id == other.document_id
            && self.section_id == other.section_id
            && self.excerpt == other.excerpt
    }
}

/// Answer payload from the chat/research endpoint. Only the citations are consumed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(alias = "response")]
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

// ── Sections ─────────────────────────────────────────────────────────────

/// One ancestor in a section's hierarchy path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub identifier: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub eid: String,
    pub section_type: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub heading: Option<String>,
    pub content: String,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub parent_eid: Option<String>,
    #[serde(default)]
    pub children_eids: Vec<String>,
    #[serde(default)]
    pub hierarchy_path: Vec<HierarchyNode>,
    #[serde(default)]
    pub legal_reference: Option<String>,
}

// ── Expansion ────────────────────────────────────────────────────────────

fn default_header_rows() -> Vec<usize> {
    vec![0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedTable {
    pub rows: Vec<Vec<String>>,
    #[serde(default = "default_header_rows")]
    pub header_rows: Vec<usize>,
    #[serde(default)]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedSource {
    pub full_excerpt: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub tables: Vec<ExpandedTable>,
    /// Neighbouring retrieval chunks. Not rendered yet.
    #[serde(default)]
    pub adjacent_chunks: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandRequest {
    pub document_id: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
}

impl ExpandRequest {
    pub fn for_citation(citation: &Citation) -> Self {
        Self {
            document_id: citation.document_id.clone(),
            excerpt: citation.excerpt.clone(),
            section: citation.section.clone(),
            chunk_id: citation.chunk_id.clone(),
        }
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Where the displayed content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentOrigin {
    /// The citation's own excerpt (nothing better was found).
    Excerpt,
    /// A verified direct section lookup.
    Section,
    /// The excerpt-expansion endpoint returned longer text.
    Expansion,
}

/// Output of the content expander for one citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContent {
    pub content: String,
    /// Sanitized rich form, when the section carried one.
    pub html: Option<String>,
    pub tables: Vec<ExpandedTable>,
    pub section_data: Option<Section>,
    pub section_id: Option<String>,
    pub origin: ContentOrigin,
}

impl ResolvedContent {
    /// The unresolved rendering of a citation.
    pub fn from_excerpt(citation: &Citation) -> Self {
        Self {
            content: citation.excerpt.clone(),
            html: None,
            tables: Vec::new(),
            section_data: None,
            section_id: citation.section_id.clone(),
            origin: ContentOrigin::Excerpt,
        }
    }

    pub fn is_section_content(&self) -> bool {
        self.origin == ContentOrigin::Section
    }
}

// ── Source keys ──────────────────────────────────────────────────────────

/// Identity of a resolution target.
///
/// Two citations from the same document and section can quote different passages,
/// so the excerpt prefix is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    pub document_id: String,
    pub section_id: Option<String>,
    pub section: Option<String>,
    pub excerpt_prefix: String,
}

impl SourceKey {
    pub fn for_citation(citation: &Citation, excerpt_chars: usize) -> Self {
        let normalized = normalize_whitespace(&citation.excerpt);
        Self {
            document_id: citation.document_id.clone(),
            section_id: citation.section_id.clone(),
            section: citation.section.clone(),
            excerpt_prefix: normalized.chars().take(excerpt_chars).collect(),
        }
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            self.document_id,
            self.section_id.as_deref().unwrap_or("-")
        )
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

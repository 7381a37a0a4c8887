use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ExpandRequest, ExpandedSource, Section};

/// Read-only access to the document backend.
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Fetch one structural section. `Ok(None)` means the backend has no such section.
    async fn fetch_section(&self, document_id: &str, section_id: &str) -> Result<Option<Section>>;

    /// Ask the backend to widen a truncated excerpt.
    async fn expand_source(&self, request: &ExpandRequest) -> Result<ExpandedSource>;
}

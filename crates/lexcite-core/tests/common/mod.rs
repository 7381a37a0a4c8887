#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use lexcite_core::{
    api::SourceApi, Citation, DocumentType, ExpandRequest, ExpandedSource, ExpandedTable, Section,
};
use tokio::sync::Notify;

pub fn citation(document_id: &str, excerpt: &str, section_id: Option<&str>) -> Citation {
    Citation {
        document_id: document_id.into(),
        document_type: DocumentType::Act,
        title: format!("Title of {document_id}"),
        human_readable_id: document_id.to_uppercase(),
        excerpt: excerpt.into(),
        relevance_score: 0.8,
        section: None,
        section_id: section_id.map(str::to_string),
        legal_reference: None,
        chunk_id: None,
    }
}

pub fn section(eid: &str, section_type: &str, number: &str, content: &str) -> Section {
    Section {
        eid: eid.into(),
        section_type: section_type.into(),
        number: Some(number.into()),
        heading: None,
        content: content.into(),
        html_content: None,
        parent_eid: None,
        children_eids: Vec::new(),
        hierarchy_path: Vec::new(),
        legal_reference: None,
    }
}

pub fn expansion(full_excerpt: &str) -> ExpandedSource {
    ExpandedSource {
        full_excerpt: full_excerpt.into(),
        section: None,
        section_id: None,
        tables: Vec::new(),
        adjacent_chunks: Vec::new(),
    }
}

pub fn table(rows: &[&[&str]]) -> ExpandedTable {
    ExpandedTable {
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
        header_rows: vec![0],
        section: None,
    }
}

/// In-memory backend with per-document gates and call counters.
#[derive(Default)]
pub struct MockApi {
    sections: HashMap<(String, String), Section>,
    expansions: HashMap<String, ExpandedSource>,
    failing_documents: Vec<String>,
    gates: HashMap<String, Arc<Notify>>,
    delay: Option<Duration>,
    pub section_calls: AtomicUsize,
    pub expand_calls: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, document_id: &str, section_id: &str, section: Section) -> Self {
        self.sections
            .insert((document_id.into(), section_id.into()), section);
        self
    }

    pub fn with_expansion(mut self, document_id: &str, expanded: ExpandedSource) -> Self {
        self.expansions.insert(document_id.into(), expanded);
        self
    }

    pub fn failing(mut self, document_id: &str) -> Self {
        self.failing_documents.push(document_id.into());
        self
    }

    /// Hold every call for `document_id` until the returned notify fires.
    pub fn gated(mut self, document_id: &str) -> (Self, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        self.gates.insert(document_id.into(), notify.clone());
        (self, notify)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.section_calls.load(Ordering::SeqCst),
            self.expand_calls.load(Ordering::SeqCst),
        )
    }

    async fn wait(&self, document_id: &str) {
        if let Some(gate) = self.gates.get(document_id) {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SourceApi for MockApi {
    async fn fetch_section(&self, document_id: &str, section_id: &str) -> Result<Option<Section>> {
        self.section_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(document_id).await;
        if self.failing_documents.iter().any(|d| d == document_id) {
            bail!("connection refused");
        }
        Ok(self
            .sections
            .get(&(document_id.to_string(), section_id.to_string()))
            .cloned())
    }

    async fn expand_source(&self, request: &ExpandRequest) -> Result<ExpandedSource> {
        self.expand_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(&request.document_id).await;
        if self.failing_documents.iter().any(|d| *d == request.document_id) {
            bail!("connection refused");
        }
        match self.expansions.get(&request.document_id) {
            Some(e) => Ok(e.clone()),
            None => bail!("404 Not Found"),
        }
    }
}

use tracing::debug;

use crate::types::Citation;

/// Which citation of the current answer is shown, and whether the panel is open.
///
/// `all_sources[i]` is citation number `i + 1`. Transitions return `true` only when
/// the active index actually changed; out-of-range moves are no-ops, never errors.
#[derive(Debug, Default, Clone)]
pub struct CitationNavigator {
    all_sources: Vec<Citation>,
    current_index: usize,
    is_open: bool,
}

impl CitationNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the panel on `citation`.
    ///
    /// A citation missing from `all_sources` is shown on its own.
    pub fn open(&mut self, citation: Citation, all_sources: Vec<Citation>) {
        match all_sources.iter().position(|s| s.same_source(&citation)) {
            Some(index) => {
                self.all_sources = all_sources;
                self.current_index = index;
            }
            None => {
                debug!(
                    document_id = %citation.document_id,
                    "opened citation not in source list, showing it alone"
                );
                self.all_sources = vec![citation];
                self.current_index = 0;
            }
        }
        self.is_open = true;
    }

    pub fn next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.current_index += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if !self.can_go_previous() {
            return false;
        }
        self.current_index -= 1;
        true
    }

    pub fn go_to_index(&mut self, index: usize) -> bool {
        if !self.is_open || index >= self.all_sources.len() || index == self.current_index {
            return false;
        }
        self.current_index = index;
        true
    }

    /// Close the panel. The active source is kept for display but navigation stops.
    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn all_sources(&self) -> &[Citation] {
        &self.all_sources
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn active_source(&self) -> Option<&Citation> {
        self.all_sources.get(self.current_index)
    }

    /// 1-based number shown next to the citation marker.
    pub fn active_citation_number(&self) -> Option<usize> {
        self.active_source().map(|_| self.current_index + 1)
    }

    pub fn can_go_previous(&self) -> bool {
        self.is_open && self.current_index > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.is_open && self.current_index + 1 < self.all_sources.len()
    }
}

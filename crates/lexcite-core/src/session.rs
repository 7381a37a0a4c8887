//! The citation side panel's state: navigation, per-session cache, and the
//! single in-flight resolution for the active source.

use std::sync::Arc;

use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    api::SourceApi,
    cache::SourceContentCache,
    config::Config,
    events::{EventBus, SessionEvent},
    expander::{ContentExpander, ResolveSettings},
    navigation::CitationNavigator,
    reference::display_label,
    table::{looks_tabular, parse_table_from_text, TextTable},
    types::{Citation, ContentOrigin, ExpandedTable, ResolvedContent, SourceKey},
};

/// Per-source UI toggles. Reset whenever the active source changes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub show_raw: bool,
    pub scroll_offset: u32,
}

/// What the panel should render for the active source right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayContent {
    pub label: String,
    pub text: String,
    pub html: Option<String>,
    pub tables: Vec<ExpandedTable>,
    /// Best-effort reconstruction when the text is tabular and no structured table exists.
    pub text_table: Option<TextTable>,
    pub section_id: Option<String>,
    pub origin: ContentOrigin,
    /// A resolution is still running; `text` is the raw excerpt.
    pub is_loading: bool,
}

impl DisplayContent {
    fn build(citation: &Citation, resolved: Option<&ResolvedContent>, is_loading: bool) -> Self {
        let fallback;
        let resolved = match resolved {
            Some(r) => r,
            None => {
                fallback = ResolvedContent::from_excerpt(citation);
                &fallback
            }
        };
        let text_table = if resolved.tables.is_empty() && looks_tabular(&resolved.content) {
            parse_table_from_text(&resolved.content)
        } else {
            None
        };
        Self {
            label: display_label(citation, resolved.section_data.as_ref()),
            text: resolved.content.clone(),
            html: resolved.html.clone(),
            tables: resolved.tables.clone(),
            text_table,
            section_id: resolved.section_id.clone(),
            origin: resolved.origin,
            is_loading,
        }
    }
}

/// Everything the source panel reads.
#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    pub active_source: Option<Citation>,
    pub active_citation_number: Option<usize>,
    pub is_panel_open: bool,
    pub all_sources: Vec<Citation>,
    pub current_index: usize,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    pub view: ViewState,
    pub content: Option<DisplayContent>,
}

struct InFlight {
    key: SourceKey,
    cancel: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct SessionState {
    nav: CitationNavigator,
    cache: SourceContentCache,
    view: ViewState,
    current_key: Option<SourceKey>,
    in_flight: Option<InFlight>,
    /// Bumped for every spawned resolution.
    generation: u64,
    pending: Option<(u64, JoinHandle<()>)>,
}

/// One open-or-closed citation panel bound to an answer's citations.
///
/// Only the most recent resolution for the active source may write to the cache;
/// anything started for a source that is no longer active is cancelled and its
/// result dropped.
pub struct CitationSession {
    expander: Arc<ContentExpander>,
    state: Arc<Mutex<SessionState>>,
    events: EventBus<SessionEvent>,
}

impl CitationSession {
    pub fn new(api: Arc<dyn SourceApi>, settings: ResolveSettings) -> Self {
        Self {
            expander: Arc::new(ContentExpander::new(api, settings)),
            state: Arc::new(Mutex::new(SessionState::default())),
            events: EventBus::default(),
        }
    }

    pub fn from_config(api: Arc<dyn SourceApi>, config: &Config) -> Self {
        Self::new(api, config.resolve_settings()).with_events(EventBus::new(config.event_buffer))
    }

    pub fn with_events(mut self, events: EventBus<SessionEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.events
    }

    pub async fn open(&self, citation: Citation, all_sources: Vec<Citation>) {
        let mut st = self.state.lock().await;
        st.nav.open(citation, all_sources);
        info!(
            index = st.nav.current_index(),
            total = st.nav.all_sources().len(),
            "citation panel opened"
        );
        self.activate(&mut st);
    }

    pub async fn next(&self) -> bool {
        self.transition(CitationNavigator::next).await
    }

    pub async fn previous(&self) -> bool {
        self.transition(CitationNavigator::previous).await
    }

    pub async fn go_to_index(&self, index: usize) -> bool {
        self.transition(|nav| nav.go_to_index(index)).await
    }

    pub async fn close(&self) {
        let mut st = self.state.lock().await;
        st.nav.close();
        if let Some(prev) = st.in_flight.take() {
            prev.cancel.cancel();
        }
        st.cache.clear();
        st.view = ViewState::default();
        st.current_key = None;
        drop(st);
        self.events.emit(SessionEvent::PanelClosed);
        debug!("citation panel closed");
    }

    pub async fn toggle_raw_view(&self) -> bool {
        let mut st = self.state.lock().await;
        st.view.show_raw = !st.view.show_raw;
        st.view.show_raw
    }

    pub async fn set_scroll_offset(&self, offset: u32) {
        self.state.lock().await.view.scroll_offset = offset;
    }

    /// Wait for the most recently started resolution, if any, to finish.
    ///
    /// A resolution task that panicked is logged and no longer reported as loading.
    pub async fn settle(&self) {
        let pending = self.state.lock().await.pending.take();
        let Some((generation, handle)) = pending else {
            return;
        };
        if let Err(e) = handle.await {
            warn!(generation, "citation resolution task failed: {e}");
            let mut st = self.state.lock().await;
            if st.in_flight.as_ref().is_some_and(|f| f.generation == generation) {
                st.in_flight = None;
            }
        }
    }

    pub async fn snapshot(&self) -> PanelSnapshot {
        let st = self.state.lock().await;
        let active = st.nav.active_source().cloned();
        let content = active.as_ref().map(|citation| {
            let resolved = st
                .current_key
                .as_ref()
                .and_then(|key| st.cache.get(key))
                .map(|entry| &entry.resolved);
            DisplayContent::build(citation, resolved, st.in_flight.is_some())
        });
        PanelSnapshot {
            active_citation_number: st.nav.active_citation_number(),
            is_panel_open: st.nav.is_open(),
            all_sources: st.nav.all_sources().to_vec(),
            current_index: st.nav.current_index(),
            can_go_next: st.nav.can_go_next(),
            can_go_previous: st.nav.can_go_previous(),
            view: st.view,
            active_source: active,
            content,
        }
    }

    async fn transition(&self, step: impl FnOnce(&mut CitationNavigator) -> bool) -> bool {
        let mut st = self.state.lock().await;
        if !step(&mut st.nav) {
            return false;
        }
        self.activate(&mut st);
        true
    }

    /// Point the session at the navigator's active source and start resolving it on a miss.
    fn activate(&self, st: &mut SessionState) {
        st.view = ViewState::default();
        if let Some(prev) = st.in_flight.take() {
            debug!(key = %prev.key, "cancelling resolution for inactive source");
            prev.cancel.cancel();
        }

        let Some(citation) = st.nav.active_source().cloned() else {
            st.current_key = None;
            return;
        };
        let key = SourceKey::for_citation(&citation, self.expander.settings().key_excerpt_chars);
        st.current_key = Some(key.clone());
        self.events.emit(SessionEvent::ActiveChanged {
            index: st.nav.current_index(),
            key: key.clone(),
        });

        if st.cache.contains(&key) {
            debug!(key = %key, "source already resolved");
            return;
        }

        let cancel = CancellationToken::new();
        st.generation += 1;
        let generation = st.generation;
        st.in_flight = Some(InFlight {
            key: key.clone(),
            cancel: cancel.clone(),
            generation,
        });

        let expander = Arc::clone(&self.expander);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let Some(resolved) = expander.resolve(&citation, &cancel).await else {
                debug!(key = %key, "resolution cancelled");
                return;
            };
            let mut st = state.lock().await;
            if st.current_key.as_ref() != Some(&key) || cancel.is_cancelled() {
                debug!(key = %key, "discarding stale resolution");
                return;
            }
            st.cache.set(key.clone(), resolved);
            st.in_flight = None;
            drop(st);
            events.emit(SessionEvent::ContentResolved { key });
        });
        st.pending = Some((generation, handle));
    }
}

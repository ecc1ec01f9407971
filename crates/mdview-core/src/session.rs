//! The session controller.
//!
//! Owns the current document and decides which source wins on open, refresh
//! and startup restore. All host effects go through [`SessionPlatform`].
//!
//! Commands take `&self` and may interleave at their await points: a second
//! `open` issued while the first is still reading is legal. Each load is
//! tagged with a load token (issue ticket plus target identity) and only
//! applies its result if that token is still the latest one issued. State
//! borrows are never held across an await.

use std::cell::RefCell;

use crate::config::ViewerConfig;
use crate::error::{ExportError, FileError, StoreError};
use crate::export::{ExportKind, ExportRequest, check_export, png_file_name};
use crate::identity::{DocumentId, IdentityGenerator, now_ms};
use crate::locator::{SessionLocator, read_locator, update_locator};
use crate::outline::OutlineEntry;
use crate::perf::Stopwatch;
use crate::platform::{
    FilePicker, FileReference, LocalFile, Notice, PickedFile, SessionPlatform, Viewport,
};
use crate::record::{AccessMode, DocumentRecord};
use crate::scroll::active_heading;
use crate::store::{DurableStore, FastStore};
use crate::strategy::{RefreshStep, RestoreStep, refresh_plan, restore_plan};
use crate::toolbar::ToolbarState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing readable is shown.
    #[default]
    Empty,
    /// A load was issued and has not settled.
    Loading,
    /// Cached text is shown while a live re-read is in flight.
    StaleReady,
    Ready,
}

/// Bumped on every content replacement.
///
/// Render, outline and diagram signals carry the version they were produced
/// for, and are dropped if the content has moved on since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentVersion(u64);

impl ContentVersion {
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(DocumentId),
    /// The file could not be read. Its name is kept, its content is empty.
    ReadFailed(DocumentId),
    /// Not a file the viewer accepts. Nothing changed.
    Rejected,
    /// A later command took over before this one finished.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New text under the same identity.
    Refreshed(DocumentId),
    /// The picker returned a different file, opened under a new identity.
    Reopened(DocumentId),
    NothingToRefresh,
    /// The picker was dismissed.
    Cancelled,
    /// Every source failed. The shown content is unchanged.
    Failed,
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No locator, or the locator names a session that is gone.
    Nothing,
    /// The cached text is shown as-is.
    Cached(DocumentId),
    /// The file was re-read through its escrowed reference.
    Live(DocumentId),
    Superseded,
}

/// Answer to [`Notice::StalePrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleChoice {
    ReloadLatest,
    KeepCached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Load {
    ticket: u64,
    id: DocumentId,
}

#[derive(Debug, thiserror::Error)]
enum LiveReadFailure {
    #[error("no escrowed file reference")]
    NotEscrowed,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error("reference now names {found:?}, expected {expected:?}")]
    NameMismatch { expected: String, found: String },
}

struct SessionState<F, R> {
    phase: SessionPhase,
    document: Option<DocumentRecord>,
    identity: Option<DocumentId>,
    file: Option<F>,
    reference: Option<R>,
    outline: Vec<OutlineEntry>,
    diagrams_ready: bool,
    version: ContentVersion,
    /// The host has rendered the current version.
    rendered: bool,
    ticket: u64,
    latest: Option<Load>,
    /// Heading to scroll to once the outline for the current content exists.
    pending_anchor: Option<String>,
    /// Last heading written by scroll tracking or navigation.
    tracked_heading: Option<String>,
}

impl<F, R> Default for SessionState<F, R> {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Empty,
            document: None,
            identity: None,
            file: None,
            reference: None,
            outline: Vec::new(),
            diagrams_ready: false,
            version: ContentVersion::default(),
            rendered: false,
            ticket: 0,
            latest: None,
            pending_anchor: None,
            tracked_heading: None,
        }
    }
}

impl<F, R> SessionState<F, R> {
    fn bump(&mut self) {
        self.version = self.version.next();
        self.rendered = false;
        self.diagrams_ready = false;
    }

    /// A restore is over. An anchor already scrolled to for the shown
    /// version gets no second render to wait for.
    fn drop_consumed_anchor(&mut self) {
        if self.rendered {
            self.pending_anchor = None;
        }
    }

    /// The phase to fall back to when a load ends without new content.
    fn settled_phase(&self) -> SessionPhase {
        match &self.document {
            Some(doc) if doc.has_content() => SessionPhase::Ready,
            _ => SessionPhase::Empty,
        }
    }
}

pub struct SessionController<P: SessionPlatform> {
    platform: P,
    config: ViewerConfig,
    ids: IdentityGenerator,
    state: RefCell<SessionState<P::File, P::Reference>>,
}

impl<P: SessionPlatform> SessionController<P> {
    pub fn new(platform: P, config: ViewerConfig) -> Self {
        Self {
            platform,
            config,
            ids: IdentityGenerator::new(),
            state: RefCell::new(SessionState::default()),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    pub fn document(&self) -> Option<DocumentRecord> {
        self.state.borrow().document.clone()
    }

    pub fn identity(&self) -> Option<DocumentId> {
        self.state.borrow().identity.clone()
    }

    pub fn outline(&self) -> Vec<OutlineEntry> {
        self.state.borrow().outline.clone()
    }

    pub fn diagrams_ready(&self) -> bool {
        self.state.borrow().diagrams_ready
    }

    pub fn content_version(&self) -> ContentVersion {
        self.state.borrow().version
    }

    pub fn has_reference(&self) -> bool {
        self.state.borrow().reference.is_some()
    }

    pub fn toolbar(&self) -> ToolbarState {
        let state = self.state.borrow();
        ToolbarState::derive(state.document.as_ref(), state.diagrams_ready)
    }

    /// Open a freshly picked file.
    ///
    /// `explicit_identity` re-enters under a known identity; user picks pass
    /// `None` and always get a new one.
    pub async fn open(
        &self,
        picked: PickedFile<P::File, P::Reference>,
        explicit_identity: Option<DocumentId>,
    ) -> OpenOutcome {
        let file_name = picked.file.name().to_owned();
        if !self.config.accepts(&file_name) {
            tracing::info!(%file_name, "ignoring pick, not a markdown file");
            return OpenOutcome::Rejected;
        }

        let id = explicit_identity.unwrap_or_else(|| self.ids.next(&file_name));
        let load = self.issue(&id);
        let access_mode = picked.access_mode();
        tracing::debug!(%id, ?access_mode, "opening");

        let watch = Stopwatch::start("read picked file");
        let read = picked.file.read_text().await;
        if !self.is_current(&load) {
            tracing::debug!(%id, "open superseded while reading");
            return OpenOutcome::Superseded;
        }
        watch.finish();

        match read {
            Ok(text) => {
                let record = DocumentRecord::new(file_name, text, access_mode);
                self.install(&load, record.clone(), picked.file, picked.reference.clone());

                let cached = self.persist(&id, &record);
                update_locator(self.platform.address_bar(), |locator| {
                    locator.set_file(cached.then_some(id.as_str()));
                    locator.set_heading(None);
                });

                if let Some(reference) = &picked.reference {
                    self.escrow(&id, reference).await;
                }
                OpenOutcome::Opened(id)
            }
            Err(e) => {
                tracing::warn!(%id, "could not read picked file: {}", e);
                let record = DocumentRecord::new(file_name, "", access_mode);
                self.install(&load, record, picked.file, picked.reference);
                self.state.borrow_mut().phase = SessionPhase::Empty;
                update_locator(self.platform.address_bar(), |locator| {
                    locator.set_file(None);
                    locator.set_heading(None);
                });
                OpenOutcome::ReadFailed(id)
            }
        }
    }

    /// Re-read the current document, falling back through the sources its
    /// access mode allows.
    pub async fn refresh(&self) -> RefreshOutcome {
        let snapshot = {
            let state = self.state.borrow();
            match (&state.identity, &state.document) {
                (Some(id), Some(doc)) if !doc.file_name.is_empty() => Some((
                    id.clone(),
                    doc.clone(),
                    state.file.clone(),
                    state.reference.clone(),
                )),
                _ => None,
            }
        };
        let Some((id, document, file, mut reference)) = snapshot else {
            tracing::debug!("refresh with no document open");
            self.platform.notify(Notice::NothingToRefresh);
            return RefreshOutcome::NothingToRefresh;
        };

        let load = self.issue(&id);

        for step in refresh_plan(document.access_mode) {
            match step {
                RefreshStep::Reference => {
                    let Some(held) = reference.clone() else {
                        continue;
                    };
                    let result = reread_reference(&held).await;
                    if !self.is_current(&load) {
                        return RefreshOutcome::Superseded;
                    }
                    match result {
                        Ok((fresh, text)) => {
                            self.replace_content(&load, text, Some(fresh), Some(held));
                            return RefreshOutcome::Refreshed(id);
                        }
                        Err(e) => {
                            tracing::warn!(%id, "file reference no longer resolves: {}", e);
                            reference = None;
                            self.state.borrow_mut().reference = None;
                            self.forget_reference(&id).await;
                            if !self.is_current(&load) {
                                return RefreshOutcome::Superseded;
                            }
                        }
                    }
                }
                RefreshStep::HeldFile => {
                    let Some(held) = file.clone() else {
                        continue;
                    };
                    let result = held.read_text().await;
                    if !self.is_current(&load) {
                        return RefreshOutcome::Superseded;
                    }
                    match result {
                        Ok(text) => {
                            self.replace_content(&load, text, Some(held), reference.clone());
                            return RefreshOutcome::Refreshed(id);
                        }
                        Err(e) => tracing::warn!(%id, "held file could not be re-read: {}", e),
                    }
                }
                RefreshStep::Picker => {
                    if reference.is_some() || file.is_some() {
                        continue;
                    }
                    return self.refresh_from_picker(&load, &document).await;
                }
            }
        }

        self.settle(&load);
        self.platform.notify(Notice::RefreshFailed {
            file_name: document.file_name,
        });
        RefreshOutcome::Failed
    }

    async fn refresh_from_picker(&self, load: &Load, document: &DocumentRecord) -> RefreshOutcome {
        tracing::debug!(id = %load.id, "no source held, asking for the file again");
        let Some(picked) = self.platform.picker().pick().await else {
            self.settle(load);
            return RefreshOutcome::Cancelled;
        };
        if !self.is_current(load) {
            return RefreshOutcome::Superseded;
        }

        if picked.file.name() != document.file_name {
            tracing::info!(
                expected = %document.file_name,
                picked = picked.file.name(),
                "picked a different file, opening it as a new document"
            );
            return match self.open(picked, None).await {
                OpenOutcome::Opened(id) | OpenOutcome::ReadFailed(id) => {
                    RefreshOutcome::Reopened(id)
                }
                OpenOutcome::Rejected => {
                    self.settle(load);
                    RefreshOutcome::Cancelled
                }
                OpenOutcome::Superseded => RefreshOutcome::Superseded,
            };
        }

        let result = picked.file.read_text().await;
        if !self.is_current(load) {
            return RefreshOutcome::Superseded;
        }
        match result {
            Ok(text) => {
                self.replace_content(load, text, Some(picked.file), picked.reference.clone());
                if let Some(reference) = &picked.reference {
                    self.escrow(&load.id, reference).await;
                }
                RefreshOutcome::Refreshed(load.id.clone())
            }
            Err(e) => {
                tracing::warn!(id = %load.id, "re-picked file could not be read: {}", e);
                self.settle(load);
                self.platform.notify(Notice::RefreshFailed {
                    file_name: document.file_name.clone(),
                });
                RefreshOutcome::Failed
            }
        }
    }

    /// Restore from the page's current fragment.
    pub async fn restore(&self) -> RestoreOutcome {
        let locator = read_locator(self.platform.address_bar());
        self.restore_from_locator(&locator).await
    }

    /// Startup restore.
    ///
    /// The cached record decides the plan. Direct-access documents show the
    /// cached text right away and then try a live re-read through the
    /// escrowed reference; legacy uploads only ever show the cache.
    pub async fn restore_from_locator(&self, locator: &SessionLocator) -> RestoreOutcome {
        let Some(file_id) = locator.file_id.as_deref() else {
            return RestoreOutcome::Nothing;
        };
        let id = DocumentId::from(file_id);
        let Some(cached) = self.platform.fast_store().get(&id) else {
            tracing::debug!(%id, "locator names a session with no cached record");
            return RestoreOutcome::Nothing;
        };

        let load = self.issue(&id);
        let heading = locator.heading_id.clone();
        let mut shown = false;

        for step in restore_plan(cached.access_mode) {
            match step {
                RestoreStep::LiveReread => {
                    self.adopt_cached(&load, cached.clone(), heading.clone(), SessionPhase::StaleReady);
                    shown = true;

                    let result = self.live_reread(&id, &cached.file_name).await;
                    if !self.is_current(&load) {
                        return RestoreOutcome::Superseded;
                    }
                    match result {
                        Ok((reference, file, text)) => {
                            self.replace_content(&load, text, Some(file), Some(reference));
                            return RestoreOutcome::Live(id);
                        }
                        Err(e) => {
                            tracing::warn!(%id, "live re-read failed, keeping cached text: {}", e);
                            self.forget_reference(&id).await;
                            if !self.is_current(&load) {
                                return RestoreOutcome::Superseded;
                            }
                            self.offer_stale_prompt(&id, &cached.file_name);
                        }
                    }
                }
                RestoreStep::AdoptCached => {
                    if shown {
                        self.settle_restore(&load);
                    } else {
                        self.adopt_cached(&load, cached.clone(), heading.clone(), SessionPhase::Ready);
                    }
                    return RestoreOutcome::Cached(id);
                }
            }
        }

        self.settle_restore(&load);
        RestoreOutcome::Cached(id)
    }

    async fn live_reread(
        &self,
        id: &DocumentId,
        expected_name: &str,
    ) -> Result<(P::Reference, P::File, String), LiveReadFailure> {
        let reference = self
            .platform
            .durable_store()
            .get(id)
            .await?
            .ok_or(LiveReadFailure::NotEscrowed)?;
        let file = reference.reacquire().await?;
        if file.name() != expected_name {
            return Err(LiveReadFailure::NameMismatch {
                expected: expected_name.to_owned(),
                found: file.name().to_owned(),
            });
        }
        let watch = Stopwatch::start("live re-read");
        let text = file.read_text().await?;
        watch.finish();
        Ok((reference, file, text))
    }

    /// Answer the stale-cache prompt. Either answer counts as having seen it.
    pub async fn resolve_stale_prompt(&self, choice: StaleChoice) -> Option<RefreshOutcome> {
        if let Some(id) = self.identity() {
            self.platform.fast_store().mark_prompt_shown(&id);
        }
        match choice {
            StaleChoice::ReloadLatest => Some(self.refresh().await),
            StaleChoice::KeepCached => None,
        }
    }

    /// Scroll to a heading and record it in the locator.
    pub fn navigate_to(&self, heading_id: &str) -> bool {
        if !self.platform.viewport().scroll_to_anchor(heading_id) {
            tracing::debug!(heading_id, "no such anchor");
            return false;
        }
        {
            let mut state = self.state.borrow_mut();
            state.pending_anchor = None;
            state.tracked_heading = Some(heading_id.to_owned());
        }
        update_locator(self.platform.address_bar(), |locator| {
            locator.set_heading(Some(heading_id));
        });
        true
    }

    /// Sync the locator's heading with what is on screen. Call on scroll.
    ///
    /// Returns whether the active heading changed. Unchanged headings leave
    /// the address alone.
    pub fn track_scroll(&self) -> bool {
        let next = {
            let state = self.state.borrow();
            if state.outline.is_empty() || state.pending_anchor.is_some() {
                return false;
            }
            let viewport = self.platform.viewport();
            let next = active_heading(&state.outline, self.config.heading_threshold_px, |id| {
                viewport.anchor_top(id)
            })
            .map(|entry| entry.id.clone());
            if next == state.tracked_heading {
                return false;
            }
            next
        };

        update_locator(self.platform.address_bar(), |locator| {
            locator.set_heading(next.as_deref());
        });
        self.state.borrow_mut().tracked_heading = next;
        true
    }

    /// The host rendered `version` and extracted its outline.
    ///
    /// A pending heading from the locator is scrolled to here, now that its
    /// anchor exists.
    pub fn content_rendered(&self, version: ContentVersion, outline: Vec<OutlineEntry>) -> bool {
        let anchor = {
            let mut state = self.state.borrow_mut();
            if state.version != version {
                tracing::debug!(?version, current = ?state.version, "dropping stale render");
                return false;
            }
            state.outline = outline;
            state.rendered = true;

            match state.pending_anchor.clone() {
                Some(anchor) if state.outline.iter().any(|e| e.id == anchor) => {
                    // Cached text may be replaced by a live re-read, which
                    // renders again.
                    if state.phase != SessionPhase::StaleReady {
                        state.pending_anchor = None;
                    }
                    Some(anchor)
                }
                Some(anchor) => {
                    tracing::debug!(%anchor, "locator heading not in outline");
                    if state.phase != SessionPhase::StaleReady {
                        state.pending_anchor = None;
                    }
                    None
                }
                None => None,
            }
        };

        if let Some(anchor) = anchor {
            if self.platform.viewport().scroll_to_anchor(&anchor) {
                self.state.borrow_mut().tracked_heading = Some(anchor);
            }
        }
        true
    }

    /// Every diagram in the render for `version` has settled.
    pub fn mark_diagrams_ready(&self, version: ContentVersion) -> bool {
        let mut state = self.state.borrow_mut();
        if state.version != version {
            tracing::debug!(?version, "dropping stale diagram readiness");
            return false;
        }
        state.diagrams_ready = true;
        true
    }

    pub fn request_export(&self, kind: ExportKind) -> Result<ExportRequest, ExportError> {
        let state = self.state.borrow();
        let has_content = state.document.as_ref().is_some_and(DocumentRecord::has_content);
        if let Err(e) = check_export(kind, has_content, state.diagrams_ready) {
            tracing::debug!(?kind, "export refused: {}", e);
            return Err(e);
        }

        let file_name = match kind {
            ExportKind::Pdf => None,
            ExportKind::Png => {
                let base = state.document.as_ref().map_or("", |d| d.file_name.as_str());
                Some(png_file_name(base, now_ms()))
            }
        };
        Ok(ExportRequest { kind, file_name })
    }

    pub fn report_export_failure(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("export failed: {}", message);
        self.platform.notify(Notice::ExportFailed(message));
    }

    fn issue(&self, id: &DocumentId) -> Load {
        let mut state = self.state.borrow_mut();
        state.ticket += 1;
        let load = Load {
            ticket: state.ticket,
            id: id.clone(),
        };
        state.latest = Some(load.clone());
        state.phase = SessionPhase::Loading;
        load
    }

    fn is_current(&self, load: &Load) -> bool {
        self.state.borrow().latest.as_ref() == Some(load)
    }

    fn settle(&self, load: &Load) {
        if self.is_current(load) {
            let mut state = self.state.borrow_mut();
            state.phase = state.settled_phase();
        }
    }

    /// Cached text stays. Like [`Self::settle`], but also ends the wait for
    /// a live render.
    fn settle_restore(&self, load: &Load) {
        if self.is_current(load) {
            let mut state = self.state.borrow_mut();
            state.phase = state.settled_phase();
            state.drop_consumed_anchor();
        }
    }

    /// A new document replaces whatever was shown.
    fn install(
        &self,
        load: &Load,
        record: DocumentRecord,
        file: P::File,
        reference: Option<P::Reference>,
    ) {
        {
            let mut state = self.state.borrow_mut();
            state.document = Some(record);
            state.identity = Some(load.id.clone());
            state.file = Some(file);
            state.reference = reference;
            state.outline.clear();
            state.pending_anchor = None;
            state.tracked_heading = None;
            state.bump();
            state.phase = SessionPhase::Ready;
        }
        self.announce();
    }

    fn adopt_cached(
        &self,
        load: &Load,
        record: DocumentRecord,
        heading: Option<String>,
        phase: SessionPhase,
    ) {
        {
            let mut state = self.state.borrow_mut();
            state.document = Some(record);
            state.identity = Some(load.id.clone());
            state.file = None;
            state.reference = None;
            state.outline.clear();
            state.pending_anchor = heading;
            state.tracked_heading = None;
            state.bump();
            state.phase = phase;
        }
        self.announce();
    }

    /// Fresh text for the current identity. The old text stays until this
    /// point, so dependents never see an empty document in between.
    fn replace_content(
        &self,
        load: &Load,
        text: String,
        file: Option<P::File>,
        reference: Option<P::Reference>,
    ) {
        let (record, changed) = {
            let mut state = self.state.borrow_mut();
            let file_name = state
                .document
                .as_ref()
                .map(|d| d.file_name.clone())
                .unwrap_or_default();
            let record =
                DocumentRecord::new(file_name, text, AccessMode::from_reference(reference.is_some()));
            let changed = state.document.as_ref().map(|d| &d.content) != Some(&record.content);

            state.document = Some(record.clone());
            state.file = file;
            state.reference = reference;
            if changed {
                state.bump();
            } else {
                state.drop_consumed_anchor();
            }
            state.phase = SessionPhase::Ready;
            (record, changed)
        };
        if !self.persist(&load.id, &record) {
            update_locator(self.platform.address_bar(), |locator| {
                if locator.file_id.as_deref() == Some(load.id.as_str()) {
                    locator.set_file(None);
                }
            });
        }
        if changed {
            self.announce();
        }
    }

    /// Tell the host the shown text changed, with no state borrowed.
    fn announce(&self) {
        let version = self.content_version();
        self.platform.content_changed(version);
    }

    fn persist(&self, id: &DocumentId, record: &DocumentRecord) -> bool {
        match self.platform.fast_store().put(id, record) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%id, "document not cached for reload: {}", e);
                self.platform.fast_store().remove(id);
                false
            }
        }
    }

    async fn escrow(&self, id: &DocumentId, reference: &P::Reference) {
        if let Err(e) = self.platform.durable_store().put(id, reference).await {
            tracing::warn!(%id, "file reference not kept for reload: {}", e);
        }
    }

    async fn forget_reference(&self, id: &DocumentId) {
        if let Err(e) = self.platform.durable_store().delete(id).await {
            tracing::warn!(%id, "could not drop escrowed reference: {}", e);
        }
    }

    fn offer_stale_prompt(&self, id: &DocumentId, file_name: &str) {
        let fast = self.platform.fast_store();
        if fast.prompt_shown(id) {
            tracing::debug!(%id, "stale prompt already shown this session");
            return;
        }
        fast.mark_prompt_shown(id);
        self.platform.notify(Notice::StalePrompt {
            id: id.clone(),
            file_name: file_name.to_owned(),
        });
    }
}

async fn reread_reference<R: FileReference>(reference: &R) -> Result<(R::File, String), FileError> {
    let file = reference.reacquire().await?;
    let text = file.read_text().await?;
    Ok((file, text))
}

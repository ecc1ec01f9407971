//! Test doubles for driving the session controller natively.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use mdview_core::{
    ContentVersion, DocumentId, FileError, FilePicker, FileReference, LocalFile, MemoryAddressBar,
    MemoryDurableStore, MemoryFastStore, Notice, PickedFile, SessionController, SessionPlatform,
    ViewerConfig, Viewport,
};
use tokio::sync::Notify;

pub type TestSession = SessionController<MockPlatform>;
pub type Pick = PickedFile<MockFile, MockReference>;

/// A file whose bytes can change underneath the viewer, and whose reads
/// can be held until a test releases them.
#[derive(Clone)]
pub struct MockFile {
    name: String,
    contents: Rc<RefCell<Result<String, FileError>>>,
    gate: Rc<RefCell<Option<Rc<Notify>>>>,
}

impl MockFile {
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: name.to_owned(),
            contents: Rc::new(RefCell::new(Ok(text.to_owned()))),
            gate: Rc::new(RefCell::new(None)),
        }
    }

    pub fn unreadable(name: &str) -> Self {
        let file = Self::new(name, "");
        file.break_reads();
        file
    }

    /// A file whose first read waits for the returned gate.
    pub fn gated(name: &str, text: &str) -> (Self, Rc<Notify>) {
        let file = Self::new(name, text);
        let gate = file.hold();
        (file, gate)
    }

    /// Make every later read wait until the returned gate is notified.
    pub fn hold(&self) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        *self.gate.borrow_mut() = Some(gate.clone());
        gate
    }

    /// Simulate an edit on disk.
    pub fn set_text(&self, text: &str) {
        *self.contents.borrow_mut() = Ok(text.to_owned());
    }

    pub fn break_reads(&self) {
        *self.contents.borrow_mut() = Err(FileError::Unreadable {
            name: self.name.clone(),
            reason: "permission denied".into(),
        });
    }
}

impl LocalFile for MockFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_text(&self) -> Result<String, FileError> {
        let gate = self.gate.borrow().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.contents.borrow().clone()
    }
}

/// A file reference that can be revoked from outside.
#[derive(Clone)]
pub struct MockReference {
    file: MockFile,
    revoked: Rc<Cell<bool>>,
}

impl MockReference {
    pub fn new(file: &MockFile) -> Self {
        Self {
            file: file.clone(),
            revoked: Rc::new(Cell::new(false)),
        }
    }

    pub fn revoke(&self) {
        self.revoked.set(true);
    }
}

impl FileReference for MockReference {
    type File = MockFile;

    async fn reacquire(&self) -> Result<MockFile, FileError> {
        if self.revoked.get() {
            return Err(FileError::Revoked(self.file.name.clone()));
        }
        Ok(self.file.clone())
    }
}

/// Hands out queued picks. An empty queue behaves like a dismissed dialog.
#[derive(Default)]
pub struct MockPicker {
    queue: RefCell<VecDeque<Pick>>,
    calls: Cell<usize>,
}

impl MockPicker {
    pub fn queue(&self, pick: Pick) {
        self.queue.borrow_mut().push_back(pick);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl FilePicker for MockPicker {
    type File = MockFile;
    type Reference = MockReference;

    async fn pick(&self) -> Option<Pick> {
        self.calls.set(self.calls.get() + 1);
        self.queue.borrow_mut().pop_front()
    }
}

/// Heading geometry set by the test, plus a log of scroll requests.
#[derive(Default)]
pub struct MockViewport {
    tops: RefCell<HashMap<String, f64>>,
    scrolled: RefCell<Vec<String>>,
}

impl MockViewport {
    pub fn set_top(&self, id: &str, top: f64) {
        self.tops.borrow_mut().insert(id.to_owned(), top);
    }

    pub fn scrolled(&self) -> Vec<String> {
        self.scrolled.borrow().clone()
    }
}

impl Viewport for MockViewport {
    fn scroll_to_anchor(&self, id: &str) -> bool {
        if !self.tops.borrow().contains_key(id) {
            return false;
        }
        self.scrolled.borrow_mut().push(id.to_owned());
        true
    }

    fn anchor_top(&self, id: &str) -> Option<f64> {
        self.tops.borrow().get(id).copied()
    }
}

/// One browser tab. Stores are shared through `Rc` so a second tab can see
/// what the first one wrote.
pub struct MockPlatform {
    pub fast: Rc<MemoryFastStore>,
    pub durable: Rc<MemoryDurableStore<MockReference>>,
    pub picker: MockPicker,
    pub address: MemoryAddressBar,
    pub viewport: MockViewport,
    notices: RefCell<Vec<Notice>>,
    changes: RefCell<Vec<u64>>,
}

impl MockPlatform {
    pub fn new(fragment: &str) -> Self {
        Self::with_stores(
            Rc::new(MemoryFastStore::default()),
            Rc::new(MemoryDurableStore::new()),
            fragment,
        )
    }

    pub fn with_stores(
        fast: Rc<MemoryFastStore>,
        durable: Rc<MemoryDurableStore<MockReference>>,
        fragment: &str,
    ) -> Self {
        Self {
            fast,
            durable,
            picker: MockPicker::default(),
            address: MemoryAddressBar::new(fragment),
            viewport: MockViewport::default(),
            notices: RefCell::new(Vec::new()),
            changes: RefCell::new(Vec::new()),
        }
    }

    /// A new tab on `fragment` that shares this tab's stores.
    pub fn another_tab(&self, fragment: &str) -> Self {
        Self::with_stores(self.fast.clone(), self.durable.clone(), fragment)
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    /// Content versions announced so far, in order.
    pub fn content_changes(&self) -> Vec<u64> {
        self.changes.borrow().clone()
    }
}

impl SessionPlatform for MockPlatform {
    type File = MockFile;
    type Reference = MockReference;
    type Fast = MemoryFastStore;
    type Durable = MemoryDurableStore<MockReference>;
    type Picker = MockPicker;
    type Address = MemoryAddressBar;
    type Viewport = MockViewport;

    fn fast_store(&self) -> &MemoryFastStore {
        &self.fast
    }

    fn durable_store(&self) -> &MemoryDurableStore<MockReference> {
        &self.durable
    }

    fn picker(&self) -> &MockPicker {
        &self.picker
    }

    fn address_bar(&self) -> &MemoryAddressBar {
        &self.address
    }

    fn viewport(&self) -> &MockViewport {
        &self.viewport
    }

    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }

    fn content_changed(&self, version: ContentVersion) {
        self.changes.borrow_mut().push(version.get());
    }
}

/// Helper: a controller over `platform` with default config.
pub fn session(platform: MockPlatform) -> TestSession {
    SessionController::new(platform, ViewerConfig::default())
}

/// Helper: the raw fragment of the session's tab.
pub fn fragment(session: &TestSession) -> String {
    use mdview_core::AddressBar;
    session.platform().address.fragment()
}

/// Helper: let every pending future reach its gate, then open the gates in
/// the given order, yielding between each so the released read completes
/// before the next one starts.
pub async fn release_in_order(gates: &[&Notify]) {
    tokio::task::yield_now().await;
    for gate in gates {
        gate.notify_one();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }
}

/// Helper: the text cached in the fast store for `id`.
pub fn cached_content(session: &TestSession, id: &DocumentId) -> Option<String> {
    use mdview_core::FastStore;
    session.platform().fast.get(id).map(|record| record.content)
}

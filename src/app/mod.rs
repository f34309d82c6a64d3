pub mod grid;

use crate::ai::SnippetGenerator;
use crate::ai::transport::CompletionTransport;
use crate::db::{SnippetRecord, SnippetStore};
use anyhow::Result;
use serde::Serialize;
use tracing::debug;

pub const EMPTY_TASK_MESSAGE: &str = "Please enter a task.";
pub const GRID_HEADERS: [&str; 4] = ["ID", "Task", "Code", "Timestamp"];

/// Produces the text shown in the output pane for a task.
pub trait SnippetSource {
    fn generate(&self, task: &str) -> String;
}

/// Where generation attempts are recorded and read back from.
pub trait SnippetLog {
    fn insert(&self, task: &str, code: &str) -> Result<i64>;
    fn list_all(&self) -> Result<Vec<SnippetRecord>>;
}

pub trait View {
    fn render(&mut self, state: &ViewState) -> Result<()>;
}

impl<T: CompletionTransport> SnippetSource for SnippetGenerator<T> {
    fn generate(&self, task: &str) -> String {
        SnippetGenerator::generate(self, task)
    }
}

impl SnippetLog for SnippetStore {
    fn insert(&self, task: &str, code: &str) -> Result<i64> {
        SnippetStore::insert(self, task, code)
    }

    fn list_all(&self) -> Result<Vec<SnippetRecord>> {
        SnippetStore::list_all(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Generate { task: String },
    ViewHistory,
}

impl UiEvent {
    pub fn generate(task: impl Into<String>) -> Self {
        Self::Generate { task: task.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::ViewHistory => "view_history",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingResult,
    Displaying,
}

/// One history row as display strings, in `GRID_HEADERS` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub id: String,
    pub task: String,
    pub code: String,
    pub timestamp: String,
}

impl GridRow {
    pub fn cells(&self) -> [&str; 4] {
        [&self.id, &self.task, &self.code, &self.timestamp]
    }
}

impl From<&SnippetRecord> for GridRow {
    fn from(record: &SnippetRecord) -> Self {
        Self {
            id: record.id.to_string(),
            task: record.task.clone(),
            code: record.code.clone(),
            timestamp: record.timestamp.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub phase: Phase,
    pub output: String,
    pub grid: Vec<GridRow>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            output: String::new(),
            grid: Vec::new(),
        }
    }
}

pub struct AppController<G, S> {
    generator: G,
    store: S,
    state: ViewState,
}

impl<G: SnippetSource, S: SnippetLog> AppController<G, S> {
    pub fn new(generator: G, store: S) -> Self {
        Self {
            generator,
            store,
            state: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Runs one event to completion. Only storage failures are returned.
    pub fn dispatch(&mut self, event: UiEvent) -> Result<&ViewState> {
        debug!(event = event.name(), "dispatching ui event");

        match event {
            UiEvent::Generate { task } => self.on_generate(&task),
            UiEvent::ViewHistory => self.on_view_history(),
        }
    }

    pub fn handle(&mut self, event: UiEvent, view: &mut impl View) -> Result<()> {
        let state = self.dispatch(event)?;
        view.render(state)
    }

    /// The task is generated and stored as given; trimming only decides
    /// whether it counts as empty.
    pub fn on_generate(&mut self, task: &str) -> Result<&ViewState> {
        if task.trim().is_empty() {
            self.state.output = EMPTY_TASK_MESSAGE.to_string();
            self.state.phase = Phase::Displaying;
            return Ok(&self.state);
        }

        self.state.phase = Phase::AwaitingResult;
        let code = self.generator.generate(task);

        if let Err(error) = self.store.insert(task, &code) {
            self.state.phase = Phase::Idle;
            return Err(error);
        }

        self.state.output = code;
        self.state.phase = Phase::Displaying;
        Ok(&self.state)
    }

    pub fn on_view_history(&mut self) -> Result<&ViewState> {
        let records = self.store.list_all()?;

        self.state.grid = records.iter().map(GridRow::from).collect();
        self.state.phase = Phase::Displaying;
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AppController, EMPTY_TASK_MESSAGE, GridRow, Phase, SnippetLog, SnippetSource, UiEvent,
        View, ViewState,
    };
    use crate::ai::SnippetGenerator;
    use crate::ai::tests::{FakeTransport, settings};
    use crate::db::{SnippetRecord, SnippetStore};
    use anyhow::{Result, bail};
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingSource {
        calls: Cell<usize>,
    }

    impl SnippetSource for CountingSource {
        fn generate(&self, task: &str) -> String {
            self.calls.set(self.calls.get() + 1);
            format!("code for {task}")
        }
    }

    #[derive(Default)]
    struct MemoryLog {
        rows: RefCell<Vec<SnippetRecord>>,
        inserts: Cell<usize>,
        lists: Cell<usize>,
    }

    impl SnippetLog for MemoryLog {
        fn insert(&self, task: &str, code: &str) -> Result<i64> {
            self.inserts.set(self.inserts.get() + 1);
            let mut rows = self.rows.borrow_mut();
            let id = rows.len() as i64 + 1;
            rows.push(SnippetRecord {
                id,
                task: task.to_string(),
                code: code.to_string(),
                timestamp: "2024-01-01 12:00:00".to_string(),
            });
            Ok(id)
        }

        fn list_all(&self) -> Result<Vec<SnippetRecord>> {
            self.lists.set(self.lists.get() + 1);
            Ok(self.rows.borrow().clone())
        }
    }

    struct BrokenLog;

    impl SnippetLog for BrokenLog {
        fn insert(&self, _task: &str, _code: &str) -> Result<i64> {
            bail!("disk I/O error")
        }

        fn list_all(&self) -> Result<Vec<SnippetRecord>> {
            bail!("disk I/O error")
        }
    }

    #[derive(Default)]
    struct RecordingView {
        frames: Vec<ViewState>,
    }

    impl View for RecordingView {
        fn render(&mut self, state: &ViewState) -> Result<()> {
            self.frames.push(state.clone());
            Ok(())
        }
    }

    fn sqlite_store() -> (TempDir, SnippetStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SnippetStore::open(&dir.path().join("snippets.db")).expect("store");
        (dir, store)
    }

    #[test]
    fn starts_idle_and_empty() {
        let controller = AppController::new(CountingSource::default(), MemoryLog::default());
        assert_eq!(controller.state(), &ViewState::default());
        assert_eq!(controller.state().phase, Phase::Idle);
    }

    #[test]
    fn empty_task_short_circuits() {
        let mut controller = AppController::new(CountingSource::default(), MemoryLog::default());

        for input in ["", "   ", "\n\t"] {
            let state = controller.dispatch(UiEvent::generate(input)).expect("dispatch");
            assert_eq!(state.output, EMPTY_TASK_MESSAGE);
            assert_eq!(state.phase, Phase::Displaying);
        }

        assert_eq!(controller.generator.calls.get(), 0);
        assert_eq!(controller.store.inserts.get(), 0);
        assert_eq!(controller.store.lists.get(), 0);
    }

    #[test]
    fn generate_stores_then_displays() {
        let mut controller = AppController::new(CountingSource::default(), MemoryLog::default());

        let state = controller
            .dispatch(UiEvent::generate("  sort a list "))
            .expect("dispatch");

        assert_eq!(state.output, "code for   sort a list ");
        assert_eq!(state.phase, Phase::Displaying);
        assert!(state.grid.is_empty());

        let rows = controller.store.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task, "  sort a list ");
        assert_eq!(rows[0].code, "code for   sort a list ");
    }

    #[test]
    fn stored_task_keeps_surrounding_whitespace() {
        let (_dir, store) = sqlite_store();
        let transport = FakeTransport::replying("print(sorted(xs))");
        let generator = SnippetGenerator::new(settings(Some("sk-test")), transport.clone());
        let mut controller = AppController::new(generator, store.clone());

        controller
            .dispatch(UiEvent::generate("\tsort a list\n"))
            .expect("dispatch");

        let records = store.list_all().expect("list");
        assert_eq!(records[0].task, "\tsort a list\n");

        let requests = transport.requests.lock().expect("requests");
        assert!(requests[0].0.messages[1].content.ends_with("\tsort a list\n"));
    }

    #[test]
    fn view_history_replaces_grid() {
        let mut controller = AppController::new(CountingSource::default(), MemoryLog::default());
        controller.dispatch(UiEvent::generate("first")).expect("first");

        let state = controller.dispatch(UiEvent::ViewHistory).expect("history");
        assert_eq!(state.grid.len(), 1);

        controller.dispatch(UiEvent::generate("second")).expect("second");
        let state = controller.dispatch(UiEvent::ViewHistory).expect("history");

        assert_eq!(
            state.grid.iter().map(|row| row.task.as_str()).collect::<Vec<_>>(),
            ["first", "second"]
        );
        assert_eq!(state.grid[1].cells(), ["2", "second", "code for second", "2024-01-01 12:00:00"]);
        assert_eq!(controller.generator.calls.get(), 2);
    }

    #[test]
    fn storage_failure_propagates() {
        let mut controller = AppController::new(CountingSource::default(), BrokenLog);

        assert!(controller.dispatch(UiEvent::generate("task")).is_err());
        assert_eq!(controller.state().phase, Phase::Idle);
        assert!(controller.state().output.is_empty());
        assert!(controller.dispatch(UiEvent::ViewHistory).is_err());
    }

    #[test]
    fn handle_renders_each_event() {
        let mut controller = AppController::new(CountingSource::default(), MemoryLog::default());
        let mut view = RecordingView::default();

        controller.handle(UiEvent::generate(""), &mut view).expect("empty");
        controller.handle(UiEvent::generate("x"), &mut view).expect("generate");
        controller.handle(UiEvent::ViewHistory, &mut view).expect("history");

        assert_eq!(view.frames.len(), 3);
        assert_eq!(view.frames[0].output, EMPTY_TASK_MESSAGE);
        assert_eq!(view.frames[1].output, "code for x");
        assert_eq!(view.frames[2].grid.len(), 1);
    }

    #[test]
    fn remote_failure_is_still_recorded() {
        let (_dir, store) = sqlite_store();
        let generator = SnippetGenerator::new(
            settings(Some("sk-test")),
            FakeTransport::failing("429 Too Many Requests"),
        );
        let mut controller = AppController::new(generator, store.clone());

        let state = controller
            .dispatch(UiEvent::generate("reverse a string"))
            .expect("dispatch");
        assert!(state.output.starts_with("Error"));

        let records = store.list_all().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task, "reverse a string");
        assert_eq!(records[0].code, state.output);
        assert!(records[0].code.contains("429 Too Many Requests"));
    }

    #[test]
    fn missing_key_is_recorded_without_network() {
        let (_dir, store) = sqlite_store();
        let transport = FakeTransport::replying("unused");
        let generator = SnippetGenerator::new(settings(None), transport.clone());
        let mut controller = AppController::new(generator, store.clone());

        let output = controller
            .dispatch(UiEvent::generate("reverse a string"))
            .expect("dispatch")
            .output
            .clone();

        assert!(output.starts_with("Error"));
        assert_eq!(transport.calls(), 0);
        assert_eq!(store.list_all().expect("list")[0].code, output);
    }

    #[test]
    fn reverse_string_scenario() {
        let (_dir, store) = sqlite_store();
        let generator = SnippetGenerator::new(
            settings(Some("sk-test")),
            FakeTransport::replying("def reverse(s): return s[::-1]"),
        );
        let mut controller = AppController::new(generator, store);

        let state = controller
            .dispatch(UiEvent::generate("reverse a string"))
            .expect("generate");
        assert_eq!(state.output, "def reverse(s): return s[::-1]");

        let state = controller.dispatch(UiEvent::ViewHistory).expect("history");
        assert_eq!(state.grid.len(), 1);

        let row: &GridRow = &state.grid[0];
        assert_eq!(row.id, "1");
        assert_eq!(row.task, "reverse a string");
        assert_eq!(row.code, "def reverse(s): return s[::-1]");
        assert_eq!(row.timestamp.len(), "2024-01-01 12:00:00".len());
    }
}

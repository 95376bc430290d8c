//! End-to-end workflow scenarios against in-memory host, endpoint and tool fakes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::time::Duration;

use bodyfat_bridge::{
    DragController, DragInput, FileCandidate, HostBridge, HostSnapshot, InvocationError,
    Orchestrator, SessionStatus, SnapshotObserver, ToolChannel, UploadError, UploadReceipt,
    UploadRequest, Uploader, WidgetError, WidgetState, WidgetStateStore, parse_upload_response,
    run_session,
};
use futures::executor::block_on;
use serde_json::{Value, json};

const MIB: u64 = 1024 * 1024;

/// Host whose state the test can change between polls.
struct FakeHost {
    state: RefCell<HostSnapshot>,
    writes: RefCell<Vec<WidgetState>>,
}

impl FakeHost {
    fn with_user(user_id: &str) -> Self {
        Self {
            state: RefCell::new(HostSnapshot {
                tool_input: json!({"user_id": user_id}),
                ..HostSnapshot::default()
            }),
            writes: RefCell::new(Vec::new()),
        }
    }

    fn publish_output(&self, output: Value) {
        self.state.borrow_mut().tool_output = Some(output);
    }

    /// Record a tool run the way a host does: the call's arguments in
    /// `toolInput`, its envelope in `toolOutput`.
    fn publish_run(&self, args: Value, output: Value) {
        let mut state = self.state.borrow_mut();
        state.tool_input = args;
        state.tool_output = Some(output);
    }
}

impl HostBridge for &FakeHost {
    fn snapshot(&self) -> HostSnapshot {
        self.state.borrow().clone()
    }

    fn set_widget_state(&self, state: &WidgetState) {
        self.writes.borrow_mut().push(state.clone());
        self.state.borrow_mut().widget_state = Some(state.clone());
    }
}

/// Upload endpoint answering every request with a fixed response.
struct StubEndpoint {
    status: u16,
    body: &'static str,
    requests: RefCell<Vec<UploadRequest>>,
}

impl StubEndpoint {
    fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl Uploader for StubEndpoint {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        self.requests.borrow_mut().push(request.clone());
        parse_upload_response(self.status, self.body)
    }
}

/// Tool channel that acknowledges without a result; the result shows up
/// later in the host's `toolOutput`.
#[derive(Default)]
struct DeferredTools {
    calls: RefCell<Vec<(String, Value)>>,
}

impl ToolChannel for DeferredTools {
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, InvocationError> {
        self.calls.borrow_mut().push((name.to_owned(), args));
        Ok(json!({"content": []}))
    }
}

/// Tool channel that answers with the full analysis envelope.
struct AnalyzingTools;

impl ToolChannel for AnalyzingTools {
    async fn call_tool(&self, _name: &str, _args: Value) -> Result<Value, InvocationError> {
        Ok(analysis_envelope())
    }
}

/// A `process_photo` reply: the structured content names the analysis
/// but not the photo.
fn analysis_envelope() -> Value {
    json!({
        "content": [{"type": "text", "text": "Analysis Complete!"}],
        "structuredContent": {
            "analysis_id": "a1",
            "body_fat_percentage": 22.0,
            "confidence": "high",
            "photo_quality": "excellent",
            "reasoning": "Even lighting and full torso in frame.",
            "created_at": "2025-01-01T12:00:00",
            "faces_anonymized": true
        }
    })
}

fn jpeg(size: u64) -> FileCandidate {
    FileCandidate::descriptor("me.jpg", "image/jpeg", size)
}

#[test]
fn scenario_a_upload_invoke_and_observe_completion() {
    let host = FakeHost::with_user("u1");
    let mut observer = SnapshotObserver::mount(Some(&host), Duration::from_millis(100));
    let endpoint = StubEndpoint::new(200, r#"{"photo_id":"p1"}"#);
    let tools = DeferredTools::default();
    let cell = RefCell::new(Orchestrator::default());

    let id = cell.borrow_mut().select(jpeg(2 * MIB)).unwrap();
    assert_eq!(cell.borrow().status_of(id), Some(SessionStatus::Ready));
    assert!(endpoint.requests.borrow().is_empty());

    let snapshot = observer.current().clone();
    let status = block_on(run_session(&cell, id, &snapshot, &endpoint, Some(&tools)));
    assert_eq!(status, Some(SessionStatus::InvokingTool));

    let requests = endpoint.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].caller.as_str(), "u1");
    assert_eq!(
        cell.borrow().session().unwrap().photo_id(),
        Some("p1"),
        "session records the server-assigned id"
    );
    assert_eq!(
        *tools.calls.borrow(),
        vec![("process_photo".to_owned(), json!({"photo_id": "p1"}))]
    );

    // Nothing changed on the host yet.
    let tick = observer.tick().unwrap().clone();
    assert!(!cell.borrow_mut().observe(&tick));

    host.publish_output(json!({
        "structuredContent": {
            "photo_id": "p1",
            "body_fat_percentage": 17.5,
            "confidence": "medium"
        }
    }));
    let tick = observer.tick().unwrap().clone();
    assert!(cell.borrow_mut().observe(&tick));

    let orch = cell.borrow();
    let session = orch.session().unwrap();
    assert_eq!(session.status(), SessionStatus::Complete);
    assert_eq!(session.result().unwrap().body_fat_percentage, Some(17.5));
}

#[test]
fn result_without_photo_id_completes_through_host_tool_input() {
    let host = FakeHost::with_user("u1");
    let mut observer = SnapshotObserver::mount(Some(&host), Duration::from_millis(100));
    let endpoint = StubEndpoint::new(200, r#"{"photo_id":"p1"}"#);
    let cell = RefCell::new(Orchestrator::default());

    let id = cell.borrow_mut().select(jpeg(2 * MIB)).unwrap();
    let snapshot = observer.current().clone();
    let status = block_on(run_session(
        &cell,
        id,
        &snapshot,
        &endpoint,
        Some(&DeferredTools::default()),
    ));
    assert_eq!(status, Some(SessionStatus::InvokingTool));

    host.publish_run(json!({"photo_id": "p1"}), analysis_envelope());
    let tick = observer.tick().unwrap().clone();
    assert!(cell.borrow_mut().observe(&tick));

    let orch = cell.borrow();
    let result = orch.session().unwrap().result().unwrap();
    assert_eq!(orch.status_of(id), Some(SessionStatus::Complete));
    assert_eq!(result.photo_id, "p1");
    assert_eq!(result.analysis_id.as_deref(), Some("a1"));
}

#[test]
fn direct_analysis_reply_completes_without_polling() {
    let host = FakeHost::with_user("u1");
    let endpoint = StubEndpoint::new(200, r#"{"photo_id":"p1"}"#);
    let cell = RefCell::new(Orchestrator::default());

    let id = cell.borrow_mut().select(jpeg(MIB)).unwrap();
    let status = block_on(run_session(
        &cell,
        id,
        &(&host).snapshot(),
        &endpoint,
        Some(&AnalyzingTools),
    ));
    assert_eq!(status, Some(SessionStatus::Complete));
    assert_eq!(
        cell.borrow().session().unwrap().result().unwrap().body_fat_percentage,
        Some(22.0)
    );
}

#[test]
fn reselecting_after_rejection_clears_the_error() {
    let cell = RefCell::new(Orchestrator::default());
    cell.borrow_mut().select(jpeg(15 * MIB)).unwrap();
    assert_eq!(
        cell.borrow().session().unwrap().status(),
        SessionStatus::Rejected
    );

    cell.borrow_mut().select(jpeg(MIB)).unwrap();
    let orch = cell.borrow();
    let session = orch.session().unwrap();
    assert!(session.error().is_none());
    assert_eq!(session.message(), "Ready to upload");
}

#[test]
fn scenario_b_oversized_file_is_rejected_without_upload() {
    let host = FakeHost::with_user("u1");
    let endpoint = StubEndpoint::new(200, r#"{"photo_id":"p1"}"#);
    let cell = RefCell::new(Orchestrator::default());

    let outcome = bodyfat_bridge::validate(
        &jpeg(15 * MIB),
        10 * MIB,
        &["image/jpeg", "image/png", "image/webp"],
    );
    assert!(!outcome.is_valid());
    assert!(outcome.message().contains("exceeds"));

    let id = cell.borrow_mut().select(jpeg(15 * MIB)).unwrap();
    let status = block_on(run_session(
        &cell,
        id,
        &(&host).snapshot(),
        &endpoint,
        Some(&DeferredTools::default()),
    ));
    assert_eq!(status, Some(SessionStatus::Rejected));
    assert!(endpoint.requests.borrow().is_empty());
    assert!(
        cell.borrow()
            .session()
            .unwrap()
            .message()
            .contains("exceeds the 10.0 MB limit")
    );
}

#[test]
fn scenario_c_server_detail_becomes_the_message() {
    let host = FakeHost::with_user("u1");
    let endpoint = StubEndpoint::new(400, r#"{"detail":"bad format"}"#);
    let tools = DeferredTools::default();
    let cell = RefCell::new(Orchestrator::default());

    let id = cell.borrow_mut().select(jpeg(MIB)).unwrap();
    let status = block_on(run_session(&cell, id, &(&host).snapshot(), &endpoint, Some(&tools)));

    assert_eq!(status, Some(SessionStatus::UploadFailed));
    assert_eq!(cell.borrow().session().unwrap().message(), "bad format");
    assert!(tools.calls.borrow().is_empty());
}

#[test]
fn scenario_d_missing_tool_channel_fails_without_call() {
    let host = FakeHost::with_user("u1");
    let endpoint = StubEndpoint::new(200, r#"{"photo_id":"p1"}"#);
    let cell = RefCell::new(Orchestrator::default());

    let id = cell.borrow_mut().select(jpeg(MIB)).unwrap();
    let status = block_on(run_session::<_, _, DeferredTools>(
        &cell,
        id,
        &(&host).snapshot(),
        &endpoint,
        None,
    ));

    assert_eq!(status, Some(SessionStatus::InvokeFailed));
    let orch = cell.borrow();
    let session = orch.session().unwrap();
    assert!(matches!(
        session.error(),
        Some(WidgetError::Invocation(InvocationError::BridgeUnavailable { .. }))
    ));
    assert!(session.message().contains("bridge unavailable"));
}

#[test]
fn missing_identity_fails_before_any_request() {
    let endpoint = StubEndpoint::new(200, r#"{"photo_id":"p1"}"#);
    let cell = RefCell::new(Orchestrator::default());

    let id = cell.borrow_mut().select(jpeg(MIB)).unwrap();
    let status = block_on(run_session(
        &cell,
        id,
        &HostSnapshot::default(),
        &endpoint,
        Some(&DeferredTools::default()),
    ));

    assert_eq!(status, Some(SessionStatus::UploadFailed));
    assert!(endpoint.requests.borrow().is_empty());
    assert_eq!(
        cell.borrow().session().unwrap().error(),
        Some(&WidgetError::Upload(UploadError::CallerUnidentified))
    );
}

/// Endpoint that supersedes the session mid-request, as a user picking a
/// new file while the upload is in flight would.
struct ReselectingEndpoint<'a> {
    cell: &'a RefCell<Orchestrator>,
    teardown: bool,
}

impl Uploader for ReselectingEndpoint<'_> {
    async fn upload(&self, _request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        if self.teardown {
            self.cell.borrow_mut().teardown();
        } else {
            self.cell
                .borrow_mut()
                .select(FileCandidate::descriptor("new.png", "image/png", 10));
        }
        parse_upload_response(200, r#"{"photo_id":"p-old"}"#)
    }
}

#[test]
fn reselection_during_upload_discards_the_old_response() {
    let host = FakeHost::with_user("u1");
    let cell = RefCell::new(Orchestrator::default());
    let tools = DeferredTools::default();
    let endpoint = ReselectingEndpoint {
        cell: &cell,
        teardown: false,
    };

    let first = cell.borrow_mut().select(jpeg(MIB)).unwrap();
    let status = block_on(run_session(&cell, first, &(&host).snapshot(), &endpoint, Some(&tools)));

    assert_eq!(status, None, "superseded session reports nothing");
    assert!(tools.calls.borrow().is_empty());
    let orch = cell.borrow();
    let current = orch.session().unwrap();
    assert_ne!(current.id(), first);
    assert_eq!(current.status(), SessionStatus::Ready);
    assert_eq!(current.file().name(), "new.png");
    assert!(current.receipt().is_none());
}

#[test]
fn teardown_during_upload_discards_the_response() {
    let host = FakeHost::with_user("u1");
    let cell = RefCell::new(Orchestrator::default());
    let tools = DeferredTools::default();
    let endpoint = ReselectingEndpoint {
        cell: &cell,
        teardown: true,
    };

    let id = cell.borrow_mut().select(jpeg(MIB)).unwrap();
    block_on(run_session(&cell, id, &(&host).snapshot(), &endpoint, Some(&tools)));

    assert!(tools.calls.borrow().is_empty());
    let orch = cell.borrow();
    assert!(orch.is_torn_down());
    assert_eq!(orch.session().unwrap().status(), SessionStatus::Uploading);
}

#[test]
fn drag_then_leave_never_selects() {
    let mut drag = DragController::new();
    let cell = RefCell::new(Orchestrator::default());

    for input in [DragInput::Enter, DragInput::Over, DragInput::Over, DragInput::Leave] {
        let outcome = drag.handle::<FileCandidate>(input);
        assert!(outcome.prevent_default);
        if let Some(files) = outcome.dropped {
            cell.borrow_mut().select_first(files);
        }
    }

    assert!(!drag.is_dragging());
    assert!(cell.borrow().session().is_none());
}

#[test]
fn dropped_file_starts_a_validated_session() {
    let mut drag = DragController::new();
    let mut orch = Orchestrator::default();

    let _ = drag.handle::<FileCandidate>(DragInput::Enter);
    let outcome = drag.handle(DragInput::Drop(vec![jpeg(MIB)]));
    let id = orch.select_first(outcome.dropped.unwrap()).unwrap();

    assert_eq!(orch.status_of(id), Some(SessionStatus::Ready));
}

#[test]
fn store_write_survives_until_host_echo() {
    let host = FakeHost::with_user("u1");
    let mut observer = SnapshotObserver::mount(Some(&host), Duration::from_millis(100));
    let mut store = WidgetStateStore::mount(Some(&host), observer.current());

    store.set("photo_id", "p1");
    assert_eq!(store.read().get_str("photo_id"), Some("p1"));
    assert_eq!(host.writes.borrow().len(), 1);

    let tick = observer.tick().unwrap().clone();
    store.observe(&tick);
    assert!(!store.has_pending_write());
    assert_eq!(store.read().get_str("photo_id"), Some("p1"));
}

#[test]
fn observer_without_host_publishes_defaults_and_never_polls() {
    let polls = Cell::new(0_u32);
    let mut observer = SnapshotObserver::<&FakeHost>::mount(None, Duration::from_millis(100));
    for _ in 0..3 {
        if observer.tick().is_some() {
            polls.set(polls.get() + 1);
        }
    }
    assert_eq!(polls.get(), 0);
    assert_eq!(observer.current(), &HostSnapshot::default());
}

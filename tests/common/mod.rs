// Test doubles shared by the integration tests
//
// Each double counts what the session does to it so tests can assert on
// resource lifecycle (acquire/release, open/close) and in-flight behavior.

#![allow(dead_code)]

use face_match::capture::{CaptureDevice, CaptureError, CaptureHandle, CaptureSource, RawFrame};
use face_match::models::{ModelLoadError, ModelLoader, ModelSet};
use face_match::session::{
    NoticeBoard, RecognitionResult, RecognitionSession, SessionConfig, SessionHost, SessionState,
};
use face_match::transport::{
    RecognitionReply, RecognizeResponse, ReplySink, StreamChannel, StreamPush, StreamingTransport,
    TransportError, TransportStrategy, UnaryTransport,
};
use face_match::{CapturedFrame, ModelGate, SessionError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

// ============================================================================
// Model loader
// ============================================================================

pub struct MockLoader {
    fail: bool,
    delay: Duration,
    loads: Arc<AtomicUsize>,
}

impl MockLoader {
    pub fn ready() -> Self {
        Self {
            fail: false,
            delay: Duration::ZERO,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ready()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn loads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

#[async_trait::async_trait]
impl ModelLoader for MockLoader {
    async fn load(&self) -> Result<ModelSet, ModelLoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ModelLoadError::MissingManifest {
                artifact: "ssd_mobilenetv1_model".to_string(),
                path: "models/ssd_mobilenetv1_model-weights_manifest.json".into(),
            });
        }
        Ok(ModelSet {
            artifacts: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn ready_gate() -> Arc<ModelGate> {
    Arc::new(ModelGate::new(Box::new(MockLoader::ready())))
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Produces 4x4 grey frames
    Working,
    /// Produces zero-area frames forever
    Empty,
    Denied,
    Unavailable,
}

#[derive(Default)]
pub struct CameraCounters {
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub frames_read: AtomicUsize,
}

pub struct MockCamera {
    mode: CameraMode,
    counters: Arc<CameraCounters>,
}

impl MockCamera {
    pub fn new(mode: CameraMode) -> Self {
        Self {
            mode,
            counters: Arc::new(CameraCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<CameraCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait::async_trait]
impl CaptureSource for MockCamera {
    async fn acquire(&self) -> Result<CaptureHandle, CaptureError> {
        self.counters.acquires.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            CameraMode::Denied => {
                return Err(CaptureError::PermissionDenied("user refused".to_string()))
            }
            CameraMode::Unavailable => {
                return Err(CaptureError::DeviceUnavailable("no camera".to_string()))
            }
            _ => {}
        }

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(CaptureHandle::new(
            "mock camera",
            Box::new(MockDevice {
                mode: self.mode,
                counters: Arc::clone(&self.counters),
            }),
        ))
    }

    fn name(&self) -> &str {
        "mock camera"
    }
}

struct MockDevice {
    mode: CameraMode,
    counters: Arc<CameraCounters>,
}

#[async_trait::async_trait]
impl CaptureDevice for MockDevice {
    async fn current_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        self.counters.frames_read.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            CameraMode::Empty => Ok(Some(RawFrame::new(Vec::new(), 0, 0))),
            _ => Ok(Some(RawFrame::new(vec![90u8; 4 * 4 * 3], 4, 4))),
        }
    }

    fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Unary transport
// ============================================================================

/// Replies from a script; falls back to `fallback` once the script runs out.
///
/// When gated, every `send` waits for a permit released by the test.
pub struct ScriptedUnary {
    script: Mutex<VecDeque<Result<RecognitionReply, TransportError>>>,
    fallback: Result<RecognitionReply, TransportError>,
    gate: Option<Arc<Semaphore>>,
    started: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedUnary {
    pub fn new(script: Vec<Result<RecognitionReply, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Ok(RecognitionReply::no_match()),
            gate: None,
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn always(outcome: Result<RecognitionReply, TransportError>) -> Self {
        Self {
            fallback: outcome,
            ..Self::new(Vec::new())
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` gated sends complete
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl UnaryTransport for ScriptedUnary {
    async fn send(&self, _frame: &CapturedFrame) -> Result<RecognitionReply, TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Streaming transport
// ============================================================================

#[derive(Default)]
pub struct StreamCounters {
    pub opens: AtomicUsize,
    pub pushes: AtomicUsize,
    pub closes: AtomicUsize,
}

pub struct MockStreaming {
    auto_reply: Option<StreamPush>,
    fail_open: bool,
    fail_push: bool,
    sinks: Mutex<Vec<ReplySink>>,
    counters: Arc<StreamCounters>,
}

impl MockStreaming {
    /// Channel that never replies on its own
    pub fn silent() -> Self {
        Self {
            auto_reply: None,
            fail_open: false,
            fail_push: false,
            sinks: Mutex::new(Vec::new()),
            counters: Arc::new(StreamCounters::default()),
        }
    }

    /// Channel that answers every push with `reply`
    pub fn replying(reply: StreamPush) -> Self {
        Self {
            auto_reply: Some(reply),
            ..Self::silent()
        }
    }

    /// Transport whose `open` is refused
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::silent()
        }
    }

    /// Channel that opens but rejects every push
    pub fn failing_push() -> Self {
        Self {
            fail_push: true,
            ..Self::silent()
        }
    }

    pub fn counters(&self) -> Arc<StreamCounters> {
        Arc::clone(&self.counters)
    }

    /// Sink handed to the `index`-th opened channel
    pub fn sink(&self, index: usize) -> ReplySink {
        self.sinks.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl StreamingTransport for MockStreaming {
    async fn open(&self, sink: ReplySink) -> Result<Box<dyn StreamChannel>, TransportError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(TransportError::Connect("nats: connection refused".to_string()));
        }
        self.sinks.lock().unwrap().push(sink.clone());
        Ok(Box::new(MockChannel {
            sink,
            auto_reply: self.auto_reply.clone(),
            fail_push: self.fail_push,
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "mock stream"
    }
}

struct MockChannel {
    sink: ReplySink,
    auto_reply: Option<StreamPush>,
    fail_push: bool,
    counters: Arc<StreamCounters>,
    closed: bool,
}

#[async_trait::async_trait]
impl StreamChannel for MockChannel {
    async fn push(&mut self, _frame: &CapturedFrame) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.counters.pushes.fetch_add(1, Ordering::SeqCst);
        if self.fail_push {
            return Err(TransportError::Request("publish rejected".to_string()));
        }
        if let Some(reply) = self.auto_reply.clone() {
            self.sink.deliver(Ok(reply.into())).await;
        }
        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// Host
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    State(SessionState),
    Result(RecognitionResult),
    Error(String),
}

/// Records every callback and optionally forwards to a notice board
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
    tx: mpsc::UnboundedSender<HostEvent>,
    board: Option<Arc<NoticeBoard>>,
}

impl RecordingHost {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HostEvent>) {
        Self::build(None)
    }

    pub fn presenting(board: Arc<NoticeBoard>) -> (Arc<Self>, mpsc::UnboundedReceiver<HostEvent>) {
        Self::build(Some(board))
    }

    fn build(board: Option<Arc<NoticeBoard>>) -> (Arc<Self>, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                tx,
                board,
            }),
            rx,
        )
    }

    fn push(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event.clone());
        let _ = self.tx.send(event);
    }

    pub fn results(&self) -> Vec<RecognitionResult> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Result(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Error(kind) => Some(kind.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SessionHost for RecordingHost {
    fn on_state_change(&self, state: SessionState) {
        if let Some(board) = &self.board {
            board.on_state_change(state);
        }
        self.push(HostEvent::State(state));
    }

    fn on_result(&self, result: &RecognitionResult) {
        if let Some(board) = &self.board {
            board.on_result(result);
        }
        self.push(HostEvent::Result(result.clone()));
    }

    fn on_error(&self, generation: u64, error: &SessionError) {
        if let Some(board) = &self.board {
            board.on_error(generation, error);
        }
        self.push(HostEvent::Error(error.kind().to_string()));
    }
}

/// Wait (in virtual time when the clock is paused) for a matching event
pub async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<HostEvent>,
    predicate: impl Fn(&HostEvent) -> bool,
) -> Option<HostEvent> {
    tokio::time::timeout(Duration::from_secs(120), async {
        while let Some(event) = events.recv().await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

pub async fn wait_for_state(
    events: &mut mpsc::UnboundedReceiver<HostEvent>,
    state: SessionState,
) -> bool {
    wait_for(events, |e| *e == HostEvent::State(state))
        .await
        .is_some()
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn test_config() -> SessionConfig {
    SessionConfig {
        session_id: "face-test".to_string(),
        poll_interval_ms: 1000,
        result_timeout_ms: 60_000,
        max_consecutive_failures: 2,
        jpeg_quality: 80,
    }
}

pub fn ana_gomez() -> RecognitionReply {
    let response: RecognizeResponse = serde_json::from_str(
        r#"{"matched": true, "student": {"name": "Ana Gomez", "course": "CS101"}}"#,
    )
    .unwrap();
    response.into()
}

pub fn unknown_push() -> StreamPush {
    serde_json::from_str(r#"{"name": "Unknown"}"#).unwrap()
}

pub fn build_session(
    config: SessionConfig,
    gate: Arc<ModelGate>,
    camera: Arc<dyn CaptureSource>,
    transport: TransportStrategy,
    host: Arc<dyn SessionHost>,
) -> RecognitionSession {
    RecognitionSession::new(config, gate, camera, transport, host)
}

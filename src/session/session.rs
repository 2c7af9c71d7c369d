use super::capture_loop::{CaptureLoop, Link};
use super::config::SessionConfig;
use super::host::SessionHost;
use super::state::{RecognitionResult, SessionState};
use super::stats::SessionStats;
use crate::capture::{CaptureHandle, CaptureSource, FrameEncoder};
use crate::error::SessionError;
use crate::models::ModelGate;
use crate::transport::{Delivery, ReplySink, TransportKind, TransportStrategy};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DELIVERY_BUFFER: usize = 32;

/// A live face-match session: gate → capture → encode → transmit → present
///
/// Owned by exactly one host. `start()` begins a new generation; `stop()`
/// invalidates it immediately and releases the camera and channel.
pub struct RecognitionSession {
    /// Session configuration
    config: SessionConfig,

    /// Process-wide model readiness gate
    gate: Arc<ModelGate>,

    /// Camera the session acquires on start
    capture: Arc<dyn CaptureSource>,

    /// Unary or streaming recognition transport
    transport: TransportStrategy,

    /// Generation, state and statistics, shared with the capture loop
    shared: Arc<Shared>,

    /// Capture loop of the current (or most recent) generation
    run: Mutex<Option<ActiveRun>>,
}

struct ActiveRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RecognitionSession {
    pub fn new(
        config: SessionConfig,
        gate: Arc<ModelGate>,
        capture: Arc<dyn CaptureSource>,
        transport: TransportStrategy,
        host: Arc<dyn SessionHost>,
    ) -> Self {
        info!(
            "Creating recognition session: {} ({} transport via {}, capture via {})",
            config.session_id,
            transport.kind(),
            transport.name(),
            capture.name()
        );

        let shared = Arc::new(Shared::new(config.session_id.clone(), host));

        Self {
            config,
            gate,
            capture,
            transport,
            shared,
            run: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.stats()
    }

    /// Start a new generation
    ///
    /// Resolves once the camera is acquired and the capture loop is running,
    /// returning the new generation. Fatal start failures leave the session in
    /// `Error`; call `start()` again to retry.
    pub async fn start(&self) -> Result<u64, SessionError> {
        let generation = {
            let mut inner = self.shared.lock();
            if inner.state.is_active() {
                warn!(
                    "Session {} already active ({})",
                    self.config.session_id, inner.state
                );
                return Err(SessionError::SessionAlreadyActive);
            }

            inner.generation += 1;
            inner.stats = SessionStats {
                started_at: Some(Utc::now()),
                ..SessionStats::default()
            };
            self.shared.set_state(&mut inner, SessionState::ModelLoading);
            inner.generation
        };

        info!(
            "Starting recognition session {} (generation {})",
            self.config.session_id, generation
        );

        // Resets the session if this future is dropped before start settles
        let _pending = PendingStart {
            shared: &self.shared,
            generation,
        };

        // The previous loop may still be winding down after an autonomous stop
        self.join_previous_run().await;

        if let Err(e) = self.gate.ensure_ready().await {
            return Err(self.fail_start(generation, e.into()));
        }
        if !self.shared.is_current(generation) {
            info!("Session stopped while models were loading");
            return Err(SessionError::Cancelled);
        }

        let mut handle = match self.capture.acquire().await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail_start(generation, e.into())),
        };
        if !self.shared.is_current(generation) {
            handle.release();
            info!("Session stopped while the camera was being acquired");
            return Err(SessionError::Cancelled);
        }

        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        let link = match &self.transport {
            TransportStrategy::Unary(transport) => Link::Unary(Arc::clone(transport)),
            TransportStrategy::Streaming(transport) => {
                match transport.open(ReplySink::new(generation, tx.clone())).await {
                    Ok(channel) => Link::Streaming(channel),
                    Err(e) => {
                        handle.release();
                        return Err(self.fail_start(generation, e.into()));
                    }
                }
            }
        };

        self.launch(generation, handle, link, tx, rx).await
    }

    async fn launch(
        &self,
        generation: u64,
        mut handle: CaptureHandle,
        mut link: Link,
        tx: mpsc::Sender<Delivery>,
        rx: mpsc::Receiver<Delivery>,
    ) -> Result<u64, SessionError> {
        {
            let mut inner = self.shared.lock();
            if inner.generation == generation {
                self.shared.set_state(&mut inner, SessionState::Ready);

                let cancel = CancellationToken::new();
                let capture_loop = CaptureLoop::new(
                    generation,
                    self.config.clone(),
                    Arc::clone(&self.shared),
                    handle,
                    FrameEncoder::new(self.config.jpeg_quality),
                    link,
                    tx,
                    rx,
                    cancel.clone(),
                );
                let task = tokio::spawn(capture_loop.run());

                *self.run_slot() = Some(ActiveRun { cancel, task });
                info!(
                    "Recognition session {} ready (generation {})",
                    self.config.session_id, generation
                );
                return Ok(generation);
            }
        }

        // Stopped between acquisition and launch
        link.close().await;
        handle.release();
        Err(SessionError::Cancelled)
    }

    /// Stop the session
    ///
    /// Invalidates the current generation before anything else, so replies
    /// still in flight are discarded. Idempotent: a second call changes nothing.
    pub async fn stop(&self) -> SessionStats {
        let stopping = {
            let mut inner = self.shared.lock();
            if inner.state == SessionState::Terminated {
                false
            } else {
                inner.generation += 1;
                self.shared.set_state(&mut inner, SessionState::Terminated);
                true
            }
        };

        if stopping {
            info!("Stopping recognition session: {}", self.config.session_id);
        }

        self.join_previous_run().await;

        if stopping {
            info!("Recognition session {} stopped", self.config.session_id);
        }

        self.stats()
    }

    /// Cancel and await the loop of an earlier generation, if any
    async fn join_previous_run(&self) {
        let run = self.run_slot().take();
        if let Some(run) = run {
            run.cancel.cancel();
            if let Err(e) = run.task.await {
                error!("Capture loop panicked: {}", e);
            }
        }
    }

    fn fail_start(&self, generation: u64, err: SessionError) -> SessionError {
        error!(
            "Session {} failed to start ({}): {}",
            self.config.session_id,
            err.kind(),
            err
        );
        self.shared.fail(generation, &err);
        err
    }

    fn run_slot(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.run.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        {
            let mut inner = self.shared.lock();
            if inner.state != SessionState::Terminated && inner.state != SessionState::Idle {
                inner.generation += 1;
                self.shared.set_state(&mut inner, SessionState::Terminated);
            }
        }
        // The loop releases the camera and closes the channel on its way out
        if let Some(run) = self.run_slot().take() {
            run.cancel.cancel();
        }
    }
}

/// Armed for the duration of `start()`.
///
/// Every path that finishes a start moves the generation out of
/// `ModelLoading`; if the caller abandons the future mid-await the
/// generation is left there, and dropping this guard terminates it.
struct PendingStart<'a> {
    shared: &'a Shared,
    generation: u64,
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        self.shared.abandon(self.generation);
    }
}

/// Session state shared between the host-facing handle and the capture loop.
///
/// Every mutation checks the caller's generation under the lock, which is
/// what makes a stopped generation unable to touch state or the host.
pub(crate) struct Shared {
    session_id: String,
    inner: Mutex<Inner>,
    host: Arc<dyn SessionHost>,
}

pub(crate) struct Inner {
    pub(crate) generation: u64,
    pub(crate) state: SessionState,
    pub(crate) stats: SessionStats,
}

impl Shared {
    fn new(session_id: String, host: Arc<dyn SessionHost>) -> Self {
        Self {
            session_id,
            inner: Mutex::new(Inner {
                generation: 0,
                state: SessionState::Idle,
                stats: SessionStats::default(),
            }),
            host,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_state(&self, inner: &mut Inner, state: SessionState) {
        if inner.state == state {
            return;
        }
        info!(
            "Session {} (generation {}): {} -> {}",
            self.session_id, inner.generation, inner.state, state
        );
        inner.state = state;
        self.host.on_state_change(state);
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    pub(crate) fn state_if_current(&self, generation: u64) -> Option<SessionState> {
        let inner = self.lock();
        (inner.generation == generation).then_some(inner.state)
    }

    /// Move to `state` if `generation` is still current
    pub(crate) fn transition(&self, generation: u64, state: SessionState) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        self.set_state(&mut inner, state);
        true
    }

    pub(crate) fn record(&self, generation: u64, update: impl FnOnce(&mut SessionStats)) {
        let mut inner = self.lock();
        if inner.generation == generation {
            update(&mut inner.stats);
        }
    }

    pub(crate) fn record_stale(&self) {
        self.lock().stats.stale_discarded += 1;
    }

    /// Hand a result to the host, unless its generation has been superseded
    pub(crate) fn present(&self, result: RecognitionResult) -> bool {
        let mut inner = self.lock();
        if inner.generation != result.generation {
            inner.stats.stale_discarded += 1;
            return false;
        }

        let state = if result.matched {
            inner.stats.matches += 1;
            SessionState::Matched
        } else {
            inner.stats.no_matches += 1;
            SessionState::NoMatch
        };
        self.set_state(&mut inner, state);
        self.host.on_result(&result);
        true
    }

    /// Report a recoverable failure and return to capturing
    pub(crate) fn report_transient(&self, generation: u64, err: &SessionError) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        self.host.on_error(generation, err);
        self.set_state(&mut inner, SessionState::Capturing);
    }

    /// Enter `Error` for `generation`
    pub(crate) fn fail(&self, generation: u64, err: &SessionError) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        self.set_state(&mut inner, SessionState::Error);
        self.host.on_error(generation, err);
    }

    /// Terminate a start that never settled
    pub(crate) fn abandon(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != SessionState::ModelLoading {
            return;
        }
        warn!(
            "Session {} start abandoned (generation {})",
            self.session_id, generation
        );
        inner.generation += 1;
        self.set_state(&mut inner, SessionState::Terminated);
    }

    pub(crate) fn stats(&self) -> SessionStats {
        let inner = self.lock();
        SessionStats {
            state: inner.state,
            generation: inner.generation,
            ..inner.stats.clone()
        }
    }
}

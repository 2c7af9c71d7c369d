use super::config::SessionConfig;
use super::session::Shared;
use super::state::{RecognitionResult, SessionState};
use crate::capture::{CaptureHandle, CapturedFrame, EncodeError, Encoded, FrameEncoder};
use crate::error::SessionError;
use crate::transport::{Delivery, StreamChannel, TransportError, UnaryTransport};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The transport as seen by one running generation
pub(crate) enum Link {
    Unary(Arc<dyn UnaryTransport>),
    Streaming(Box<dyn StreamChannel>),
}

impl Link {
    pub(crate) async fn close(&mut self) {
        if let Link::Streaming(channel) = self {
            channel.close().await;
        }
    }
}

/// The request currently awaiting a reply
#[derive(Debug, Clone, Copy)]
struct Pending {
    sequence: u64,
    since: Instant,
}

enum Exit {
    Cancelled,
    BudgetExhausted(TransportError),
}

/// Timer-driven capture cycle for one generation.
///
/// Owns the camera handle and the transport link; both are released when
/// `run` returns, whichever way it exits.
pub(crate) struct CaptureLoop {
    generation: u64,
    config: SessionConfig,
    shared: Arc<Shared>,
    capture: CaptureHandle,
    encoder: FrameEncoder,
    link: Link,
    deliveries_tx: mpsc::Sender<Delivery>,
    deliveries: mpsc::Receiver<Delivery>,
    cancel: CancellationToken,
    pending: Option<Pending>,
    next_sequence: u64,
    consecutive_failures: u32,
}

impl CaptureLoop {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        generation: u64,
        config: SessionConfig,
        shared: Arc<Shared>,
        capture: CaptureHandle,
        encoder: FrameEncoder,
        link: Link,
        deliveries_tx: mpsc::Sender<Delivery>,
        deliveries: mpsc::Receiver<Delivery>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generation,
            config,
            shared,
            capture,
            encoder,
            link,
            deliveries_tx,
            deliveries,
            cancel,
            pending: None,
            next_sequence: 0,
            consecutive_failures: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Capture loop started (generation {})", self.generation);

        let cancel = self.cancel.clone();
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Exit::Cancelled,
                Some(delivery) = self.deliveries.recv() => {
                    if let Err(e) = self.on_delivery(delivery) {
                        break Exit::BudgetExhausted(e);
                    }
                }
                _ = ticker.tick() => {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break Exit::Cancelled,
                        outcome = self.on_tick() => outcome,
                    };
                    if let Err(e) = outcome {
                        break Exit::BudgetExhausted(e);
                    }
                }
            }
        };

        self.shutdown(exit).await;
    }

    async fn on_tick(&mut self) -> Result<(), TransportError> {
        if let Some(pending) = self.pending {
            let timeout = self.config.result_timeout();
            if pending.since.elapsed() < timeout {
                debug!("Request {} still outstanding, tick skipped", pending.sequence);
                return Ok(());
            }

            self.pending = None;
            warn!(
                "No result for frame {} after {} ms",
                pending.sequence, self.config.result_timeout_ms
            );
            self.register_failure(TransportError::Timeout(self.config.result_timeout_ms))?;
        }

        match self.shared.state_if_current(self.generation) {
            Some(state) if state.accepts_tick() => {}
            _ => return Ok(()),
        }
        self.shared.transition(self.generation, SessionState::Capturing);

        let frame = match self.capture.current_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Camera not ready yet, retrying on next tick");
                self.shared.record(self.generation, |s| s.frames_skipped += 1);
                return Ok(());
            }
            Err(e) => {
                warn!("Frame read failed: {}", e);
                self.shared.record(self.generation, |s| s.frames_skipped += 1);
                return Ok(());
            }
        };

        let (width, height, captured_at_ms) = (frame.width, frame.height, frame.captured_at_ms);
        let encoder = self.encoder;
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&frame))
            .await
            .map_err(|e| EncodeError::Codec(format!("encode worker failed: {}", e)))
            .and_then(|encoded| encoded);

        let payload = match encoded {
            Ok(Encoded::Jpeg(bytes)) => bytes,
            Ok(Encoded::Skipped) => {
                debug!("Empty frame ({}x{}), skipped", width, height);
                self.shared.record(self.generation, |s| {
                    s.frames_captured += 1;
                    s.frames_skipped += 1;
                });
                return Ok(());
            }
            Err(e) => {
                warn!("Frame encoding failed: {}", e);
                self.shared.record(self.generation, |s| {
                    s.frames_captured += 1;
                    s.frames_skipped += 1;
                });
                return Ok(());
            }
        };

        let frame = CapturedFrame {
            generation: self.generation,
            sequence: self.next_sequence,
            captured_at_ms,
            payload,
        };
        self.next_sequence += 1;
        self.shared.record(self.generation, |s| s.frames_captured += 1);

        self.transmit(frame).await
    }

    async fn transmit(&mut self, frame: CapturedFrame) -> Result<(), TransportError> {
        let sequence = frame.sequence;

        match &mut self.link {
            Link::Unary(transport) => {
                let transport = Arc::clone(transport);
                let tx = self.deliveries_tx.clone();
                let generation = self.generation;
                let timeout = self.config.result_timeout();
                let timeout_ms = self.config.result_timeout_ms;

                self.mark_in_flight(sequence, frame.payload.len());

                // Runs detached so stop() never waits on the network; a reply
                // for a stopped generation is dropped on arrival.
                tokio::spawn(async move {
                    let outcome = match tokio::time::timeout(timeout, transport.send(&frame)).await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(TransportError::Timeout(timeout_ms)),
                    };
                    let _ = tx
                        .send(Delivery {
                            generation,
                            sequence: Some(sequence),
                            outcome,
                        })
                        .await;
                });

                Ok(())
            }
            Link::Streaming(channel) => match channel.push(&frame).await {
                Ok(()) => {
                    self.mark_in_flight(sequence, frame.payload.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("Frame push failed: {}", e);
                    self.register_failure(e)
                }
            },
        }
    }

    fn mark_in_flight(&mut self, sequence: u64, bytes: usize) {
        debug!(
            "Frame {} sent (generation {}, {} bytes)",
            sequence, self.generation, bytes
        );
        self.pending = Some(Pending {
            sequence,
            since: Instant::now(),
        });
        self.shared.record(self.generation, |s| s.frames_sent += 1);
        self.shared.transition(self.generation, SessionState::AwaitingResult);
    }

    fn on_delivery(&mut self, delivery: Delivery) -> Result<(), TransportError> {
        if delivery.generation != self.generation {
            debug!(
                "Discarding reply from generation {} (current {})",
                delivery.generation, self.generation
            );
            self.shared.record_stale();
            return Ok(());
        }

        let Some(pending) = self.pending else {
            debug!("Discarding reply with no outstanding request");
            self.shared.record_stale();
            return Ok(());
        };
        if let Some(sequence) = delivery.sequence {
            if sequence != pending.sequence {
                debug!(
                    "Discarding reply for frame {} (awaiting {})",
                    sequence, pending.sequence
                );
                self.shared.record_stale();
                return Ok(());
            }
        }
        self.pending = None;

        match delivery.outcome {
            Ok(reply) => {
                self.consecutive_failures = 0;
                let result = RecognitionResult::from_reply(self.generation, reply);
                if self.shared.present(result) {
                    debug!("Result for frame {} presented", pending.sequence);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Recognition request {} failed: {}", pending.sequence, e);
                self.register_failure(e)
            }
        }
    }

    /// Count a transport failure; `Err` once the budget is exceeded
    fn register_failure(&mut self, err: TransportError) -> Result<(), TransportError> {
        self.consecutive_failures += 1;
        self.shared.record(self.generation, |s| s.transport_failures += 1);

        if self.consecutive_failures > self.config.max_consecutive_failures {
            return Err(err);
        }

        self.shared.report_transient(self.generation, &SessionError::Transport(err));
        Ok(())
    }

    async fn shutdown(mut self, exit: Exit) {
        self.link.close().await;
        self.capture.release();

        match exit {
            Exit::Cancelled => {
                info!("Capture loop stopped (generation {})", self.generation);
            }
            Exit::BudgetExhausted(e) => {
                error!(
                    "Giving up after {} consecutive transport failures: {}",
                    self.consecutive_failures, e
                );
                self.shared.fail(self.generation, &SessionError::Transport(e));
            }
        }
    }
}

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use vigil_core::{
    ChallengePicker, ConfigError, FusedDecision, FusionGate, LandmarkFrame, LivenessConfig,
    LivenessEngine, LivenessSession, StatusRecord,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid liveness config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// One status record leaving the engine thread.
#[derive(Debug, Clone, Serialize)]
pub struct EngineUpdate {
    pub frame: u64,
    /// Timestamp of the frame in seconds since stream start.
    pub t: f64,
    pub status: StatusRecord,
    /// Fused decision for the current result, if fusion ran for this cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<FusedDecision>,
}

/// Messages sent from the input task to the engine thread.
enum EngineRequest {
    Frame {
        frame: Option<LandmarkFrame>,
        timestamp: Duration,
        texture: Option<f32>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    SetActive {
        active: bool,
        reply: oneshot::Sender<()>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Queue one frame. `frame = None` reports that no face was found.
    ///
    /// Waits while the request channel is full, so a slow engine applies
    /// backpressure to the reader instead of buffering without bound.
    pub async fn submit(
        &self,
        frame: Option<LandmarkFrame>,
        timestamp: Duration,
        texture: Option<f32>,
    ) -> Result<(), EngineError> {
        self.tx
            .send(EngineRequest::Frame {
                frame,
                timestamp,
                texture,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Reset the session to Waiting. Resolves once the engine has applied it.
    pub async fn reset(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Reset { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Switch capture on or off.
    pub async fn set_active(&self, active: bool) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::SetActive {
                active,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Engine settings fixed for the life of the thread.
pub struct EngineOptions {
    pub liveness: LivenessConfig,
    pub seed: Option<u64>,
    pub fusion_enabled: bool,
    pub channel_capacity: usize,
}

/// Spawn the engine on a dedicated OS thread.
///
/// Returns the request handle and the receiving end of the update channel.
/// The thread exits once every handle is dropped, closing the update
/// channel behind it.
pub fn spawn_engine(
    options: EngineOptions,
) -> Result<(EngineHandle, mpsc::Receiver<EngineUpdate>), EngineError> {
    let mut engine = match options.seed {
        Some(seed) => LivenessEngine::seeded(options.liveness, seed)?,
        None => LivenessEngine::new(options.liveness)?,
    };
    let fusion_threshold = options.fusion_enabled.then(|| engine.config().fusion_accept_threshold);

    let capacity = options.channel_capacity.max(1);
    let span = tracing::Span::current();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(capacity);
    let (update_tx, update_rx) = mpsc::channel::<EngineUpdate>(capacity);

    std::thread::Builder::new()
        .name("vigil-engine".into())
        .spawn(move || {
            let _span = span.enter();
            tracing::info!("engine thread started");
            let mut session = engine.new_session();
            let mut worker = Worker {
                gate: FusionGate::new(fusion_threshold),
                frames: 0,
            };

            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Frame {
                        frame,
                        timestamp,
                        texture,
                    } => {
                        let Some(update) =
                            worker.run_frame(&mut engine, &mut session, frame, timestamp, texture)
                        else {
                            continue;
                        };
                        if update_tx.blocking_send(update).is_err() {
                            tracing::debug!("update receiver dropped");
                            break;
                        }
                    }
                    EngineRequest::Reset { reply } => {
                        engine.reset(&mut session);
                        worker.gate.clear();
                        let _ = reply.send(());
                    }
                    EngineRequest::SetActive { active, reply } => {
                        engine.set_active(&mut session, active);
                        worker.gate.clear();
                        let _ = reply.send(());
                    }
                }
            }
            tracing::info!(frames = worker.frames, "engine thread exiting");
        })?;

    Ok((EngineHandle { tx }, update_rx))
}

struct Worker {
    gate: FusionGate,
    frames: u64,
}

impl Worker {
    /// Process one frame. Rejected frames are logged and produce no update.
    fn run_frame<P: ChallengePicker>(
        &mut self,
        engine: &mut LivenessEngine<P>,
        session: &mut LivenessSession,
        frame: Option<LandmarkFrame>,
        timestamp: Duration,
        texture: Option<f32>,
    ) -> Option<EngineUpdate> {
        let index = self.frames;
        self.frames += 1;

        let status = match engine.process(session, frame.as_ref(), timestamp) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(frame = index, error = %e, "frame rejected");
                return None;
            }
        };

        self.gate.observe(&status, texture);

        Some(EngineUpdate {
            frame: index,
            t: timestamp.as_secs_f64(),
            status,
            decision: self.gate.decision(),
        })
    }
}

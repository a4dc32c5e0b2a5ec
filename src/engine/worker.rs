//! Background inference worker.
//!
//! One long-lived tokio task owns the engine.  Submissions are processed
//! strictly in order and each runs to completion before the next command is
//! read, so results come back in submission order and at most one inference
//! is in flight.
//!
//! Engine construction is the exception: it runs as a separate task the
//! worker polls alongside the command channel, so a submission that arrives
//! while initialization is still in flight is refused with `NotReady` right
//! away instead of being queued behind it and served late.
//!
//! ```text
//! UI ── WorkerCommand::{Init, Submit} ──▶ worker task ── WorkerEvent ──▶ UI
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;

use super::{create_engine, EngineError, RecognitionEngine};

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

/// Commands the UI sends to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Connect to the recognition service.  Sent once at startup.
    Init,
    /// Recognize one PNG image.
    Submit(Vec<u8>),
}

/// Events the worker reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Initialization finished; submissions will be served.
    Ready,
    /// Initialization failed; every future submission will be refused.
    InitFailed(EngineError),
    /// A submission produced LaTeX.
    Recognized(String),
    /// A submission failed.
    Failed(EngineError),
}

// ---------------------------------------------------------------------------
// InferenceWorker
// ---------------------------------------------------------------------------

/// The worker's state: engine config plus the engine once initialized.
pub struct InferenceWorker {
    config: EngineConfig,
    engine: Option<Arc<dyn RecognitionEngine>>,
}

impl InferenceWorker {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: None,
        }
    }

    /// Build a worker that skips initialization, for tests that script the
    /// engine directly.
    #[cfg(test)]
    pub fn with_engine(engine: Arc<dyn RecognitionEngine>) -> Self {
        Self {
            config: EngineConfig::default(),
            engine: Some(engine),
        }
    }

    /// Run the worker loop until the command channel closes.
    ///
    /// Spawn this on the runtime:
    /// `tokio::spawn(InferenceWorker::new(config).run(cmd_rx, event_tx))`.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<WorkerCommand>,
        events: mpsc::Sender<WorkerEvent>,
    ) {
        log::info!("worker: started");

        // In-flight engine construction, polled alongside the channel.
        let mut init_task: Option<JoinHandle<Result<Arc<dyn RecognitionEngine>, EngineError>>> =
            None;

        loop {
            tokio::select! {
                result = async { init_task.as_mut().expect("branch guarded").await },
                        if init_task.is_some() => {
                    init_task = None;
                    let event = self.finish_init(result);
                    if events.send(event).await.is_err() {
                        log::warn!("worker: event receiver gone, shutting down");
                        break;
                    }
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };

                    let event = match command {
                        WorkerCommand::Init => self.begin_init(&mut init_task),
                        WorkerCommand::Submit(image) => {
                            if init_task.is_some() {
                                log::warn!("worker: submission while initialization in flight");
                                Some(WorkerEvent::Failed(EngineError::NotReady))
                            } else {
                                Some(self.submit(&image).await)
                            }
                        }
                    };

                    if let Some(event) = event {
                        if events.send(event).await.is_err() {
                            log::warn!("worker: event receiver gone, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        log::info!("worker: stopped");
    }

    /// Kick off engine construction unless one already exists or is in
    /// flight.  Returns an immediate event only for the already-ready case.
    fn begin_init(
        &self,
        init_task: &mut Option<JoinHandle<Result<Arc<dyn RecognitionEngine>, EngineError>>>,
    ) -> Option<WorkerEvent> {
        if self.engine.is_some() {
            log::debug!("worker: already initialized");
            return Some(WorkerEvent::Ready);
        }
        if init_task.is_none() {
            let config = self.config.clone();
            *init_task = Some(tokio::spawn(async move { create_engine(&config).await }));
        }
        None
    }

    fn finish_init(
        &mut self,
        result: Result<Result<Arc<dyn RecognitionEngine>, EngineError>, tokio::task::JoinError>,
    ) -> WorkerEvent {
        match result {
            Ok(Ok(engine)) => {
                self.engine = Some(engine);
                WorkerEvent::Ready
            }
            Ok(Err(e)) => {
                log::error!("worker: engine initialization failed: {e}");
                WorkerEvent::InitFailed(e)
            }
            Err(e) => {
                log::error!("worker: initialization task aborted: {e}");
                WorkerEvent::InitFailed(EngineError::NotReady)
            }
        }
    }

    async fn submit(&self, image: &[u8]) -> WorkerEvent {
        // Input checks come before the readiness check so an empty payload is
        // reported as what it is, whether or not the engine ever came up.
        if image.is_empty() {
            log::warn!("worker: refusing empty submission");
            return WorkerEvent::Failed(EngineError::EmptyInput);
        }

        let Some(engine) = &self.engine else {
            log::warn!("worker: submission while engine not ready");
            return WorkerEvent::Failed(EngineError::NotReady);
        };

        match engine.recognize(image).await {
            Ok(latex) => WorkerEvent::Recognized(latex),
            Err(e) => {
                log::warn!("worker: recognition failed: {e}");
                WorkerEvent::Failed(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;

    fn spawn_worker(
        worker: InferenceWorker,
    ) -> (mpsc::Sender<WorkerCommand>, mpsc::Receiver<WorkerEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        tokio::spawn(worker.run(cmd_rx, event_tx));
        (cmd_tx, event_rx)
    }

    #[tokio::test]
    async fn submit_before_init_reports_not_ready() {
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::new(EngineConfig::default()));

        cmd_tx
            .send(WorkerCommand::Submit(vec![1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Failed(EngineError::NotReady))
        );
    }

    #[tokio::test]
    async fn empty_submission_never_reaches_the_engine() {
        let engine = Arc::new(MockEngine::ok("x^2"));
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::with_engine(engine.clone()));

        cmd_tx.send(WorkerCommand::Submit(vec![])).await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Failed(EngineError::EmptyInput))
        );
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_recognition_reports_latex() {
        let engine = Arc::new(MockEngine::ok("\\frac{a}{b}"));
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::with_engine(engine));

        cmd_tx
            .send(WorkerCommand::Submit(vec![0; 64]))
            .await
            .unwrap();

        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Recognized("\\frac{a}{b}".into()))
        );
    }

    #[tokio::test]
    async fn engine_failure_is_forwarded() {
        let engine = Arc::new(MockEngine::err(EngineError::Timeout));
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::with_engine(engine));

        cmd_tx
            .send(WorkerCommand::Submit(vec![0; 64]))
            .await
            .unwrap();

        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Failed(EngineError::Timeout))
        );
    }

    /// Two submissions queued back-to-back come back in submission order,
    /// one at a time.
    #[tokio::test]
    async fn submissions_are_processed_in_order() {
        let engine = Arc::new(MockEngine::ok("E = mc^2"));
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::with_engine(engine.clone()));

        cmd_tx
            .send(WorkerCommand::Submit(vec![1; 16]))
            .await
            .unwrap();
        cmd_tx.send(WorkerCommand::Submit(vec![])).await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Recognized("E = mc^2".into()))
        );
        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Failed(EngineError::EmptyInput))
        );
        assert_eq!(engine.call_count(), 1);
    }

    /// A submission sent while initialization is still in flight must be
    /// refused immediately, not queued behind the init and served late.
    /// The unanswered listener keeps the health probe (and so the init)
    /// pending until its timeout.
    #[tokio::test]
    async fn submit_during_init_is_refused_not_queued() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let config = EngineConfig {
            base_url: format!("http://127.0.0.1:{port}"),
            timeout_secs: 2,
            ..EngineConfig::default()
        };
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::new(config));

        cmd_tx.send(WorkerCommand::Init).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cmd_tx
            .send(WorkerCommand::Submit(vec![1, 2, 3]))
            .await
            .unwrap();

        // The refusal arrives before the init has resolved.
        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Failed(EngineError::NotReady))
        );
        // The init itself eventually times out against the silent listener.
        assert!(matches!(
            events.recv().await,
            Some(WorkerEvent::InitFailed(_))
        ));

        drop(listener);
    }

    #[tokio::test]
    async fn unknown_engine_kind_fails_init() {
        let config = EngineConfig {
            kind: "onnx".into(),
            ..EngineConfig::default()
        };
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::new(config));

        cmd_tx.send(WorkerCommand::Init).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(WorkerEvent::InitFailed(EngineError::Config(_)))
        ));
    }

    /// Init against a dead service reports `InitFailed`; later submissions
    /// are refused with `NotReady` instead of hanging.
    #[tokio::test]
    async fn failed_init_disables_submissions() {
        let config = EngineConfig {
            kind: "http".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
        };
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::new(config));

        cmd_tx.send(WorkerCommand::Init).await.unwrap();
        assert!(matches!(
            events.recv().await,
            Some(WorkerEvent::InitFailed(_))
        ));

        cmd_tx
            .send(WorkerCommand::Submit(vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(
            events.recv().await,
            Some(WorkerEvent::Failed(EngineError::NotReady))
        );
    }

    #[tokio::test]
    async fn init_is_idempotent_once_ready() {
        let engine = Arc::new(MockEngine::ok("1"));
        let (cmd_tx, mut events) = spawn_worker(InferenceWorker::with_engine(engine));

        cmd_tx.send(WorkerCommand::Init).await.unwrap();
        assert_eq!(events.recv().await, Some(WorkerEvent::Ready));

        cmd_tx.send(WorkerCommand::Init).await.unwrap();
        assert_eq!(events.recv().await, Some(WorkerEvent::Ready));
    }
}

//! Scripted in-memory `HumService` for controller tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ServiceError;
use crate::frequency::FrequencyMode;
use crate::intake::CandidateFile;
use crate::service::{Detection, HumService, TransformReply};

/// Lets a test decide when, and with what, a held call resolves.
pub(crate) type Gate<T> = async_channel::Sender<Result<T, ServiceError>>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Detect { name: String },
    Process { name: String, mode: FrequencyMode },
}

enum Scripted<T> {
    Ready(Result<T, ServiceError>),
    Held(async_channel::Receiver<Result<T, ServiceError>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T, ServiceError> {
        match self {
            Self::Ready(result) => result,
            Self::Held(rx) => rx
                .recv()
                .await
                .unwrap_or_else(|_| Err(ServiceError::Transport("gate dropped".into()))),
        }
    }
}

#[derive(Default)]
struct Script {
    detect: VecDeque<Scripted<Detection>>,
    process: VecDeque<Scripted<TransformReply>>,
    calls: Vec<Call>,
}

/// Unscripted analysis finds nothing; unscripted processing fails.
#[derive(Clone, Default)]
pub(crate) struct FakeService {
    script: Arc<Mutex<Script>>,
}

impl FakeService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_detect(&self, result: Result<Detection, ServiceError>) {
        self.script.lock().unwrap().detect.push_back(Scripted::Ready(result));
    }

    pub(crate) fn hold_detect(&self) -> Gate<Detection> {
        let (tx, rx) = async_channel::bounded(1);
        self.script.lock().unwrap().detect.push_back(Scripted::Held(rx));
        tx
    }

    pub(crate) fn push_process(&self, result: Result<TransformReply, ServiceError>) {
        self.script.lock().unwrap().process.push_back(Scripted::Ready(result));
    }

    pub(crate) fn hold_process(&self) -> Gate<TransformReply> {
        let (tx, rx) = async_channel::bounded(1);
        self.script.lock().unwrap().process.push_back(Scripted::Held(rx));
        tx
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    /// `(file name, mode)` of every transform call, in order.
    pub(crate) fn process_calls(&self) -> Vec<(String, FrequencyMode)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Process { name, mode } => Some((name, mode)),
                Call::Detect { .. } => None,
            })
            .collect()
    }
}

impl HumService for FakeService {
    fn detect_hum(
        &self,
        file: CandidateFile,
    ) -> impl Future<Output = Result<Detection, ServiceError>> + Send + 'static {
        let scripted = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Detect {
                name: file.name().to_string(),
            });
            script.detect.pop_front()
        };
        async move {
            match scripted {
                Some(scripted) => scripted.resolve().await,
                None => Ok(Detection::default()),
            }
        }
    }

    fn process_audio(
        &self,
        file: CandidateFile,
        mode: FrequencyMode,
    ) -> impl Future<Output = Result<TransformReply, ServiceError>> + Send + 'static {
        let scripted = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Process {
                name: file.name().to_string(),
                mode,
            });
            script.process.pop_front()
        };
        async move {
            match scripted {
                Some(scripted) => scripted.resolve().await,
                None => Err(ServiceError::Transport("no scripted reply".into())),
            }
        }
    }
}

/// A successful transform reply carrying `payload`.
pub(crate) fn reply(payload: &[u8], detected: Option<f64>) -> TransformReply {
    TransformReply {
        processed_audio: STANDARD.encode(payload),
        detected_frequency: detected,
        hum_frequency: None,
        message: None,
    }
}

pub(crate) fn status(status: u16, error: Option<&str>) -> ServiceError {
    ServiceError::Status {
        status,
        error: error.map(str::to_string),
    }
}

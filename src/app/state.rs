use async_channel::{Receiver, Sender};
use bytes::Bytes;
use futures_util::future::{AbortHandle, Aborted};
use tokio::runtime::Handle;

use super::timers::{Countdown, TimerGuard, BANNER_LIFETIME};
use crate::drop_target::DropTracker;
use crate::error::ServiceError;
use crate::frequency::{self, FrequencyMode};
use crate::intake::CandidateFile;
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::service::{Detection, HumService, TransformReply};
use crate::wav::AudioInfo;

/// Events sent from spawned tasks back to the controller.
///
/// Each event names the request, analysis or timer generation that produced
/// it; events from a superseded generation are dropped on arrival.
#[derive(Debug)]
pub enum SessionEvent {
    AnalysisSettled {
        epoch: u64,
        result: Result<Detection, ServiceError>,
    },
    TransformSettled {
        token: u64,
        result: Result<Result<TransformReply, ServiceError>, Aborted>,
    },
    ProgressTick {
        token: u64,
    },
    BannersExpired {
        epoch: u64,
    },
    CheckmarkExpired {
        epoch: u64,
    },
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No candidate file.
    Empty,
    /// A candidate file is loaded and nothing is in flight. Analysis may run.
    Ready,
    Processing,
    Succeeded,
    /// Last attempt failed or was cancelled.
    Failed,
}

/// A failed attempt, kept so it can be retried as-is.
#[derive(Debug, Clone)]
pub struct Failure {
    pub message: String,
    pub file: CandidateFile,
    pub mode: FrequencyMode,
}

/// Cleaned audio ready to be saved.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub media_type: &'static str,
    pub data: Bytes,
}

/// The single outstanding transform call. Dropping it aborts the call.
pub(crate) struct RequestToken {
    id: u64,
    abort: AbortHandle,
    cancelled: bool,
}

impl RequestToken {
    pub(crate) fn new(id: u64, abort: AbortHandle) -> Self {
        Self {
            id,
            abort,
            cancelled: false,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Idempotent. Whatever the call later settles with is read as cancelled.
    pub(crate) fn cancel(&mut self) {
        self.cancelled = true;
        self.abort.abort();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for RequestToken {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

pub(crate) struct InFlight {
    pub token: RequestToken,
    pub file: CandidateFile,
    pub mode: FrequencyMode,
    pub progress: u8,
    pub simulator: Option<TimerGuard>,
    pub retrying: bool,
}

pub(crate) enum Activity {
    Idle,
    Processing(InFlight),
    Succeeded,
    /// `None` when the attempt was cancelled; cancellation is not retryable.
    Failed(Option<Failure>),
}

/// Everything that belongs to the current candidate file. Dropping it releases
/// both previews and aborts any in-flight request.
pub(crate) struct Loaded {
    pub file: CandidateFile,
    pub estimate: String,
    pub original: PreviewHandle,
    pub transformed: Option<PreviewHandle>,
    pub audio: Option<AudioInfo>,
    pub downloaded: bool,
    pub detected: Option<f64>,
    pub activity: Activity,
}

impl Loaded {
    pub(crate) fn new(file: CandidateFile, estimate: String, original: PreviewHandle) -> Self {
        Self {
            file,
            estimate,
            original,
            transformed: None,
            audio: None,
            downloaded: false,
            detected: None,
            activity: Activity::Idle,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Analysis {
    epoch: u64,
    running: bool,
}

impl Analysis {
    pub(crate) fn begin(&mut self) -> u64 {
        self.epoch += 1;
        self.running = true;
        self.epoch
    }

    pub(crate) fn supersede(&mut self) {
        self.epoch += 1;
        self.running = false;
    }

    /// True when `epoch` is the analysis still being waited for.
    pub(crate) fn settle(&mut self, epoch: u64) -> bool {
        if self.running && epoch == self.epoch {
            self.running = false;
            return true;
        }
        false
    }
}

/// Transient error and notice messages, cleared together on expiry.
#[derive(Default)]
pub(crate) struct Banners {
    pub error: Option<String>,
    pub notice: Option<String>,
    pub dismiss: Countdown,
}

/// Drives one file through validation, optional analysis, processing,
/// retry and reset.
///
/// All state changes happen through `&mut self`. Remote calls and timers run
/// as tasks on `runtime` and report back through [`SessionController::next_event`].
pub struct SessionController<S> {
    pub(crate) service: S,
    pub(crate) runtime: Handle,
    pub(crate) events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    pub(crate) previews: PreviewRegistry,
    pub(crate) drop_target: DropTracker,
    pub(crate) mode: FrequencyMode,
    pub(crate) loaded: Option<Loaded>,
    pub(crate) analysis: Analysis,
    pub(crate) next_token: u64,
    pub(crate) banners: Banners,
    pub(crate) checkmark: Countdown,
    region_hint: Option<FrequencyMode>,
}

impl<S: HumService> SessionController<S> {
    pub fn new(service: S, runtime: Handle) -> Self {
        let (events_tx, events_rx) = async_channel::unbounded();
        Self {
            service,
            runtime,
            events_tx,
            events_rx,
            previews: PreviewRegistry::new(),
            drop_target: DropTracker::new(),
            mode: FrequencyMode::Auto,
            loaded: None,
            analysis: Analysis::default(),
            next_token: 0,
            banners: Banners::default(),
            checkmark: Countdown::default(),
            region_hint: None,
        }
    }

    /// Remember the likely mains frequency for `timezone`, for display.
    pub fn set_timezone(&mut self, timezone: &str) {
        let hint = frequency::regional_default(timezone);
        log::info!("Mains frequency for {timezone} is likely {hint}");
        self.region_hint = Some(hint);
    }

    /// Wait for the next task event and apply it.
    pub async fn next_event(&mut self) {
        match self.events_rx.recv().await {
            Ok(event) => self.handle_event(event),
            Err(e) => log::error!("Session event channel closed: {e}"),
        }
    }

    /// Apply one already-queued event, if any. Returns whether one was applied.
    pub fn try_next_event(&mut self) -> bool {
        match self.events_rx.try_recv() {
            Ok(event) => {
                self.handle_event(event);
                true
            }
            Err(_) => false,
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.loaded {
            None => Phase::Empty,
            Some(loaded) => match loaded.activity {
                Activity::Idle => Phase::Ready,
                Activity::Processing(_) => Phase::Processing,
                Activity::Succeeded => Phase::Succeeded,
                Activity::Failed(_) => Phase::Failed,
            },
        }
    }

    /// Percent complete. Simulated while processing, 100 after success.
    pub fn progress(&self) -> u8 {
        match self.loaded.as_ref().map(|l| &l.activity) {
            Some(Activity::Processing(flight)) => flight.progress,
            Some(Activity::Succeeded) => 100,
            _ => 0,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.phase() == Phase::Processing
    }

    pub fn is_retrying(&self) -> bool {
        matches!(
            self.loaded.as_ref().map(|l| &l.activity),
            Some(Activity::Processing(flight)) if flight.retrying
        )
    }

    pub fn is_analyzing(&self) -> bool {
        self.analysis.running
    }

    pub fn mode(&self) -> FrequencyMode {
        self.mode
    }

    pub fn region_hint(&self) -> Option<FrequencyMode> {
        self.region_hint
    }

    pub fn candidate(&self) -> Option<&CandidateFile> {
        self.loaded.as_ref().map(|l| &l.file)
    }

    pub fn estimate(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.estimate.as_str())
    }

    pub fn detected_frequency(&self) -> Option<f64> {
        self.loaded.as_ref().and_then(|l| l.detected)
    }

    pub fn last_failure(&self) -> Option<&Failure> {
        match self.loaded.as_ref().map(|l| &l.activity) {
            Some(Activity::Failed(failure)) => failure.as_ref(),
            _ => None,
        }
    }

    pub fn original_preview(&self) -> Option<&PreviewHandle> {
        self.loaded.as_ref().map(|l| &l.original)
    }

    pub fn transformed_preview(&self) -> Option<&PreviewHandle> {
        self.loaded.as_ref().and_then(|l| l.transformed.as_ref())
    }

    /// Header facts of the cleaned audio, when it is a readable WAV.
    pub fn result_audio(&self) -> Option<AudioInfo> {
        self.loaded.as_ref().and_then(|l| l.audio)
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn error(&self) -> Option<&str> {
        self.banners.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.banners.notice.as_deref()
    }

    pub fn show_checkmark(&self) -> bool {
        self.checkmark.is_armed()
    }

    pub fn is_drop_active(&self) -> bool {
        self.drop_target.is_active()
    }

    pub(crate) fn show_error(&mut self, message: String) {
        self.banners.error = Some(message);
        self.arm_banner_dismiss();
    }

    pub(crate) fn show_notice(&mut self, message: String) {
        self.banners.notice = Some(message);
        self.arm_banner_dismiss();
    }

    pub(crate) fn clear_banners(&mut self) {
        self.banners.error = None;
        self.banners.notice = None;
        self.banners.dismiss.disarm();
    }

    fn arm_banner_dismiss(&mut self) {
        self.banners.dismiss.arm(
            &self.runtime,
            BANNER_LIFETIME,
            &self.events_tx,
            |epoch| SessionEvent::BannersExpired { epoch },
        );
    }
}

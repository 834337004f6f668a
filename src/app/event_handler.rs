use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use futures_util::future::Aborted;

use super::state::{Activity, Failure, InFlight, SessionController, SessionEvent};
use super::timers::{CHECKMARK_LIFETIME, PROGRESS_CAP, PROGRESS_STEP};
use crate::error::{describe_failure, ServiceError};
use crate::preview::Role;
use crate::service::{Detection, HumService, TransformReply};
use crate::wav::{AudioInfo, OUTPUT_MEDIA_TYPE};

const CANCELLED_MESSAGE: &str = "Processing cancelled";
const DEFAULT_SUCCESS_MESSAGE: &str = "Audio processed successfully!";

impl<S: HumService> SessionController<S> {
    /// Apply a task event. This is the asynchronous half of the state machine.
    pub(crate) fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AnalysisSettled { epoch, result } => {
                self.on_analysis_settled(epoch, result);
            }
            SessionEvent::TransformSettled { token, result } => {
                self.on_transform_settled(token, result);
            }
            SessionEvent::ProgressTick { token } => {
                let Some(flight) = self.in_flight_mut(token) else {
                    return;
                };
                flight.progress = flight.progress.saturating_add(PROGRESS_STEP).min(PROGRESS_CAP);
                if flight.progress >= PROGRESS_CAP {
                    flight.simulator = None;
                }
            }
            SessionEvent::BannersExpired { epoch } => {
                if self.banners.dismiss.expire(epoch) {
                    self.banners.error = None;
                    self.banners.notice = None;
                }
            }
            SessionEvent::CheckmarkExpired { epoch } => {
                self.checkmark.expire(epoch);
            }
        }
    }

    fn in_flight_mut(&mut self, token: u64) -> Option<&mut InFlight> {
        match self.loaded.as_mut().map(|l| &mut l.activity) {
            Some(Activity::Processing(flight)) if flight.token.id() == token => Some(flight),
            _ => None,
        }
    }

    fn on_analysis_settled(&mut self, epoch: u64, result: Result<Detection, ServiceError>) {
        if !self.analysis.settle(epoch) {
            log::debug!("Discarding superseded analysis #{epoch}");
            return;
        }
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };

        match result {
            Ok(Detection {
                detected_frequency: Some(hz),
            }) if hz > 0.0 => {
                log::info!("Detected {hz} Hz hum in {}", loaded.file.name());
                loaded.detected = Some(hz);
                self.show_notice(format!("Detected {hz} Hz hum in audio"));
            }
            Ok(_) => {
                self.show_notice("No hum detected - audio appears clean".to_string());
            }
            // analysis is optional; its failures never reach the user
            Err(e) => log::warn!("Hum analysis failed: {e}"),
        }
    }

    fn on_transform_settled(
        &mut self,
        token: u64,
        result: Result<Result<TransformReply, ServiceError>, Aborted>,
    ) {
        let Some(loaded) = self.loaded.as_mut() else {
            log::debug!("Ignoring request #{token} settling after reset");
            return;
        };
        let current =
            matches!(&loaded.activity, Activity::Processing(f) if f.token.id() == token);
        if !current {
            log::debug!("Ignoring stale request #{token}");
            return;
        }
        let Activity::Processing(mut flight) =
            std::mem::replace(&mut loaded.activity, Activity::Idle)
        else {
            return;
        };
        flight.simulator = None;

        if flight.token.is_cancelled() {
            self.finish_cancelled();
            return;
        }
        match result {
            Err(Aborted) => self.finish_cancelled(),
            Ok(Ok(reply)) => self.finish_success(flight, reply),
            Ok(Err(e)) => self.finish_failure(flight, e),
        }
    }

    fn finish_cancelled(&mut self) {
        log::info!("{CANCELLED_MESSAGE}");
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.activity = Activity::Failed(None);
        }
        self.show_error(CANCELLED_MESSAGE.to_string());
    }

    fn finish_failure(&mut self, flight: InFlight, err: ServiceError) {
        let message = describe_failure(&err);
        log::error!("Processing {} failed: {err}", flight.file.name());
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.activity = Activity::Failed(Some(Failure {
                message: message.clone(),
                file: flight.file,
                mode: flight.mode,
            }));
        }
        self.show_error(message);
    }

    fn finish_success(&mut self, flight: InFlight, reply: TransformReply) {
        let payload = match STANDARD.decode(reply.processed_audio.trim()) {
            Ok(payload) => payload,
            Err(e) => return self.finish_failure(flight, ServiceError::Decode(e.to_string())),
        };
        if self.is_analyzing() {
            log::debug!("Dropping analysis overtaken by the processed result");
        }
        self.analysis.supersede();
        let frequency = reply
            .detected_frequency
            .or(reply.hum_frequency)
            .filter(|hz| *hz > 0.0);
        let message = reply
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());

        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        log::info!(
            "Processed {}: {} bytes of cleaned audio",
            flight.file.name(),
            payload.len()
        );
        self.previews.replace(
            &mut loaded.transformed,
            Role::Transformed,
            OUTPUT_MEDIA_TYPE,
            Bytes::from(payload),
        );
        loaded.audio = loaded
            .transformed
            .as_ref()
            .and_then(|handle| AudioInfo::probe(handle.data()));
        loaded.downloaded = false;
        loaded.detected = frequency;
        loaded.activity = Activity::Succeeded;

        self.show_notice(message);
        self.checkmark.arm(
            &self.runtime,
            CHECKMARK_LIFETIME,
            &self.events_tx,
            |epoch| SessionEvent::CheckmarkExpired { epoch },
        );
    }
}

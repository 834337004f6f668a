use futures_util::future::{AbortHandle, Abortable};

use super::state::{Activity, InFlight, RequestToken, SessionController, SessionEvent};
use super::timers::progress_simulator;
use crate::frequency::FrequencyMode;
use crate::intake::CandidateFile;
use crate::service::HumService;

impl<S: HumService> SessionController<S> {
    /// Fire-and-forget hum analysis of `file`. Supersedes any earlier analysis.
    pub(crate) fn dispatch_analysis(&mut self, file: CandidateFile) {
        let epoch = self.analysis.begin();
        log::info!("Analyzing {} for hum", file.name());

        let request = self.service.detect_hum(file);
        let sender = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = request.await;
            let _ = sender
                .send(SessionEvent::AnalysisSettled { epoch, result })
                .await;
        });
    }

    /// Start a transform call for `file` in `mode`, replacing any call already
    /// in flight.
    pub(crate) fn dispatch_transform(
        &mut self,
        file: CandidateFile,
        mode: FrequencyMode,
        retrying: bool,
    ) {
        self.clear_banners();
        self.checkmark.disarm();

        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        if let Activity::Processing(previous) = &mut loaded.activity {
            log::warn!("Replacing in-flight request #{}", previous.token.id());
            previous.token.cancel();
        }

        self.next_token += 1;
        let token = self.next_token;
        log::info!("Processing {} with mode {mode} (request #{token})", file.name());

        let (abort, registration) = AbortHandle::new_pair();
        let request = Abortable::new(self.service.process_audio(file.clone(), mode), registration);
        let sender = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = request.await;
            let _ = sender
                .send(SessionEvent::TransformSettled { token, result })
                .await;
        });

        let simulator = progress_simulator(&self.runtime, self.events_tx.clone(), token);
        loaded.activity = Activity::Processing(InFlight {
            token: RequestToken::new(token, abort),
            file,
            mode,
            progress: 0,
            simulator: Some(simulator),
            retrying,
        });
    }
}

use super::state::{Activity, Download, Loaded, SessionController};
use crate::error::SessionError;
use crate::frequency::FrequencyMode;
use crate::intake::{self, RawFile};
use crate::preview::Role;
use crate::service::HumService;
use crate::wav::OUTPUT_MEDIA_TYPE;

impl<S: HumService> SessionController<S> {
    /// Validate `file` and make it the session's candidate.
    ///
    /// On rejection the previous candidate is dropped as well, leaving the
    /// session empty.
    pub fn select(&mut self, file: RawFile) -> Result<(), SessionError> {
        self.clear_banners();
        self.checkmark.disarm();

        let name = file.name.clone();
        let candidate = match intake::validate(file) {
            Ok(candidate) => candidate,
            Err(rejection) => {
                log::warn!("Rejected {name}: {rejection}");
                self.unload();
                self.show_error(rejection.to_string());
                return Err(rejection.into());
            }
        };

        self.unload();
        let estimate = intake::estimate_duration(candidate.size());
        let original = self.previews.create(
            Role::Original,
            &candidate.preview_type(),
            candidate.data().clone(),
        );
        log::info!(
            "Accepted {} ({:.2} MB, estimated {estimate})",
            candidate.name(),
            candidate.size_mib()
        );

        let notice = intake::large_file_notice(&candidate, &estimate);
        self.loaded = Some(Loaded::new(candidate.clone(), estimate, original));
        if let Some(notice) = notice {
            self.show_notice(notice);
        }
        if self.mode == FrequencyMode::Auto {
            self.dispatch_analysis(candidate);
        }
        Ok(())
    }

    /// Change the frequency mode. Any detection shown so far is cleared;
    /// switching to auto re-runs analysis on the loaded file.
    pub fn set_frequency_mode(&mut self, mode: FrequencyMode) {
        self.mode = mode;
        self.analysis.supersede();
        let candidate = self.loaded.as_mut().map(|loaded| {
            loaded.detected = None;
            loaded.file.clone()
        });
        if let (FrequencyMode::Auto, Some(file)) = (mode, candidate) {
            self.dispatch_analysis(file);
        }
    }

    /// Send the candidate file to the transform service.
    pub fn process(&mut self) -> Result<(), SessionError> {
        let Some(file) = self.candidate().cloned() else {
            self.show_error(SessionError::NoFile.to_string());
            return Err(SessionError::NoFile);
        };
        let mode = self.mode;
        self.dispatch_transform(file, mode, false);
        Ok(())
    }

    /// Abort the in-flight transform. No effect unless processing.
    pub fn cancel(&mut self) {
        if let Some(Loaded {
            activity: Activity::Processing(flight),
            ..
        }) = self.loaded.as_mut()
        {
            if !flight.token.is_cancelled() {
                log::info!("Cancelling request #{}", flight.token.id());
            }
            flight.token.cancel();
        }
    }

    /// Re-issue the last failed attempt with the file and mode it used.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        let Some(failure) = self.last_failure() else {
            return Err(SessionError::NothingToRetry);
        };
        let (file, mode) = (failure.file.clone(), failure.mode);
        log::info!("Retrying {} with mode {mode}", file.name());
        self.dispatch_transform(file, mode, true);
        Ok(())
    }

    /// Return to the initial, empty session. Safe to call at any time.
    pub fn reset(&mut self) {
        self.cancel();
        self.unload();
        self.mode = FrequencyMode::Auto;
        self.clear_banners();
        self.checkmark.disarm();
    }

    /// Whether a cleaned result exists that has not been downloaded. Callers
    /// ask for confirmation before [`reset`](Self::reset) when this is true.
    pub fn has_unsaved_result(&self) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|l| l.transformed.is_some() && !l.downloaded)
    }

    /// Hand out the cleaned audio for saving.
    pub fn download(&mut self) -> Result<Download, SessionError> {
        let loaded = self.loaded.as_mut().ok_or(SessionError::NoResult)?;
        let handle = loaded.transformed.as_ref().ok_or(SessionError::NoResult)?;
        let download = Download {
            file_name: format!("{}_clean.wav", loaded.file.stem()),
            media_type: OUTPUT_MEDIA_TYPE,
            data: handle.data().clone(),
        };
        loaded.downloaded = true;
        Ok(download)
    }

    /// Pointer entered the drop zone or one of its children.
    pub fn drag_enter(&mut self) -> bool {
        self.drop_target.on_enter()
    }

    /// Pointer left the drop zone or one of its children.
    pub fn drag_leave(&mut self) -> bool {
        self.drop_target.on_leave()
    }

    /// Files were dropped. The first one is selected; the rest are ignored.
    pub fn drop_files(&mut self, files: Vec<RawFile>) -> Result<(), SessionError> {
        match self.drop_target.on_drop(files) {
            Some(file) => self.select(file),
            None => Ok(()),
        }
    }

    /// Drop the current candidate with its previews and in-flight request.
    fn unload(&mut self) {
        self.analysis.supersede();
        if let Some(loaded) = self.loaded.take() {
            log::debug!("Unloading {}", loaded.file.name());
        }
    }
}

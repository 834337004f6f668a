//! Client-side orchestration for the hum removal service: intake checks,
//! optional hum analysis, a cancellable and retryable transform request, and
//! the preview handles backing the original and cleaned audio.

pub mod app;
pub mod config;
pub mod drop_target;
pub mod error;
pub mod frequency;
pub mod intake;
pub mod preview;
pub mod service;
pub mod wav;

pub use app::{Download, Failure, Phase, SessionController, SessionEvent};
pub use error::{Rejection, ServiceError, SessionError};
pub use frequency::FrequencyMode;
pub use intake::{CandidateFile, RawFile};
pub use service::{HttpService, HumService};

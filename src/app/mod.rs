mod actions;
mod event_handler;
mod pipeline;
mod state;
mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use state::{Download, Failure, Phase, SessionController, SessionEvent};

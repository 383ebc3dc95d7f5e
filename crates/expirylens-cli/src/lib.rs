//! Terminal front-end: submit an image, show detections and the expiry verdict.

pub mod controller;
pub mod display;
pub mod render;

#[cfg(test)]
mod testing;

pub use controller::{Phase, Presenter, Report, Session, SubmitError, SubmitOutcome};

//! Controller layer: failure classification and UI command orchestration.

pub mod events;
pub mod orchestration;

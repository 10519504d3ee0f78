//! Per-user swipe sessions over a shared catalog.

pub mod manager;
pub mod presentation;

pub use manager::{GobbleSessionManager, SessionOptions, UserStatus};
pub use presentation::{controls_for, Control, Presentation};

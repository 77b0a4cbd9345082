//! Parkr - parking lot registry and billing
//!
//! This library exports the core modules for testing and potential reuse.

pub mod clock;
pub mod logging;
pub mod models;
pub mod storage;
pub mod ui;

//! Observability for the monitor
//!
//! Structured console logging via `tracing`, with span macros for the
//! per-cycle and per-alert context.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat, LogSettings};

// Span macros for structured logging
pub use logging::{alert_span, cycle_span};

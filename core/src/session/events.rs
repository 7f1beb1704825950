//! Outward-facing event sinks.
//!
//! The session narrates its progress through two one-way channels: a
//! four-lamp indicator and a short-text notifier. Both are fire-and-forget
//! from the session's point of view; implementations that need to do real
//! work (drive GPIO pins, speak a phrase) must not block the caller.

use std::fmt;

// ---------------------------------------------------------------------------
// Indicator Events
// ---------------------------------------------------------------------------

/// The fixed indicator vocabulary. Four lamps, no more: every terminal
/// state maps onto one of these, with [`IndicatorEvent::AuthFailed`]
/// doubling as the generic failure lamp for code timeouts, invalid
/// requests, and signing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorEvent {
    /// A face cleared the matching policy.
    AuthOk,
    /// The session ended without authorization (or failed after it).
    AuthFailed,
    /// A structurally valid payment request was decoded.
    CodeReceived,
    /// A signed artifact was produced and rendered.
    Signed,
}

impl fmt::Display for IndicatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AuthOk => "auth_ok",
            Self::AuthFailed => "auth_failed",
            Self::CodeReceived => "code_received",
            Self::Signed => "signed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Sink Traits
// ---------------------------------------------------------------------------

/// One-way indicator output (LEDs, a status lamp, a log line).
pub trait IndicatorSink: Send + Sync {
    /// Signals an event. Must not block.
    fn indicate(&self, event: IndicatorEvent);
}

/// One-way short-text prompts describing the current step (a speaker, a
/// screen, stdout).
pub trait NotificationSink: Send + Sync {
    /// Delivers a prompt. Must not block the session on completion.
    fn notify(&self, message: &str);
}

/// A sink that swallows everything. Useful when a deployment has no
/// indicator hardware and for tests that do not assert on events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl IndicatorSink for NullSink {
    fn indicate(&self, _event: IndicatorEvent) {}
}

impl NotificationSink for NullSink {
    fn notify(&self, _message: &str) {}
}

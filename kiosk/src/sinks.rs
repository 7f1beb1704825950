//! # Indicator & Narration Sinks
//!
//! The kiosk's outward signals. On the original hardware these were GPIO
//! LEDs and a speaker; here they are a tracing-backed status lamp and a
//! narrator that either shells out to a text-to-speech command or prints
//! to stdout. Both are one-way and must never block the session.

use std::process::{Child, Command, Stdio};

use parking_lot::Mutex;

use aperture_core::session::{IndicatorEvent, IndicatorSink, NotificationSink};

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

/// An indicator lamp that lights up the log stream instead of a GPIO pin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingIndicator;

impl IndicatorSink for TracingIndicator {
    fn indicate(&self, event: IndicatorEvent) {
        match event {
            IndicatorEvent::AuthOk | IndicatorEvent::CodeReceived | IndicatorEvent::Signed => {
                tracing::info!(indicator = %event, "lamp");
            }
            IndicatorEvent::AuthFailed => {
                tracing::warn!(indicator = %event, "lamp");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Narrator
// ---------------------------------------------------------------------------

/// Speaks short prompts through an external TTS command, or prints them
/// when no command is configured.
///
/// The command is spawned with the prompt as its single argument and not
/// waited on — narration must never hold up the session. At most one
/// speech process is tracked: the next prompt preempts a previous one
/// still playing and reaps it, so a long session does not accumulate
/// zombies.
pub struct SpeechNarrator {
    command: Option<String>,
    speaking: Mutex<Option<Child>>,
}

impl SpeechNarrator {
    /// A narrator shelling out to `command`, or printing when `None`.
    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            speaking: Mutex::new(None),
        }
    }
}

impl NotificationSink for SpeechNarrator {
    fn notify(&self, message: &str) {
        let Some(command) = &self.command else {
            println!("{message}");
            return;
        };

        let spawned = Command::new(command)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                let mut slot = self.speaking.lock();
                if let Some(mut previous) = slot.take() {
                    // The new prompt preempts one still playing; a finished
                    // one just needs reaping. Neither may stall the session,
                    // so the only unconditional wait is after a kill.
                    if matches!(previous.try_wait(), Ok(None)) {
                        let _ = previous.kill();
                    }
                    let _ = previous.wait();
                }
                *slot = Some(child);
            }
            Err(e) => {
                // A broken speaker must not fail the session.
                tracing::warn!(command = %command, error = %e, "narration failed, printing instead");
                println!("{message}");
            }
        }
    }
}

impl Drop for SpeechNarrator {
    fn drop(&mut self) {
        if let Some(mut child) = self.speaking.lock().take() {
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_does_not_panic() {
        let narrator = SpeechNarrator::new(Some("/no/such/tts/binary".to_string()));
        narrator.notify("hello");
    }

    #[test]
    fn stdout_mode_does_not_panic() {
        let narrator = SpeechNarrator::new(None);
        narrator.notify("hello");
    }

    #[test]
    fn real_command_is_spawned_and_reaped() {
        let narrator = SpeechNarrator::new(Some("true".to_string()));
        narrator.notify("first");
        narrator.notify("second");
        // Drop reaps the remaining child.
    }

    #[test]
    fn a_new_prompt_does_not_wait_for_the_previous_one() {
        use std::time::{Duration, Instant};

        let narrator = SpeechNarrator::new(Some("sleep".to_string()));
        narrator.notify("2");

        let started = Instant::now();
        narrator.notify("0");
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "notify stalled on the previous narration: {:?}",
            started.elapsed()
        );
    }
}

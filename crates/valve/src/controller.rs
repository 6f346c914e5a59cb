//! Valve mode-reconciliation and actuation state machine.
//!
//! Pure transition logic: `apply_command` and `tick` compute what the valve
//! should do from an already-decoded command (or the clock) and return an
//! [`Outcome`] for the caller to act on.  No I/O happens here — the MQTT
//! glue in `main.rs` forwards actuations to the GPIO pin and reports to the
//! status topic.

use std::fmt;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Manual,
    Auto,
}

impl Mode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Mode::Manual => "manual",
            Mode::Auto => "auto",
        }
    }
}

/// One decoded control message, consumed exactly once.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandEvent {
    pub(crate) mode: Mode,
    /// Requested on/off state.
    pub(crate) on: bool,
    pub(crate) auto_on_threshold: i32,
    pub(crate) auto_off_threshold: i32,
    /// Section moisture, pre-aggregated upstream across the sensing nodes.
    pub(crate) moisture: i32,
    /// Manual-off timer in minutes; zero or negative means no timeout.
    pub(crate) manual_off_min: i64,
}

/// Emitted whenever a transition actuated the valve and the change must be
/// published back to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StatusReport {
    pub(crate) mode: Mode,
    pub(crate) on: bool,
}

/// Inverted threshold pair: open-below bound sits above the close-above
/// bound.  Surfaced as a warning; actuation continues on the literal
/// comparisons either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConfigFault {
    pub(crate) auto_on_threshold: i32,
    pub(crate) auto_off_threshold: i32,
}

impl fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "auto_on_threshold ({}) exceeds auto_off_threshold ({}) — dead band is inverted",
            self.auto_on_threshold, self.auto_off_threshold
        )
    }
}

/// What a single transition produced.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Outcome {
    /// `Some(open)` when the physical pin must be driven.
    pub(crate) actuation: Option<bool>,
    pub(crate) report: Option<StatusReport>,
    pub(crate) fault: Option<ConfigFault>,
}

// ---------------------------------------------------------------------------
// Controller state
// ---------------------------------------------------------------------------

pub(crate) struct ValveController {
    mode: Mode,
    valve_open: bool,
    /// Armed only while `mode == Manual` and the valve is open with a
    /// positive timer; cleared by every path that closes the valve or
    /// leaves manual mode.
    manual_off_deadline: Option<Instant>,
    auto_on_threshold: i32,
    auto_off_threshold: i32,
    last_moisture: i32,
}

impl Default for ValveController {
    /// Boot state: manual mode, valve closed, nothing armed.
    fn default() -> Self {
        Self {
            mode: Mode::Manual,
            valve_open: false,
            manual_off_deadline: None,
            auto_on_threshold: 0,
            auto_off_threshold: 0,
            last_moisture: 0,
        }
    }
}

impl ValveController {
    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn valve_open(&self) -> bool {
        self.valve_open
    }

    /// Last stored (on, off) threshold pair.
    pub(crate) fn thresholds(&self) -> (i32, i32) {
        (self.auto_on_threshold, self.auto_off_threshold)
    }

    pub(crate) fn last_moisture(&self) -> i32 {
        self.last_moisture
    }

    /// Process one command.  §-order matters: the transition-into-auto check
    /// reads the *previous* mode, which is only overwritten at the end.
    pub(crate) fn apply_command(&mut self, cmd: &CommandEvent, now: Instant) -> Outcome {
        let mut out = Outcome::default();

        if cmd.auto_on_threshold > cmd.auto_off_threshold {
            out.fault = Some(ConfigFault {
                auto_on_threshold: cmd.auto_on_threshold,
                auto_off_threshold: cmd.auto_off_threshold,
            });
        }

        match cmd.mode {
            Mode::Auto => {
                if self.mode != Mode::Auto {
                    // Entering auto from manual: honor the operator's last
                    // requested state exactly once, bypassing thresholds.
                    // Threshold logic takes over from the next event onward.
                    self.set_valve(cmd.on, &mut out);
                    out.report = Some(StatusReport {
                        mode: Mode::Auto,
                        on: cmd.on,
                    });
                } else if self.valve_open && cmd.moisture >= cmd.auto_off_threshold {
                    self.set_valve(false, &mut out);
                    out.report = Some(StatusReport {
                        mode: Mode::Auto,
                        on: false,
                    });
                } else if !self.valve_open && cmd.moisture <= cmd.auto_on_threshold {
                    self.set_valve(true, &mut out);
                    out.report = Some(StatusReport {
                        mode: Mode::Auto,
                        on: true,
                    });
                }
                // else: dead band — no actuation, no report.
                self.manual_off_deadline = None;
            }
            Mode::Manual => {
                if cmd.on {
                    self.set_valve(true, &mut out);
                    self.manual_off_deadline = if cmd.manual_off_min > 0 {
                        // Saturate on absurd timer values: an unrepresentable
                        // deadline degrades to "no automatic timeout".
                        let secs = (cmd.manual_off_min as u64).saturating_mul(60);
                        now.checked_add(Duration::from_secs(secs))
                    } else {
                        // Non-positive timer: open with no automatic timeout.
                        None
                    };
                    // Manual on is a direct actuation; the hub already knows.
                    // It is deliberately not reported — see DESIGN.md.
                } else {
                    self.set_valve(false, &mut out);
                    self.manual_off_deadline = None;
                }
            }
        }

        self.mode = cmd.mode;
        self.auto_on_threshold = cmd.auto_on_threshold;
        self.auto_off_threshold = cmd.auto_off_threshold;
        self.last_moisture = cmd.moisture;

        out
    }

    /// Periodic deadline check.  The only path by which a manually-opened
    /// valve closes itself without an explicit command.
    pub(crate) fn tick(&mut self, now: Instant) -> Outcome {
        let mut out = Outcome::default();

        if self.mode == Mode::Manual && self.valve_open {
            if let Some(deadline) = self.manual_off_deadline {
                if now >= deadline {
                    self.set_valve(false, &mut out);
                    self.manual_off_deadline = None;
                    out.report = Some(StatusReport {
                        mode: Mode::Manual,
                        on: false,
                    });
                }
            }
        }

        out
    }

    /// Sole mutation point for `valve_open`: the pin drive and the shadow
    /// state always move together.
    fn set_valve(&mut self, open: bool, out: &mut Outcome) {
        self.valve_open = open;
        out.actuation = Some(open);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Physical valve drive via GPIO. The `gpio` feature gates the real rppal
//! driver; without it, a mock implementation tracks state and logs to stderr.

use anyhow::Result;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin};

// ---------------------------------------------------------------------------
// Real GPIO pin (production — requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub(crate) struct ValvePin {
    pin: OutputPin,
    active_low: bool, // many relay boards are active-low
}

#[cfg(feature = "gpio")]
impl ValvePin {
    pub(crate) fn new(pin_num: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(pin_num)?.into_output();

        // Fail-safe: valve closed at startup
        if active_low {
            pin.set_high();
        } else {
            pin.set_low();
        }

        Ok(Self { pin, active_low })
    }

    pub(crate) fn set(&mut self, open: bool) {
        let level_high = open != self.active_low;
        if level_high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

// ---------------------------------------------------------------------------
// Mock pin (development — no hardware, logs state to stderr)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub(crate) struct ValvePin {
    pub(super) open: bool,
}

#[cfg(not(feature = "gpio"))]
impl ValvePin {
    pub(crate) fn new(pin_num: u8, _active_low: bool) -> Result<Self> {
        eprintln!("[mock-gpio] valve pin {pin_num} registered (not wired), valve CLOSED");
        Ok(Self { open: false })
    }

    pub(crate) fn set(&mut self, open: bool) {
        self.open = open;
        eprintln!(
            "[mock-gpio] valve set {}",
            if self.open { "OPEN" } else { "CLOSED" }
        );
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -- ValvePin (mock) ----------------------------------------------------

    #[test]
    fn valve_pin_starts_closed() {
        let pin = ValvePin::new(2, true).unwrap();
        assert!(!pin.open);
    }

    #[test]
    fn valve_pin_set_open() {
        let mut pin = ValvePin::new(2, true).unwrap();
        pin.set(true);
        assert!(pin.open);
    }

    #[test]
    fn valve_pin_set_closed_again() {
        let mut pin = ValvePin::new(2, true).unwrap();
        pin.set(true);
        pin.set(false);
        assert!(!pin.open);
    }

    #[test]
    fn valve_pin_set_is_idempotent() {
        let mut pin = ValvePin::new(2, false).unwrap();
        pin.set(true);
        pin.set(true);
        assert!(pin.open);
    }
}

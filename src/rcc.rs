//! Clock tree as configured by the startup code
//!
//! The oscillator and PLL are set up by the configuration fuses or by the
//! application before any driver runs. This module only records the result so
//! drivers can derive their dividers from it.

use core::cell::Cell;

use critical_section::Mutex;
use fugit::HertzU32 as Hertz;

// Power on default: FRC, PBDIV = 1:8
const FRC_FREQUENCY: Hertz = Hertz::from_raw(8_000_000);
const DEFAULT_PB_FREQUENCY: Hertz = Hertz::from_raw(1_000_000);

static CLOCKS: Mutex<Cell<Clocks>> = Mutex::new(Cell::new(Clocks {
    sysclk: FRC_FREQUENCY,
    pbclk: DEFAULT_PB_FREQUENCY,
}));

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    pub sysclk: Hertz,
    /// Peripheral bus clock, SYSCLK / PBDIV
    pub pbclk: Hertz,
}

impl Clocks {
    /// Clocks for a system clock divided down by `pbdiv` (1, 2, 4 or 8) on the peripheral bus.
    pub fn new(sysclk: Hertz, pbdiv: u32) -> Self {
        assert!(matches!(pbdiv, 1 | 2 | 4 | 8), "PBDIV must be 1, 2, 4 or 8");

        Self {
            sysclk,
            pbclk: Hertz::from_raw(sysclk.to_Hz() / pbdiv),
        }
    }
}

#[inline]
pub fn clocks() -> Clocks {
    critical_section::with(|cs| CLOCKS.borrow(cs).get())
}

/// Record the clocks the oscillator was configured for.
pub fn set_clocks(clocks: Clocks) {
    debug!("sysclk {} Hz, pbclk {} Hz", clocks.sysclk.to_Hz(), clocks.pbclk.to_Hz());

    critical_section::with(|cs| CLOCKS.borrow(cs).set(clocks));
}

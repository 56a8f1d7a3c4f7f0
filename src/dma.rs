//! DMA controller interface
//!
//! Peripherals don't drive the DMA controller themselves. They only describe where
//! a channel should read or write and which interrupt vectors start or abort a cell
//! transfer; running the channel is left to the DMA driver implementing [`DmaChannel`].

use crate::interrupt::Interrupt;
use crate::register::PhysAddr;

/// Interrupt-triggered DMA event: start (CHSIRQ) or abort (CHAIRQ).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaIrq {
    pub enable: bool,
    pub irq: Interrupt,
}

impl DmaIrq {
    pub const fn on(irq: Interrupt) -> Self {
        Self { enable: true, irq }
    }
}

/// One channel of the DMA controller.
pub trait DmaChannel {
    /// Source start address and size, counted in cells.
    fn configure_source(&mut self, address: PhysAddr, cells: u16);

    /// Destination start address and size, counted in cells.
    fn configure_destination(&mut self, address: PhysAddr, cells: u16);

    /// Bytes moved per cell transfer event.
    fn configure_cell_size(&mut self, size: u8);

    fn configure_start_event(&mut self, event: DmaIrq);

    fn configure_abort_event(&mut self, event: DmaIrq);
}

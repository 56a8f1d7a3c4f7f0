//! Atomic register access
//!
//! Every peripheral register on the PIC32 is shadowed by write-only registers at
//! fixed offsets: CLR (+0x4), SET (+0x8) and INV (+0xC). A write to a shadow
//! modifies only the bits set in the written value, in a single bus cycle, so
//! `set_bits`/`clear_bits` never race with an interrupt handler doing the same.

use core::ptr;

const CLR: u32 = 0x4;
const SET: u32 = 0x8;

/// A peripheral register.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Reg(u32);

impl Reg {
    pub(crate) const fn at(addr: u32) -> Self {
        Self(addr)
    }

    /// Register `bytes` further on in the memory map.
    pub(crate) const fn offset(self, bytes: u32) -> Self {
        Self(self.0 + bytes)
    }

    pub(crate) const fn addr(self) -> u32 {
        self.0
    }

    /// Physical address as seen by bus masters such as the DMA controller.
    pub const fn phys_addr(self) -> PhysAddr {
        PhysAddr(self.0 & 0x1FFF_FFFF)
    }
}

/// Physical bus address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysAddr(u32);

impl PhysAddr {
    pub const fn to_bits(self) -> u32 {
        self.0
    }
}

/// Word-wide register access, atomic against interrupt context.
pub trait Bus {
    /// Read the full register.
    fn read(&self, reg: Reg) -> u32;

    /// Overwrite the full register.
    fn write(&self, reg: Reg, value: u32);

    /// Set the bits in `mask`, leaving the others untouched.
    fn set_bits(&self, reg: Reg, mask: u32);

    /// Clear the bits in `mask`, leaving the others untouched.
    fn clear_bits(&self, reg: Reg, mask: u32);
}

/// Memory-mapped access to the real peripherals.
///
/// Only the crate builds one, for [`CHANNELS`](crate::spi::CHANNELS):
///
/// ```compile_fail
/// let _ = pic32mx_hal::register::Mmio { _private: () };
/// ```
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    #[inline(always)]
    fn ptr(reg: Reg, shadow: u32) -> *mut u32 {
        (reg.addr() + shadow) as usize as *mut u32
    }
}

impl Bus for Mmio {
    #[inline]
    fn read(&self, reg: Reg) -> u32 {
        // Safety: `Reg` values are only constructed from the memory map in `pac`
        unsafe { ptr::read_volatile(Self::ptr(reg, 0)) }
    }

    #[inline]
    fn write(&self, reg: Reg, value: u32) {
        unsafe { ptr::write_volatile(Self::ptr(reg, 0), value) }
    }

    #[inline]
    fn set_bits(&self, reg: Reg, mask: u32) {
        unsafe { ptr::write_volatile(Self::ptr(reg, SET), mask) }
    }

    #[inline]
    fn clear_bits(&self, reg: Reg, mask: u32) {
        unsafe { ptr::write_volatile(Self::ptr(reg, CLR), mask) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phys_addr_strips_kseg1() {
        assert_eq!(Reg::at(0xBF80_5820).phys_addr().to_bits(), 0x1F80_5820);
    }

    #[test]
    fn offset_moves_forward() {
        assert_eq!(Reg::at(0xBF88_1030).offset(0x10).addr(), 0xBF88_1040);
    }
}

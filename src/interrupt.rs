//! Interrupt vectors
//!
//! Each vector owns one flag bit in `IFSx` and one enable bit in `IECx`. Both are
//! derived from the vector number, so the tables in the drivers can't drift from it.

use crate::pac::{IEC0, IFS0};
use crate::register::Reg;

macro_rules! impl_irqs {
    ($($irqs:ident = $num:literal),* $(,)?) => {
        /// Interrupt request number.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u8)]
        pub enum Interrupt {
            $(
                #[doc=stringify!($irqs)]
                #[doc=" interrupt."]
                $irqs = $num,
            )*
        }
    }
}

impl_irqs!(
    SPI1_ERR = 35,
    SPI1_RX = 36,
    SPI1_TX = 37,
    SPI2_ERR = 53,
    SPI2_RX = 54,
    SPI2_TX = 55,
);

impl Interrupt {
    #[inline]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Bit of this vector in its flag and enable registers.
    #[inline]
    pub const fn mask(self) -> u32 {
        1 << (self.number() % 32)
    }

    const fn bank(self) -> u32 {
        self.number() as u32 / 32
    }

    pub(crate) const fn flag_register(self) -> Reg {
        IFS0.offset(0x10 * self.bank())
    }

    pub(crate) const fn enable_register(self) -> Reg {
        IEC0.offset(0x10 * self.bank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spi1_lives_in_ifs1_low_bits() {
        assert_eq!(Interrupt::SPI1_ERR.mask(), 0x0000_0008);
        assert_eq!(Interrupt::SPI1_RX.mask(), 0x0000_0010);
        assert_eq!(Interrupt::SPI1_TX.mask(), 0x0000_0020);
        assert_eq!(Interrupt::SPI1_TX.flag_register(), IFS0.offset(0x10));
        assert_eq!(Interrupt::SPI1_TX.enable_register(), IEC0.offset(0x10));
    }

    #[test]
    fn spi2_lives_in_ifs1_high_bits() {
        assert_eq!(Interrupt::SPI2_ERR.mask(), 0x0020_0000);
        assert_eq!(Interrupt::SPI2_RX.mask(), 0x0040_0000);
        assert_eq!(Interrupt::SPI2_TX.mask(), 0x0080_0000);
        assert_eq!(Interrupt::SPI2_ERR.flag_register(), IFS0.offset(0x10));
    }
}

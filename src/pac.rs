//! Memory map and register layouts, PIC32MX SPI and interrupt controller
//!
//! Addresses are KSEG1 (uncached) virtual addresses. The DMA engine wants physical
//! addresses, see [`Reg::phys_addr`].

use crate::register::Reg;

/// SPI1 register block
pub(crate) const SPI1: SpiRegs = SpiRegs::at(0xBF80_5800);
/// SPI2 register block
pub(crate) const SPI2: SpiRegs = SpiRegs::at(0xBF80_5A00);

/// Interrupt flag status registers, one every 0x10
pub(crate) const IFS0: Reg = Reg::at(0xBF88_1030);
/// Interrupt enable control registers, one every 0x10
pub(crate) const IEC0: Reg = Reg::at(0xBF88_1060);

/// Largest value SPIxBRG holds (13 bits)
pub const BRG_MAX: u32 = 0x1FFF;

/// Register set of one SPI instance.
///
/// Each register is followed by its CLR/SET/INV shadows, hence the 0x10 stride.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpiRegs {
    pub con: Reg,
    pub stat: Reg,
    pub buf: Reg,
    pub brg: Reg,
    pub con2: Reg,
}

impl SpiRegs {
    const fn at(base: u32) -> Self {
        Self {
            con: Reg::at(base),
            stat: Reg::at(base + 0x10),
            buf: Reg::at(base + 0x20),
            brg: Reg::at(base + 0x30),
            con2: Reg::at(base + 0x40),
        }
    }
}

bitfield::bitfield! {
    /// SPIxCON
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Control(u32);
    impl Debug;
    /// Framed SPI support
    pub frmen, set_frmen: 31;
    /// Frame sync pulse direction, set for input (slave)
    pub frmsync, set_frmsync: 30;
    pub frmpol, set_frmpol: 29;
    /// Master mode slave select enable
    pub mssen, set_mssen: 28;
    pub frmsypw, set_frmsypw: 27;
    pub u8, frmcnt, set_frmcnt: 26, 24;
    /// Clock the baud rate generator from REFCLK instead of PBCLK
    pub mclksel, set_mclksel: 23;
    pub spife, set_spife: 17;
    /// Enhanced buffer, enables the FIFOs
    pub enhbuf, set_enhbuf: 16;
    pub on, set_on: 15;
    /// Stop in idle mode
    pub sidl, set_sidl: 13;
    pub dissdo, set_dissdo: 12;
    pub mode32, set_mode32: 11;
    pub mode16, set_mode16: 10;
    /// Sample input at end of data output time
    pub smp, set_smp: 9;
    /// Output changes on transition from active to idle clock
    pub cke, set_cke: 8;
    pub ssen, set_ssen: 7;
    /// Clock idle state is high
    pub ckp, set_ckp: 6;
    pub msten, set_msten: 5;
    pub dissdi, set_dissdi: 4;
    pub u8, stxisel, set_stxisel: 3, 2;
    pub u8, srxisel, set_srxisel: 1, 0;
}

impl Control {
    pub const ON: u32 = 1 << 15;
    pub const MSTEN: u32 = 1 << 5;
    pub const MODE16: u32 = 1 << 10;
    pub const MODE32: u32 = 1 << 11;

    /// Raw control word, applied verbatim.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

bitfield::bitfield! {
    /// SPIxSTAT
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Status(u32);
    impl Debug;
    /// Words in the receive FIFO (enhanced buffer only)
    pub u8, rxbufelm, _: 28, 24;
    /// Words in the transmit FIFO (enhanced buffer only)
    pub u8, txbufelm, _: 20, 16;
    pub frmerr, _: 12;
    pub spibusy, _: 11;
    pub spitur, _: 8;
    /// Shift register empty
    pub srmt, _: 7;
    /// Receive overflow, cleared by software
    pub spirov, _: 6;
    /// Receive FIFO empty (enhanced buffer only)
    pub spirbe, _: 5;
    /// Transmit FIFO empty (enhanced buffer only)
    pub spitbe, _: 3;
    pub spitbf, _: 1;
    pub spirbf, _: 0;
}

impl Status {
    pub const SPITBF: u32 = 1 << 1;
    pub const SPIRBE: u32 = 1 << 5;
    pub const SPIROV: u32 = 1 << 6;

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

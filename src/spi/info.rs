use crate::interrupt::Interrupt;
use crate::pac::{self, SpiRegs};
use crate::register::{Bus, Reg};

/// Fixed description of one SPI instance.
pub(crate) struct Info {
    pub regs: SpiRegs,
    pub interrupts: InterruptMap,
}

/// Where the interrupt bits of one SPI instance live.
///
/// The three vectors share an `IFSx`/`IECx` pair with other peripherals.
pub(crate) struct InterruptMap {
    pub ifs: Reg,
    pub iec: Reg,
    pub fault: Interrupt,
    pub receive: Interrupt,
    pub transfer: Interrupt,
}

impl InterruptMap {
    const fn new(fault: Interrupt, receive: Interrupt, transfer: Interrupt) -> Self {
        let ifs = fault.flag_register();
        if receive.flag_register().addr() != ifs.addr() || transfer.flag_register().addr() != ifs.addr() {
            ::core::panic!("SPI interrupt vectors must share a flag register");
        }

        Self {
            ifs,
            iec: fault.enable_register(),
            fault,
            receive,
            transfer,
        }
    }

    pub const fn mask(&self) -> u32 {
        self.fault.mask() | self.receive.mask() | self.transfer.mask()
    }

    /// Mask all three sources and drop anything pending.
    pub fn disable(&self, bus: &impl Bus) {
        bus.clear_bits(self.iec, self.mask());
        bus.clear_bits(self.ifs, self.mask());
    }
}

pub(crate) static INFO: [Info; 2] = [
    Info {
        regs: pac::SPI1,
        interrupts: InterruptMap::new(Interrupt::SPI1_ERR, Interrupt::SPI1_RX, Interrupt::SPI1_TX),
    },
    Info {
        regs: pac::SPI2,
        interrupts: InterruptMap::new(Interrupt::SPI2_ERR, Interrupt::SPI2_RX, Interrupt::SPI2_TX),
    },
];

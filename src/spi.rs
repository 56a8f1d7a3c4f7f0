//! SPI, Serial Peripheral Interface
//!
//! Two instances, [`Channel::Spi1`] and [`Channel::Spi2`]. A channel is owned by at
//! most one [`Spi`] handle at a time; [`Registry::acquire`] hands it out and dropping
//! the handle (or [`Spi::release`]) turns the peripheral off and gives it back.
//!
//! Transfers are blocking: the CPU polls the status register for buffer space. For
//! longer transfers wire the channel to a DMA channel with
//! [`Spi::wire_as_dma_source`] / [`Spi::wire_as_dma_destination`] instead.

/*
Supports master and slave modes
Supports 8, 16 or 32-bit data width
Enhanced buffer mode with transmit/receive FIFOs, 16/8/4 entries deep
Framed SPI and audio codec protocols
The highest clock frequency supports up to half of PBCLK
Supports changing clock phase and polarity
Transmit and receive buffers support DMA transfer
*/

mod info;

use core::cell::Cell;

use critical_section::Mutex;
use embedded_hal::spi::{Mode, Phase, Polarity, MODE_0};
use fugit::HertzU32 as Hertz;

use self::info::{Info, INFO};
use crate::dma::{DmaChannel, DmaIrq};
pub use crate::pac::Control;
use crate::pac::{SpiRegs, Status, BRG_MAX};
use crate::register::{Bus, Mmio};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Spi1,
    Spi2,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Spi1, Channel::Spi2];

    const fn index(self) -> usize {
        match self {
            Channel::Spi1 => 0,
            Channel::Spi2 => 1,
        }
    }

    fn info(self) -> &'static Info {
        &INFO[self.index()]
    }

    /// Register set of this instance.
    pub(crate) fn registers(self) -> SpiRegs {
        self.info().regs
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Nothing to transmit
    EmptyBuffer,
    /// The peripheral is not configured as bus master
    NotMaster,
    /// Receive FIFO overflowed, data was lost
    Overrun,
}

/// Data width, selected by `MODE32`/`MODE16` in SPIxCON.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataWidth {
    #[default]
    Bits8,
    Bits16,
    Bits32,
}

impl DataWidth {
    /// `MODE32` wins over `MODE16`, as in hardware.
    pub const fn from_control(control: Control) -> Self {
        if control.bits() & Control::MODE32 != 0 {
            DataWidth::Bits32
        } else if control.bits() & Control::MODE16 != 0 {
            DataWidth::Bits16
        } else {
            DataWidth::Bits8
        }
    }
}

/// Shape of the hardware FIFO for one data width.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fifo {
    /// Entries
    pub depth: u8,
    /// Bytes per entry
    pub size: u8,
}

impl Fifo {
    pub const fn for_width(width: DataWidth) -> Self {
        match width {
            DataWidth::Bits32 => Fifo { depth: 4, size: 4 },
            DataWidth::Bits16 => Fifo { depth: 8, size: 2 },
            DataWidth::Bits8 => Fifo { depth: 16, size: 1 },
        }
    }
}

#[non_exhaustive]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Config {
    /// Zero leaves the baud rate generator at PBCLK/2.
    pub baudrate: Hertz,
    /// Written verbatim to SPIxCON.
    pub control: Control,
}

impl Default for Config {
    /// 1 MHz, 8-bit, master, mode 0, enabled
    fn default() -> Self {
        let mut control = Control::default();
        control.set_on(true);
        control.set_msten(true);

        Self {
            baudrate: Hertz::from_raw(1_000_000),
            control,
        }
        .with_mode(MODE_0)
    }
}

impl Config {
    pub const fn new(baudrate: Hertz, control: Control) -> Self {
        Self { baudrate, control }
    }

    pub fn with_baudrate(mut self, baudrate: Hertz) -> Self {
        self.baudrate = baudrate;
        self
    }

    pub fn with_data_width(mut self, width: DataWidth) -> Self {
        self.control.set_mode32(width == DataWidth::Bits32);
        self.control.set_mode16(width == DataWidth::Bits16);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        // CKP
        self.control.set_ckp(mode.polarity == Polarity::IdleHigh);
        // CKE is the inverse of CPHA
        self.control.set_cke(mode.phase == Phase::CaptureOnFirstTransition);
        self
    }

    pub fn master(mut self) -> Self {
        self.control.set_msten(true);
        self
    }

    pub fn slave(mut self) -> Self {
        self.control.set_msten(false);
        self
    }

    pub fn enabled(mut self) -> Self {
        self.control.set_on(true);
        self
    }

    /// Configure, but leave the peripheral off until [`Spi::enable`].
    pub fn disabled(mut self) -> Self {
        self.control.set_on(false);
        self
    }

    pub fn enhanced_buffer(mut self, enable: bool) -> Self {
        self.control.set_enhbuf(enable);
        self
    }
}

/// SPIxBRG value for `baudrate`: PBCLK / (2 * baudrate) - 1
///
/// Rates the generator can't reach are capped silently: anything above PBCLK/2 gives
/// 0 (the fastest clock), anything below PBCLK/(2 * (BRG_MAX + 1)) gives [`BRG_MAX`].
/// A rate of zero also gives 0.
#[inline]
pub fn baud_rate_divisor(pbclk: Hertz, baudrate: Hertz) -> u32 {
    let baudrate = baudrate.to_Hz();
    if baudrate == 0 {
        return 0;
    }

    (pbclk.to_Hz() / 2 / baudrate).saturating_sub(1).min(BRG_MAX)
}

/// Ownership of the SPI channels.
///
/// There is one per physical bus, [`CHANNELS`] for the hardware. Another one can't be
/// made from outside the crate, not even over a bus of the caller's own:
///
/// ```compile_fail
/// use pic32mx_hal::register::{Bus, Reg};
/// use pic32mx_hal::spi::Registry;
///
/// struct Shadow;
///
/// impl Bus for Shadow {
///     fn read(&self, _: Reg) -> u32 { 0 }
///     fn write(&self, _: Reg, _: u32) {}
///     fn set_bits(&self, _: Reg, _: u32) {}
///     fn clear_bits(&self, _: Reg, _: u32) {}
/// }
///
/// let _second = Registry::new(Shadow);
/// ```
///
/// Nor can the hardware bus be reached without a handle:
///
/// ```compile_fail
/// use pic32mx_hal::register::Bus;
/// use pic32mx_hal::spi::{Channel, CHANNELS};
///
/// CHANNELS.bus().write(Channel::Spi1.registers().con, 0);
/// ```
pub struct Registry<B> {
    bus: B,
    assigned: [Mutex<Cell<bool>>; 2],
}

impl<B: Bus> Registry<B> {
    pub(crate) const fn new(bus: B) -> Self {
        Self {
            bus,
            assigned: [Mutex::new(Cell::new(false)), Mutex::new(Cell::new(false))],
        }
    }

    /// Take `channel` and configure it, or `None` if it is already taken.
    pub fn acquire(&self, channel: Channel, config: Config) -> Option<Spi<'_, B>> {
        let taken = critical_section::with(|cs| self.assigned[channel.index()].borrow(cs).replace(true));
        if taken {
            debug!("{:?} already assigned", channel);
            return None;
        }

        let mut spi = Spi {
            registry: self,
            channel,
            width: DataWidth::Bits8,
        };
        spi.reconfigure(config);

        trace!("{:?} acquired", channel);
        Some(spi)
    }

    pub fn is_assigned(&self, channel: Channel) -> bool {
        critical_section::with(|cs| self.assigned[channel.index()].borrow(cs).get())
    }

    fn release(&self, channel: Channel) {
        self.bus.clear_bits(channel.info().regs.con, Control::ON);
        critical_section::with(|cs| self.assigned[channel.index()].borrow(cs).set(false));

        trace!("{:?} released", channel);
    }
}

#[cfg(any(test, feature = "mock"))]
impl Registry<crate::mock::MockBus> {
    /// Registry over an in-memory bus, for host tests.
    pub fn with_mock(bus: crate::mock::MockBus) -> Self {
        Self::new(bus)
    }

    pub fn mock(&self) -> &crate::mock::MockBus {
        &self.bus
    }
}

/// The SPI peripherals of this chip.
pub static CHANNELS: Registry<Mmio> = Registry::new(Mmio::new());

/// Take `channel` from [`CHANNELS`].
pub fn acquire(channel: Channel, config: Config) -> Option<Spi<'static, Mmio>> {
    CHANNELS.acquire(channel, config)
}

/// SPI driver, exclusive owner of one channel.
pub struct Spi<'r, B: Bus> {
    registry: &'r Registry<B>,
    channel: Channel,
    width: DataWidth,
}

impl<'r, B: Bus> Spi<'r, B> {
    #[inline]
    fn bus(&self) -> &'r B {
        &self.registry.bus
    }

    #[inline]
    fn regs(&self) -> &'static SpiRegs {
        &self.channel.info().regs
    }

    fn control(&self) -> Control {
        Control::from_bits(self.bus().read(self.regs().con))
    }

    fn status(&self) -> Status {
        Status::from_bits(self.bus().read(self.regs().stat))
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Data width of the most recent configuration.
    pub fn data_width(&self) -> DataWidth {
        self.width
    }

    pub fn fifo_depth(&self) -> u8 {
        Fifo::for_width(self.width).depth
    }

    /// Bytes per FIFO entry, the DMA cell size.
    pub fn fifo_size(&self) -> u8 {
        Fifo::for_width(self.width).size
    }

    pub fn is_enabled(&self) -> bool {
        self.control().on()
    }

    pub fn is_master(&self) -> bool {
        self.control().msten()
    }

    /// Apply `config`. The peripheral is switched off first and its interrupts are
    /// masked; it comes back on only if `config` has `ON` set.
    pub fn reconfigure(&mut self, config: Config) {
        let bus = self.bus();
        let info = self.channel.info();

        // Disable module first
        bus.clear_bits(info.regs.con, Control::ON);
        info.interrupts.disable(bus);

        let brg = baud_rate_divisor(crate::rcc::clocks().pbclk, config.baudrate);
        bus.write(info.regs.brg, brg);
        bus.write(info.regs.con, config.control.bits());

        self.width = DataWidth::from_control(config.control);

        debug!(
            "{:?} configured: brg {}, fifo {}x{}",
            self.channel,
            brg,
            self.fifo_depth(),
            self.fifo_size()
        );
    }

    pub fn enable(&mut self) {
        self.bus().set_bits(self.regs().con, Control::ON);
    }

    pub fn disable(&mut self) {
        self.bus().clear_bits(self.regs().con, Control::ON);
    }

    /// Let `dma` read received data out of SPIxBUF, one FIFO entry per receive interrupt.
    ///
    /// The cell size follows the data width of the most recent configuration.
    pub fn wire_as_dma_source(&self, dma: &mut impl DmaChannel) {
        let info = self.channel.info();

        dma.configure_source(info.regs.buf.phys_addr(), 1); // one fifo entry per transfer
        dma.configure_cell_size(self.fifo_size());
        dma.configure_start_event(DmaIrq::on(info.interrupts.receive));
        dma.configure_abort_event(DmaIrq::on(info.interrupts.fault));
    }

    /// Let `dma` feed SPIxBUF, one FIFO entry per transmit interrupt.
    pub fn wire_as_dma_destination(&self, dma: &mut impl DmaChannel) {
        let info = self.channel.info();

        dma.configure_destination(info.regs.buf.phys_addr(), 1); // one fifo entry per transfer
        dma.configure_cell_size(self.fifo_size());
        dma.configure_start_event(DmaIrq::on(info.interrupts.transfer));
        dma.configure_abort_event(DmaIrq::on(info.interrupts.fault));
    }

    /// Blocking write of full words, for 16 and 32-bit data width.
    ///
    /// Fails without touching SPIxBUF if `words` is empty or the peripheral is not bus master.
    pub fn transmit_words(&mut self, words: &[u32]) -> Result<(), Error> {
        self.transmit(words)
    }

    /// Blocking write of bytes, for 8-bit data width.
    ///
    /// Fails without touching SPIxBUF if `bytes` is empty or the peripheral is not bus master.
    pub fn transmit_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.transmit(bytes)
    }

    fn transmit<W: Word>(&mut self, words: &[W]) -> Result<(), Error> {
        let control = self.enabled_control();

        if words.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        if !control.msten() {
            return Err(Error::NotMaster);
        }

        for &word in words {
            self.write_word(word);
        }
        Ok(())
    }

    /// Blocking write.
    pub fn blocking_write<W: Word>(&mut self, words: &[W]) -> Result<(), Error> {
        self.ensure_master()?;
        for &word in words {
            self.write_word(word);
        }
        Ok(())
    }

    /// Blocking read, clocking out zeros.
    pub fn blocking_read<W: Word>(&mut self, words: &mut [W]) -> Result<(), Error> {
        self.ensure_master()?;
        for word in words.iter_mut() {
            *word = self.transfer_word(W::default())?;
        }
        Ok(())
    }

    /// Blocking in-place bidirectional transfer.
    ///
    /// This writes the contents of `data` on SDO, and puts the received data on SDI in `data`, at the same time.
    pub fn blocking_transfer_in_place<W: Word>(&mut self, words: &mut [W]) -> Result<(), Error> {
        self.ensure_master()?;
        for word in words.iter_mut() {
            *word = self.transfer_word(*word)?;
        }
        Ok(())
    }

    /// Blocking bidirectional transfer.
    ///
    /// The transfer runs for `max(read.len(), write.len())` words. If `read` is shorter extra words are ignored.
    /// If `write` is shorter it is padded with zeros.
    pub fn blocking_transfer<W: Word>(&mut self, read: &mut [W], write: &[W]) -> Result<(), Error> {
        self.ensure_master()?;
        let len = read.len().max(write.len());
        for i in 0..len {
            let wb = write.get(i).copied().unwrap_or_default();
            let rb = self.transfer_word(wb)?;
            if let Some(r) = read.get_mut(i) {
                *r = rb;
            }
        }
        Ok(())
    }

    /// Wait until the last word has left the shift register.
    pub fn blocking_flush(&mut self) {
        while self.status().spibusy() {}
    }

    /// Turn the peripheral off and give the channel back.
    pub fn release(self) {
        // Drop does the work
    }

    fn enabled_control(&self) -> Control {
        let control = self.control();
        assert!(control.on(), "SPI channel used while disabled");
        control
    }

    fn ensure_master(&self) -> Result<(), Error> {
        if self.enabled_control().msten() {
            Ok(())
        } else {
            Err(Error::NotMaster)
        }
    }

    fn write_word<W: Word>(&self, word: W) {
        let regs = self.regs();

        while self.bus().read(regs.stat) & Status::SPITBF != 0 {} // wait for room in the buffer
        self.bus().write(regs.buf, word.to_raw());
    }

    fn transfer_word<W: Word>(&mut self, word: W) -> Result<W, Error> {
        self.write_word(word);
        while !self.rx_ready()? {}
        Ok(W::from_raw(self.bus().read(self.regs().buf)))
    }

    fn rx_ready(&self) -> Result<bool, Error> {
        let stat = self.status();

        if stat.spirov() {
            self.bus().clear_bits(self.regs().stat, Status::SPIROV);
            return Err(Error::Overrun);
        }

        if self.control().enhbuf() {
            Ok(!stat.spirbe())
        } else {
            Ok(stat.spirbf())
        }
    }
}

impl<'r, B: Bus> Drop for Spi<'r, B> {
    fn drop(&mut self) {
        self.registry.release(self.channel);
    }
}

impl<'r, B: Bus> embedded_hal::spi::ErrorType for Spi<'r, B> {
    type Error = Error;
}

impl<'r, B: Bus, W: Word> embedded_hal::spi::SpiBus<W> for Spi<'r, B> {
    fn flush(&mut self) -> Result<(), Self::Error> {
        self.blocking_flush();
        Ok(())
    }

    fn read(&mut self, words: &mut [W]) -> Result<(), Self::Error> {
        self.blocking_read(words)
    }

    fn write(&mut self, words: &[W]) -> Result<(), Self::Error> {
        self.blocking_write(words)
    }

    fn transfer(&mut self, read: &mut [W], write: &[W]) -> Result<(), Self::Error> {
        self.blocking_transfer(read, write)
    }

    fn transfer_in_place(&mut self, words: &mut [W]) -> Result<(), Self::Error> {
        self.blocking_transfer_in_place(words)
    }
}

impl<'r, B: Bus, W: Word> embedded_hal_nb::spi::FullDuplex<W> for Spi<'r, B> {
    fn read(&mut self) -> nb::Result<W, Self::Error> {
        self.enabled_control();
        if self.rx_ready()? {
            Ok(W::from_raw(self.bus().read(self.regs().buf)))
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn write(&mut self, word: W) -> nb::Result<(), Self::Error> {
        self.enabled_control();
        if self.status().spitbf() {
            Err(nb::Error::WouldBlock)
        } else {
            self.bus().write(self.regs().buf, word.to_raw());
            Ok(())
        }
    }
}

impl embedded_hal::spi::Error for Error {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        match *self {
            Self::EmptyBuffer => embedded_hal::spi::ErrorKind::Other,
            Self::NotMaster => embedded_hal::spi::ErrorKind::ModeFault,
            Self::Overrun => embedded_hal::spi::ErrorKind::Overrun,
        }
    }
}

pub(crate) mod sealed {
    pub trait Word: Copy + Default + 'static {
        fn to_raw(self) -> u32;
        fn from_raw(raw: u32) -> Self;
    }
}

/// Word sizes usable for SPI.
#[allow(private_bounds)]
pub trait Word: sealed::Word {}

macro_rules! impl_word {
    ($T:ty) => {
        impl sealed::Word for $T {
            #[inline]
            fn to_raw(self) -> u32 {
                self as u32
            }

            #[inline]
            fn from_raw(raw: u32) -> Self {
                raw as $T
            }
        }
        impl Word for $T {}
    };
}

impl_word!(u8);
impl_word!(u16);
impl_word!(u32);

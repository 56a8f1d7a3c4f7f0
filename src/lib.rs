#![cfg_attr(not(test), no_std)]

// This must go FIRST so that all the other modules see its macros.
mod fmt;

pub mod pac;
pub mod register;

pub mod dma;
pub mod interrupt;
pub mod rcc;
pub mod spi;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

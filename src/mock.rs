//! In-memory register bus
//!
//! Backs every register with a plain word and records each access, so drivers can
//! be exercised on the host. Reads of a register can be scripted to model status
//! bits that hardware changes behind the driver's back.

extern crate std;

use core::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use crate::register::{Bus, Reg};

/// One recorded bus access.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Access {
    /// Register read and the value it returned
    Read(Reg, u32),
    Write(Reg, u32),
    Set(Reg, u32),
    Clear(Reg, u32),
}

impl Access {
    pub fn reg(&self) -> Reg {
        match *self {
            Access::Read(reg, _) | Access::Write(reg, _) | Access::Set(reg, _) | Access::Clear(reg, _) => reg,
        }
    }
}

#[derive(Default, Debug)]
pub struct MockBus {
    regs: RefCell<BTreeMap<Reg, u32>>,
    scripted: RefCell<BTreeMap<Reg, VecDeque<u32>>>,
    log: RefCell<Vec<Access>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current register content, without recording an access.
    pub fn peek(&self, reg: Reg) -> u32 {
        self.regs.borrow().get(&reg).copied().unwrap_or(0)
    }

    /// Set register content, without recording an access.
    pub fn poke(&self, reg: Reg, value: u32) {
        self.regs.borrow_mut().insert(reg, value);
    }

    /// Queue values returned by the next reads of `reg`, before falling back to its content.
    pub fn script_reads(&self, reg: Reg, values: impl IntoIterator<Item = u32>) {
        self.scripted.borrow_mut().entry(reg).or_default().extend(values);
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.log.borrow().clone()
    }

    /// Values written to `reg` with full-word writes, oldest first.
    pub fn writes_to(&self, reg: Reg) -> Vec<u32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|access| match *access {
                Access::Write(r, value) if r == reg => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    fn record(&self, access: Access) {
        self.log.borrow_mut().push(access);
    }
}

impl Bus for MockBus {
    fn read(&self, reg: Reg) -> u32 {
        let scripted = self.scripted.borrow_mut().get_mut(&reg).and_then(VecDeque::pop_front);
        let value = scripted.unwrap_or_else(|| self.peek(reg));
        self.record(Access::Read(reg, value));
        value
    }

    fn write(&self, reg: Reg, value: u32) {
        self.poke(reg, value);
        self.record(Access::Write(reg, value));
    }

    fn set_bits(&self, reg: Reg, mask: u32) {
        self.poke(reg, self.peek(reg) | mask);
        self.record(Access::Set(reg, mask));
    }

    fn clear_bits(&self, reg: Reg, mask: u32) {
        self.poke(reg, self.peek(reg) & !mask);
        self.record(Access::Clear(reg, mask));
    }
}

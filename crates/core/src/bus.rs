//! The bus owns one CPU and one memory and routes the CPU's traffic.
//!
//! A `Bus` only exists behind an `Rc`: the CPU keeps a `Weak` back-reference
//! to it, set exactly once during construction. Both halves sit in their own
//! `RefCell` so the CPU can reach memory while it is itself borrowed by
//! [`Bus::tick`].

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::cpu::Cpu;
use crate::error::{BusError, MemoryError};
use crate::logging::{log, LogCategory, LogLevel};
use crate::memory::{check_image, Memory6502, Ram};

pub struct Bus {
    cpu: RefCell<Cpu>,
    memory: RefCell<Box<dyn Memory6502>>,
}

impl Bus {
    /// A CPU wired to 64 KiB of zeroed RAM.
    pub fn new() -> Result<Rc<Self>, BusError> {
        Self::with_memory(Box::new(Ram::new()))
    }

    /// Same wiring as [`Bus::new`] over a host-supplied memory backend.
    pub fn with_memory(memory: Box<dyn Memory6502>) -> Result<Rc<Self>, BusError> {
        let bus = Rc::new(Self {
            cpu: RefCell::new(Cpu::new()),
            memory: RefCell::new(memory),
        });
        bus.cpu
            .borrow_mut()
            .connect(Some(Rc::downgrade(&bus)))
            .map_err(BusError::Construction)?;
        log(LogCategory::Bus, LogLevel::Debug, || {
            "Bus: cpu and memory wired".to_string()
        });
        Ok(bus)
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.memory.borrow().read(addr)
    }

    #[inline]
    pub fn write(&self, addr: u16, val: u8) {
        self.memory.borrow_mut().write(addr, val);
    }

    /// Preload an image at `offset`. Nothing is written when it would run
    /// past `$FFFF`.
    pub fn load(&self, offset: u16, bytes: &[u8]) -> Result<(), MemoryError> {
        check_image(offset, bytes.len())?;
        let mut memory = self.memory.borrow_mut();
        for (i, &b) in bytes.iter().enumerate() {
            memory.write(offset.wrapping_add(i as u16), b);
        }
        log(LogCategory::Bus, LogLevel::Debug, || {
            format!("Bus: loaded {} bytes at ${:04X}", bytes.len(), offset)
        });
        Ok(())
    }

    /// One clock cycle of the owned CPU.
    pub fn tick(&self) {
        self.cpu.borrow_mut().clock();
    }

    /// Run the CPU reset sequence. The reset cycles still have to be ticked
    /// off before the first instruction is fetched.
    pub fn reset(&self) {
        self.cpu.borrow_mut().reset();
    }

    /// Tick until the CPU is idle again; returns the ticks spent.
    pub fn step_instruction(&self) -> u32 {
        let mut ticks = 0;
        loop {
            self.tick();
            ticks += 1;
            if self.cpu.borrow().complete() {
                return ticks;
            }
        }
    }

    pub fn cpu(&self) -> Ref<'_, Cpu> {
        self.cpu.borrow()
    }

    pub fn cpu_mut(&self) -> RefMut<'_, Cpu> {
        self.cpu.borrow_mut()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Bus");
        match self.cpu.try_borrow() {
            Ok(cpu) => s.field("cpu", &cpu.registers()),
            Err(_) => s.field("cpu", &"<running>"),
        };
        s.field("memory", &"dyn Memory6502").finish()
    }
}

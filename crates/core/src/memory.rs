//! Memory backends for the 6502 address space.

use crate::error::MemoryError;
use crate::logging::{log, LogCategory, LogLevel};

/// Size of the full 16-bit address space.
pub const ADDRESS_SPACE: usize = 0x10000;

/// Memory interface the bus routes CPU traffic through.
///
/// Both operations are total: every `u16` address is valid. Backends with
/// holes or side effects (banked ROM, mapped I/O) implement this outside the
/// core and decide for themselves what an unmapped read returns.
pub trait Memory6502 {
    /// Read a byte from memory at the given address
    fn read(&self, addr: u16) -> u8;

    /// Write a byte to memory at the given address
    fn write(&mut self, addr: u16, val: u8);
}

/// Flat 64 KiB RAM covering the whole address space.
#[derive(Debug, Clone)]
pub struct Ram {
    data: Box<[u8]>,
}

impl Ram {
    pub fn new() -> Self {
        Self {
            data: vec![0; ADDRESS_SPACE].into_boxed_slice(),
        }
    }

    /// Copy `bytes` into memory starting at `offset`.
    ///
    /// Nothing is written if the image would run past `$FFFF`.
    pub fn load(&mut self, offset: u16, bytes: &[u8]) -> Result<(), MemoryError> {
        check_image(offset, bytes.len())?;
        let start = offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Reject a preload image that would run past the end of the address space.
pub(crate) fn check_image(offset: u16, len: usize) -> Result<(), MemoryError> {
    let end = offset as usize + len;
    if end > ADDRESS_SPACE {
        log(LogCategory::Memory, LogLevel::Warn, || {
            format!(
                "Memory: rejected {}-byte image at ${:04X} (overruns address space)",
                len, offset
            )
        });
        return Err(MemoryError::OutOfRange {
            addr: end as u32 - 1,
            size: ADDRESS_SPACE,
        });
    }
    Ok(())
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory6502 for Ram {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    #[inline]
    fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }
}

/// RAM smaller than the address space, for tests that want to observe
/// accesses outside the populated range.
///
/// Out-of-range accesses are reported instead of wrapping.
#[derive(Debug, Clone)]
pub struct SizedRam {
    data: Vec<u8>,
}

impl SizedRam {
    pub fn new(size: usize) -> Result<Self, MemoryError> {
        if size == 0 || size > ADDRESS_SPACE {
            return Err(MemoryError::InvalidSize(size));
        }
        Ok(Self {
            data: vec![0; size],
        })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn read(&self, addr: u16) -> Result<u8, MemoryError> {
        self.data
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::OutOfRange {
                addr: addr as u32,
                size: self.data.len(),
            })
    }

    pub fn write(&mut self, addr: u16, val: u8) -> Result<(), MemoryError> {
        let size = self.data.len();
        match self.data.get_mut(addr as usize) {
            Some(cell) => {
                *cell = val;
                Ok(())
            }
            None => Err(MemoryError::OutOfRange {
                addr: addr as u32,
                size,
            }),
        }
    }
}

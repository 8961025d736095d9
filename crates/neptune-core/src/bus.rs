//! Unified memory bus: ROM, RAM, VRAM, and I/O behind one address space.

use crate::error::ExecError;
use crate::memmap::{vram_pixel_offset, MemoryMap};
use crate::region::Region;

/// What the bus routes I/O-window accesses to.
///
/// Implemented by `neptune-io`'s `IoBus`. Addresses passed in are absolute
/// (already known to fall within the I/O window); unclaimed addresses
/// return 0 on read and are dropped on write, never an error (spec.md §4.4).
pub trait IoPort {
    fn read_byte(&mut self, address: u32) -> u8;
    fn write_byte(&mut self, address: u32, value: u8);

    fn read_word(&mut self, address: u32) -> u32 {
        u32::from_le_bytes([
            self.read_byte(address),
            self.read_byte(address + 1),
            self.read_byte(address + 2),
            self.read_byte(address + 3),
        ])
    }

    fn write_word(&mut self, address: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_byte(address + i as u32, byte);
        }
    }
}

/// The region a given address belongs to.
enum Target {
    Rom,
    Ram,
    Vram,
    Io,
}

/// Routes reads/writes to ROM, RAM, VRAM, or I/O by address range.
pub struct MemoryBus<IO> {
    map: MemoryMap,
    rom: Region,
    ram: Region,
    vram: Region,
    io: IO,
}

impl<IO: IoPort> MemoryBus<IO> {
    #[must_use]
    pub fn new(map: MemoryMap, io: IO) -> Self {
        Self {
            rom: Region::new(map.rom_base, map.rom_size),
            ram: Region::new(map.ram_base, map.ram_size),
            vram: Region::new(map.vram_base(), map.vram_size()),
            io,
            map,
        }
    }

    #[must_use]
    pub const fn map(&self) -> &MemoryMap {
        &self.map
    }

    #[must_use]
    pub const fn rom(&self) -> &Region {
        &self.rom
    }

    #[must_use]
    pub const fn ram(&self) -> &Region {
        &self.ram
    }

    #[must_use]
    pub const fn vram(&self) -> &Region {
        &self.vram
    }

    #[must_use]
    pub const fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    fn target(&self, address: u32) -> Result<Target, ExecError> {
        if address >= self.map.rom_base && address < self.map.rom_end() {
            Ok(Target::Rom)
        } else if address >= self.map.ram_base && address < self.map.ram_end() {
            Ok(Target::Ram)
        } else if address >= self.map.vram_base() && address < self.map.vram_end() {
            Ok(Target::Vram)
        } else if address >= self.map.io_base() && address < self.map.io_end() {
            Ok(Target::Io)
        } else {
            Err(ExecError::InvalidAddress { address })
        }
    }

    pub fn read_byte(&mut self, address: u32) -> Result<u8, ExecError> {
        match self.target(address)? {
            Target::Rom => self.rom.read_byte(address),
            Target::Ram => self.ram.read_byte(address),
            Target::Vram => self.vram.read_byte(address),
            Target::Io => Ok(self.io.read_byte(address)),
        }
    }

    pub fn write_byte(&mut self, address: u32, value: u8) -> Result<(), ExecError> {
        match self.target(address)? {
            Target::Rom => Err(ExecError::RomWrite { address }),
            Target::Ram => self.ram.write_byte(address, value),
            Target::Vram => self.vram.write_byte(address, value),
            Target::Io => {
                self.io.write_byte(address, value);
                Ok(())
            }
        }
    }

    pub fn read_word(&mut self, address: u32) -> Result<u32, ExecError> {
        match self.target(address)? {
            Target::Rom => self.rom.read_word(address),
            Target::Ram => self.ram.read_word(address),
            Target::Vram => self.vram.read_word(address),
            Target::Io => Ok(self.io.read_word(address)),
        }
    }

    pub fn write_word(&mut self, address: u32, value: u32) -> Result<(), ExecError> {
        match self.target(address)? {
            Target::Rom => Err(ExecError::RomWrite { address }),
            Target::Ram => self.ram.write_word(address, value),
            Target::Vram => self.vram.write_word(address, value),
            Target::Io => {
                self.io.write_word(address, value);
                Ok(())
            }
        }
    }

    /// Writes directly into the ROM region, bypassing the read-only policy.
    ///
    /// Used only by the assembler while loading a program; instruction
    /// semantics must never call this (spec.md §4.5, §9 "ROM writes at load time").
    pub fn rom_write_bypass_word(&mut self, address: u32, value: u32) -> Result<(), ExecError> {
        self.rom.write_word(address, value)
    }

    /// Byte-granular counterpart to `rom_write_bypass_word`, used for string
    /// and byte data declarations that land in ROM-backed images.
    pub fn rom_write_bypass_byte(&mut self, address: u32, value: u8) -> Result<(), ExecError> {
        self.rom.write_byte(address, value)
    }

    /// Returns true if `address` falls inside ROM, RAM, VRAM, or the I/O
    /// window. Used by `SYSCALL` to validate a handler target (spec.md §4.6).
    #[must_use]
    pub fn is_mapped(&self, address: u32) -> bool {
        self.target(address).is_ok()
    }

    #[must_use]
    pub const fn is_rom(&self, address: u32) -> bool {
        address >= self.map.rom_base && address < self.map.rom_end()
    }

    /// Reads pixel `(x, y)` as packed RGBA (R in the high byte). `None` if
    /// the coordinates fall outside the framebuffer (spec.md §3).
    pub fn get_pixel(&mut self, x: u32, y: u32) -> Option<u32> {
        let offset = vram_pixel_offset(x, y)?;
        self.read_word(self.map.vram_base() + offset).ok()
    }

    /// Writes pixel `(x, y)` from packed RGBA. No-op if the coordinates fall
    /// outside the framebuffer.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: u32) {
        if let Some(offset) = vram_pixel_offset(x, y) {
            let _ = self.write_word(self.map.vram_base() + offset, rgba);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullIo;
    impl IoPort for NullIo {
        fn read_byte(&mut self, _address: u32) -> u8 {
            0
        }
        fn write_byte(&mut self, _address: u32, _value: u8) {}
    }

    fn bus() -> MemoryBus<NullIo> {
        MemoryBus::new(MemoryMap::canonical(), NullIo)
    }

    #[test]
    fn rom_write_through_bus_fails() {
        let mut b = bus();
        assert_eq!(
            b.write_word(0x10, 1),
            Err(ExecError::RomWrite { address: 0x10 })
        );
    }

    #[test]
    fn rom_write_bypass_succeeds() {
        let mut b = bus();
        b.rom_write_bypass_word(0x10, 0xCAFEBABE).unwrap();
        assert_eq!(b.read_word(0x10).unwrap(), 0xCAFEBABE);
    }

    #[test]
    fn ram_round_trip() {
        let mut b = bus();
        let addr = b.map().ram_base;
        b.write_word(addr, 42).unwrap();
        assert_eq!(b.read_word(addr).unwrap(), 42);
    }

    #[test]
    fn vram_round_trip_at_last_pixel() {
        let mut b = bus();
        let addr = b.map().vram_end() - 4;
        b.write_word(addr, 0x11223344).unwrap();
        assert_eq!(b.read_word(addr).unwrap(), 0x11223344);
    }

    #[test]
    fn address_outside_everything_is_invalid() {
        let mut b = bus();
        let addr = b.map().io_end();
        assert_eq!(
            b.read_byte(addr),
            Err(ExecError::InvalidAddress { address: addr })
        );
    }

    #[test]
    fn pixel_round_trips_through_get_set() {
        let mut b = bus();
        b.set_pixel(3, 1, 0xAABBCCDD);
        assert_eq!(b.get_pixel(3, 1), Some(0xAABBCCDD));
    }

    #[test]
    fn pixel_out_of_bounds_is_none_and_write_is_dropped() {
        let mut b = bus();
        assert_eq!(b.get_pixel(128, 0), None);
        b.set_pixel(128, 0, 0xFFFF_FFFF); // must not panic
    }

    #[test]
    fn io_reads_and_writes_go_through_the_port() {
        let mut b = bus();
        let addr = b.map().io_base();
        b.write_word(addr, 0x1234).unwrap(); // dropped by NullIo
        assert_eq!(b.read_word(addr).unwrap(), 0);
    }
}

use crate::constants::WORD_BYTES;
use armgen_support::Endian;
use byteorder::ByteOrder;

/// Read-only view over the VM's linear byte memory.
pub trait Storage {
    /// Total addressable length in bytes.
    fn length(&self) -> u32;

    /// Whether `[address..address+length)` lies entirely within the
    /// storage.
    fn check_range(&self, address: u32, length: u32) -> bool;

    /// Borrows `[address..address+length)`.
    ///
    /// # Errors
    /// Returns `Err(())` if the range is not addressable.
    ///
    /// # Examples
    /// ```
    /// use armgen::memory::{Storage, Memory};
    ///
    /// let memory = Memory::from(&[1, 2, 3, 4][..]);
    /// assert_eq!(memory.borrow_slice(1, 2), Ok(&[2, 3][..]));
    /// assert_eq!(memory.borrow_slice(2, 4), Err(()));
    /// ```
    fn borrow_slice(&self, address: u32, length: u32) -> Result<&[u8], ()>;

    /// Reads `size` (1-4) little-endian bytes starting at `address`.
    ///
    /// # Panics
    /// Panics if `size` is outside `1..=4`.
    fn read(&self, address: u32, size: u32) -> Result<u32, ()> {
        assert!((1..=4).contains(&size));
        Ok(Endian::read_uint(self.borrow_slice(address, size)?, size as usize) as u32)
    }

    /// Reads a single byte at `address`.
    fn read_byte(&self, address: u32) -> Result<u8, ()> {
        Ok(self.borrow_slice(address, 1)?[0])
    }

    /// Reads a little-endian `u32` at `address`.
    ///
    /// # Examples
    /// ```
    /// use armgen::memory::{Storage, Memory};
    ///
    /// let memory = Memory::from(&[5, 23, 0, 206][..]);
    /// assert_eq!(memory.read_word(0), Ok(3456112389));
    /// assert_eq!(memory.read_word(1), Err(()));
    /// ```
    fn read_word(&self, address: u32) -> Result<u32, ()> {
        Ok(Endian::read_u32(self.borrow_slice(address, WORD_BYTES)?))
    }

    /// Reads a nul-terminated byte string starting at `address`, used by
    /// `OS_Write0`.
    fn read_cstr(&self, address: u32) -> Result<Vec<u8>, ()> {
        let mut out = Vec::new();
        let mut addr = address;
        loop {
            let b = self.read_byte(addr)?;
            if b == 0 {
                return Ok(out);
            }
            out.push(b);
            addr += 1;
        }
    }
}

/// Write access. Kept as a separate trait from `Storage` so a read-only
/// view (e.g. of a ROM image) can implement `Storage` without also
/// implementing mutation.
pub trait StorageMut: Storage {
    fn borrow_slice_mut(&mut self, address: u32, length: u32) -> Result<&mut [u8], ()>;

    fn write(&mut self, address: u32, size: u32, value: u32) -> Result<(), ()> {
        assert!((1..=4).contains(&size));
        Endian::write_uint(
            self.borrow_slice_mut(address, size)?,
            u64::from(value),
            size as usize,
        );
        Ok(())
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), ()> {
        self.borrow_slice_mut(address, 1)?[0] = value;
        Ok(())
    }

    /// Writes a little-endian `u32` at `address`.
    ///
    /// # Examples
    /// ```
    /// use armgen::memory::{Storage, StorageMut, Memory};
    ///
    /// let mut memory = Memory::new(4);
    /// assert_eq!(memory.write_word(0, 2568242499), Ok(()));
    /// assert_eq!(memory.borrow_slice(0, 4), Ok(&[67, 69, 20, 153][..]));
    /// assert_eq!(memory.write_word(1, 2220885), Err(()));
    /// ```
    fn write_word(&mut self, address: u32, value: u32) -> Result<(), ()> {
        Endian::write_u32(self.borrow_slice_mut(address, WORD_BYTES)?, value);
        Ok(())
    }

    fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> Result<(), ()> {
        self.borrow_slice_mut(address, bytes.len() as u32)?
            .copy_from_slice(bytes);
        Ok(())
    }
}

/// A flat, contiguous block of memory with a configurable start address.
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Constructs a zero-filled `Memory` of `length` bytes.
    ///
    /// # Examples
    /// ```
    /// use armgen::memory::{Storage, Memory};
    ///
    /// let memory = Memory::new(16);
    /// assert_eq!(memory.length(), 16);
    /// ```
    pub fn new(length: u32) -> Memory {
        Memory {
            data: vec![0; length as usize],
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Storage for Memory {
    fn length(&self) -> u32 {
        self.data.len() as u32
    }

    fn check_range(&self, address: u32, length: u32) -> bool {
        let len = self.data.len() as u32;
        address <= len && address.saturating_add(length) <= len
    }

    fn borrow_slice(&self, address: u32, length: u32) -> Result<&[u8], ()> {
        if self.check_range(address, length) {
            Ok(&self.data[address as usize..(address + length) as usize])
        } else {
            Err(())
        }
    }
}

impl StorageMut for Memory {
    fn borrow_slice_mut(&mut self, address: u32, length: u32) -> Result<&mut [u8], ()> {
        if self.check_range(address, length) {
            Ok(&mut self.data[address as usize..(address + length) as usize])
        } else {
            Err(())
        }
    }
}

impl<'a> From<&'a [u8]> for Memory {
    fn from(s: &'a [u8]) -> Memory {
        Memory { data: Vec::from(s) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_cstr_stops_at_the_terminator() {
        let memory = Memory::from(&b"HELLO\0world"[..]);
        assert_eq!(memory.read_cstr(0).unwrap(), b"HELLO");
    }

    #[test]
    fn write_and_read_round_trip() {
        let mut memory = Memory::new(8);
        memory.write_word(4, 0xDEAD_BEEF).unwrap();
        assert_eq!(memory.read_word(4), Ok(0xDEAD_BEEF));
    }

    #[test]
    fn out_of_range_access_is_an_error() {
        let memory = Memory::new(4);
        assert_eq!(memory.read_word(4), Err(()));
    }
}

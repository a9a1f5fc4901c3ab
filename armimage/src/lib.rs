//! Raw ARM image container: a little-endian framed header naming the entry
//! offset and the instruction/data word counts, followed by the raw `u32`
//! words themselves. The encoder already emits a flat `u32` stream per
//! program, so this crate's job is purely the disk framing, not
//! instruction decoding.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// One compiled program as laid out on disk: the executable instruction
/// words, the literal-pool/data words that follow them, and the byte
/// offset (from the start of the instruction region) execution begins at.
#[derive(Clone, Debug, PartialEq)]
pub struct ArmImage {
    entry_offset: u32,
    instructions: Vec<u32>,
    data: Vec<u32>,
}

impl ArmImage {
    pub fn new(entry_offset: u32, instructions: Vec<u32>, data: Vec<u32>) -> ArmImage {
        ArmImage {
            entry_offset,
            instructions,
            data,
        }
    }

    pub fn entry_offset(&self) -> u32 {
        self.entry_offset
    }

    pub fn instructions(&self) -> &[u32] {
        &self.instructions
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// The full load image: instructions then data, in the order the VM
    /// expects to find them starting at its configured `start_address`.
    pub fn words(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(self.instructions.len() + self.data.len());
        words.extend_from_slice(&self.instructions);
        words.extend_from_slice(&self.data);
        words
    }
}

pub fn read<R: Read>(reader: &mut R) -> std::io::Result<ArmImage> {
    let entry_offset = reader.read_u32::<LittleEndian>()?;
    let data_length = reader.read_u32::<LittleEndian>()?;
    let instruction_length = reader.read_u32::<LittleEndian>()?;

    let mut instructions = vec![0u32; (instruction_length / 4) as usize];
    reader.read_u32_into::<LittleEndian>(&mut instructions)?;

    let mut data = vec![0u32; (data_length / 4) as usize];
    reader.read_u32_into::<LittleEndian>(&mut data)?;

    Ok(ArmImage::new(entry_offset, instructions, data))
}

pub fn write<W: Write>(writer: &mut W, image: &ArmImage) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(image.entry_offset)?;
    writer.write_u32::<LittleEndian>((image.data.len() * 4) as u32)?;
    writer.write_u32::<LittleEndian>((image.instructions.len() * 4) as u32)?;
    for word in &image.instructions {
        writer.write_u32::<LittleEndian>(*word)?;
    }
    for word in &image.data {
        writer.write_u32::<LittleEndian>(*word)?;
    }
    Ok(())
}

pub trait ReadArmImageExt: Read + Sized {
    fn read_arm_image(&mut self) -> std::io::Result<ArmImage> {
        read(self)
    }
}

impl<R: Read + Sized> ReadArmImageExt for R {}

pub trait WriteArmImageExt: Write + Sized {
    fn write_arm_image(&mut self, image: &ArmImage) -> std::io::Result<()> {
        write(self, image)
    }
}

impl<W: Write + Sized> WriteArmImageExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> std::io::Result<ArmImage> {
    BufReader::new(File::open(path)?).read_arm_image()
}

pub fn write_file<P: AsRef<Path>>(path: P, image: &ArmImage) -> std::io::Result<()> {
    BufWriter::new(File::create(path)?).write_arm_image(image)
}

#[cfg(test)]
mod test;

use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, Result};

use crate::error;
use crate::memory::{Memory, MEMORY_MAX};

/// Load a program image into memory at the origin named by its first word.
///
/// Images may be loaded on top of each other; later loads overwrite earlier
/// ones at overlapping addresses.
pub fn load(path: impl AsRef<Path>, memory: &mut Memory) -> Result<()> {
    let bytes = fs::read(path).into_diagnostic()?;
    load_bytes(&bytes, memory)
}

/// Image words are big-endian: the origin first, then the program words,
/// stored contiguously from the origin. Words past the top of memory are
/// dropped rather than wrapped. A trailing odd byte is ignored, matching a
/// short read.
pub fn load_bytes(bytes: &[u8], memory: &mut Memory) -> Result<()> {
    let Some([hi, lo]) = bytes.first_chunk() else {
        return Err(error::image_no_origin());
    };
    let origin = u16::from_be_bytes([*hi, *lo]);

    let max_read = MEMORY_MAX - origin as usize;
    for (i, chunk) in bytes[2..].chunks_exact(2).take(max_read).enumerate() {
        let word = u16::from_be_bytes([chunk[0], chunk[1]]);
        memory.write(origin + i as u16, word);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_words_at_the_origin() {
        let mut memory = Memory::new();
        load_bytes(&[0x30, 0x00, 0x12, 0x34, 0xAB, 0xCD], &mut memory).unwrap();
        assert_eq!(memory.read(0x3000), 0x1234);
        assert_eq!(memory.read(0x3001), 0xABCD);
        assert_eq!(memory.read(0x3002), 0);
    }

    #[test]
    fn ignores_a_trailing_odd_byte() {
        let mut memory = Memory::new();
        load_bytes(&[0x30, 0x00, 0x12, 0x34, 0xAB], &mut memory).unwrap();
        assert_eq!(memory.read(0x3000), 0x1234);
        assert_eq!(memory.read(0x3001), 0);
    }

    #[test]
    fn clamps_at_the_top_of_memory() {
        let mut memory = Memory::new();
        let bytes = [0xFF, 0xFE, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03];
        load_bytes(&bytes, &mut memory).unwrap();
        assert_eq!(memory.read(0xFFFE), 1);
        assert_eq!(memory.read(0xFFFF), 2);
        // The third word has nowhere to go and must not wrap around
        assert_eq!(memory.read(0x0000), 0);
    }

    #[test]
    fn rejects_an_image_with_no_origin() {
        let mut memory = Memory::new();
        assert!(load_bytes(&[], &mut memory).is_err());
        assert!(load_bytes(&[0x30], &mut memory).is_err());
    }

    #[test]
    fn empty_program_after_origin_is_fine() {
        let mut memory = Memory::new();
        load_bytes(&[0x30, 0x00], &mut memory).unwrap();
        assert_eq!(memory.read(0x3000), 0);
    }

    #[test]
    fn later_images_overwrite_earlier_ones() {
        let mut memory = Memory::new();
        load_bytes(&[0x30, 0x00, 0x11, 0x11, 0x22, 0x22], &mut memory).unwrap();
        load_bytes(&[0x30, 0x01, 0x33, 0x33], &mut memory).unwrap();
        assert_eq!(memory.read(0x3000), 0x1111);
        assert_eq!(memory.read(0x3001), 0x3333);
    }
}

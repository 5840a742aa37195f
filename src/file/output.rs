//! Memory-mapped output file used as a sink for the code segment writer.
//!
//! The file is created at its final size up front. [`Output`] keeps a write cursor and
//! implements [`std::io::Write`] and [`std::io::Seek`], so it can be handed to
//! [`crate::code::CodeImage::write_all`] like any other seekable stream. A file that is dropped
//! without [`Output::finalize`] is removed again.

use std::{
    io::{self, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use memmap2::{MmapMut, MmapOptions};

use crate::Result;

/// A fixed-size, memory-mapped output file with a seekable write cursor.
pub struct Output {
    mmap: MmapMut,
    target_path: PathBuf,
    position: u64,
    finalized: bool,
}

impl Output {
    /// Creates the file at `target_path` with `size` bytes and maps it into memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can't be created, resized or mapped.
    pub fn create<P: AsRef<Path>>(target_path: P, size: u64) -> Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target_path)?;
        file.set_len(size)?;

        // SAFETY: the file was just created by us and is not shared with other mappings
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };

        Ok(Self {
            mmap,
            target_path,
            position: 0,
            finalized: false,
        })
    }

    /// Size of the mapped file in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Current position of the write cursor
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read access to the whole mapped file
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Path of the file on disk
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Flushes the mapping and keeps the file on disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the flush fails.
    pub fn finalize(mut self) -> Result<()> {
        self.mmap.flush()?;
        self.finalized = true;
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let start = usize::try_from(self.position)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "cursor out of range"))?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.mmap.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!(
                        "write of {} bytes at 0x{:x} exceeds output size 0x{:x}",
                        buf.len(),
                        start,
                        self.mmap.len()
                    ),
                )
            })?;

        self.mmap[start..end].copy_from_slice(buf);
        self.position = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.mmap.flush()
    }
}

impl Seek for Output {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(target) => {
                self.position = target;
                Ok(target)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = self.mmap.flush();
            let _ = std::fs::remove_file(&self.target_path);
        }
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output")
            .field("target_path", &self.target_path)
            .field("size", &self.size())
            .field("position", &self.position)
            .field("finalized", &self.finalized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn cursor_writes() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("cursor.bin");

        let mut output = Output::create(&target_path, 16).unwrap();
        output.seek(SeekFrom::Start(4)).unwrap();
        output.write_all(&[0xAA, 0xBB]).unwrap();
        assert_eq!(output.position(), 6);

        output.seek(SeekFrom::Current(-6)).unwrap();
        output.write_all(&[0x01]).unwrap();
        assert_eq!(&output.as_slice()[..6], &[0x01, 0, 0, 0, 0xAA, 0xBB]);
    }

    #[test]
    fn write_past_end() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("bounds.bin");

        let mut output = Output::create(&target_path, 10).unwrap();
        output.seek(SeekFrom::End(-2)).unwrap();
        assert!(output.write_all(b"too long").is_err());
        assert!(output.seek(SeekFrom::Current(-100)).is_err());
    }

    #[test]
    fn finalize_keeps_file() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("final.bin");

        {
            let mut output = Output::create(&target_path, 12).unwrap();
            output.write_all(b"Test content").unwrap();
            output.finalize().unwrap();
        }

        let mut contents = Vec::new();
        std::fs::File::open(&target_path)
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"Test content");
    }

    #[test]
    fn drop_removes_unfinished_file() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("dropped.bin");

        drop(Output::create(&target_path, 8).unwrap());
        assert!(!target_path.exists());
    }
}

//! Byte-addressable storage backing an archive.

use std::{
    fs::File,
    io::{self, repeat, Cursor, Read, Seek, SeekFrom, Write},
};

/// A seekable, readable and writable byte container.
///
/// The archive engine only ever talks to its backing file through this trait,
/// so an archive can live in a real file or entirely in memory.
pub trait ByteStore: Read + Write + Seek {
    /// Cut or extend the store to exactly `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    fn total_len(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)
    }

    /// Overwrite `[start, end)` with zero bytes.
    fn fill_zero(&mut self, start: u64, end: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(start))?;
        let mut zeros = repeat(0).take(end.saturating_sub(start));
        io::copy(&mut zeros, self)?;
        Ok(())
    }
}

impl ByteStore for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl ByteStore for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length out of range"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

use std::{
    cmp,
    io::{self, ErrorKind, Read, Seek, SeekFrom},
};

use crate::store::ByteStore;

/// A read-only view over one member's `[start, end)` range.
///
/// Reads never cross the member's end, whatever follows it in the body.
pub struct MemberReader<'a, S: ?Sized> {
    pub(crate) store: &'a mut S,
    pub(crate) off: u64,
    pub(crate) len: u64,
    pub(crate) pos: u64,
}

impl<'a, S: ByteStore + ?Sized> MemberReader<'a, S> {
    pub(crate) fn new(store: &'a mut S, off: u64, len: u64) -> io::Result<Self> {
        store.seek(SeekFrom::Start(off))?;
        Ok(Self {
            store,
            off,
            len,
            pos: 0,
        })
    }
}

impl<'a, S: ?Sized> MemberReader<'a, S> {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Offset of the member in the archive.
    pub fn offset(&self) -> u64 {
        self.off
    }
}

impl<'a, S: ByteStore + ?Sized> Seek for MemberReader<'a, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(i) => i as i128,
            SeekFrom::End(i) => self.len as i128 + i as i128,
            SeekFrom::Current(i) => self.pos as i128 + i as i128,
        };
        if target < 0 || target > self.len as i128 {
            return Err(io::Error::new(ErrorKind::InvalidInput, "Seek out of bounds"));
        }
        let target = target as u64;
        self.store.seek(SeekFrom::Start(self.off + target))?;
        self.pos = target;
        Ok(self.pos)
    }
}

impl<'a, S: ByteStore + ?Sized> Read for MemberReader<'a, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let rem = self.len - self.pos;
        if rem == 0 {
            return Ok(0);
        }

        let max = cmp::min(buf.len() as u64, rem) as usize;
        let n = self.store.read(&mut buf[..max])?;
        self.pos += n as u64;
        Ok(n)
    }
}

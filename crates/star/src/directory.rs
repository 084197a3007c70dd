//! The fixed-capacity member table stored at the front of every archive.

use std::io::{self, Cursor, Read, Write};

use bitcode::{Decode, Encode};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ArchiveError, Result},
    store::ByteStore,
    CAPACITY, HEADER_SIZE, NAME_LEN, RECORD_SIZE,
};

/// One directory slot.
///
/// On disk a slot is unused when its `size` is zero. In memory that is kept
/// as the explicit `occupied` flag so callers never have to test the size.
#[derive(Debug, PartialEq, Eq, Decode, Encode, Serialize, Deserialize, Clone, Default)]
pub struct MemberRecord {
    pub name: String,
    /// Permission and type bits of the source file, stored verbatim.
    pub mode: u32,
    pub size: u64,
    pub start: u64,
    pub end: u64,
    /// Set on slots vacated by a delete. Their `start`/`end` are kept.
    pub deleted: bool,
    occupied: bool,
}

impl MemberRecord {
    /// A live record for `size` bytes placed at `start`.
    pub fn live(name: impl Into<String>, mode: u32, size: u64, start: u64) -> Result<Self> {
        let name = name.into();
        if name.len() > NAME_LEN {
            return Err(ArchiveError::NameTooLong {
                name,
                max: NAME_LEN,
            });
        }
        if size == 0 {
            return Err(ArchiveError::EmptyMember(name));
        }
        Ok(Self {
            name,
            mode,
            size,
            start,
            end: start + size,
            deleted: false,
            occupied: true,
        })
    }

    pub fn is_live(&self) -> bool {
        self.occupied
    }

    pub fn is_tombstone(&self) -> bool {
        !self.occupied && self.deleted
    }

    /// Move the record so that it begins at `start`, keeping its size.
    pub fn relocate(&mut self, start: u64) {
        self.start = start;
        self.end = start + self.size;
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut raw_name = [0u8; NAME_LEN];
        r.read_exact(&mut raw_name)?;
        let mode = r.read_u32::<LittleEndian>()?;
        let size = r.read_u64::<LittleEndian>()?;
        let start = r.read_u64::<LittleEndian>()?;
        let end = r.read_u64::<LittleEndian>()?;
        let deleted = r.read_u32::<LittleEndian>()? != 0;
        r.read_u32::<LittleEndian>()?;

        let name_len = raw_name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        Ok(Self {
            name: String::from_utf8_lossy(&raw_name[..name_len]).into_owned(),
            mode,
            size,
            start,
            end,
            deleted,
            occupied: size != 0,
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut raw_name = [0u8; NAME_LEN];
        let name = self.name.as_bytes();
        let name_len = name.len().min(NAME_LEN);
        raw_name[..name_len].copy_from_slice(&name[..name_len]);

        w.write_all(&raw_name)?;
        w.write_u32::<LittleEndian>(self.mode)?;
        w.write_u64::<LittleEndian>(if self.occupied { self.size } else { 0 })?;
        w.write_u64::<LittleEndian>(self.start)?;
        w.write_u64::<LittleEndian>(self.end)?;
        w.write_u32::<LittleEndian>(self.deleted as u32)?;
        w.write_u32::<LittleEndian>(0)
    }
}

#[derive(Debug, PartialEq, Eq, Decode, Encode, Serialize, Deserialize, Clone)]
pub struct Directory {
    slots: Vec<MemberRecord>,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            slots: vec![MemberRecord::default(); CAPACITY],
        }
    }
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the directory block from the front of `store`.
    pub fn load<S: ByteStore + ?Sized>(store: &mut S) -> Result<Self> {
        store.rewind()?;
        let mut block = Vec::with_capacity(HEADER_SIZE as usize);
        Read::take(&mut *store, HEADER_SIZE).read_to_end(&mut block)?;
        if (block.len() as u64) < HEADER_SIZE {
            return Err(ArchiveError::TruncatedHeader {
                expected: HEADER_SIZE,
                found: block.len() as u64,
            });
        }
        Self::decode(&block)
    }

    /// Overwrite the directory block at the front of `store`.
    pub fn save<S: ByteStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.write_all_at(0, &self.encode()?)?;
        store.flush()?;
        debug!(live = self.live_count(), "directory saved");
        Ok(())
    }

    pub fn decode(block: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(block);
        let slots = (0..CAPACITY)
            .map(|_| MemberRecord::read_from(&mut r))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Self { slots })
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut block = Vec::with_capacity(HEADER_SIZE as usize);
        for slot in &self.slots {
            slot.write_to(&mut block)?;
        }
        debug_assert_eq!(block.len(), CAPACITY * RECORD_SIZE);
        Ok(block)
    }

    pub fn slots(&self) -> &[MemberRecord] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&MemberRecord> {
        self.slots.get(index)
    }

    /// Live members in table order, with their slot index.
    pub fn live_members(&self) -> impl Iterator<Item = (usize, &MemberRecord)> {
        self.slots.iter().enumerate().filter(|(_, m)| m.is_live())
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|m| m.is_live()).count()
    }

    pub fn is_live(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(MemberRecord::is_live)
    }

    pub fn insert_first_empty(&mut self, record: MemberRecord) -> Result<usize> {
        let index = self
            .slots
            .iter()
            .position(|m| !m.is_live())
            .ok_or(ArchiveError::DirectoryFull { capacity: CAPACITY })?;
        self.slots[index] = record;
        Ok(index)
    }

    /// Place `record` in the slot right after the live member with the
    /// highest table index (slot 0 when nothing is live).
    pub fn insert_as_logical_last(&mut self, record: MemberRecord) -> Result<usize> {
        let index = match self.last_live_member() {
            Some((last, _)) => last + 1,
            None => 0,
        };
        if index >= CAPACITY {
            return Err(ArchiveError::DirectoryFull { capacity: CAPACITY });
        }
        self.slots[index] = record;
        Ok(index)
    }

    /// Overwrite the slot at `index`. Used when a freed range is reused in
    /// place by its owning slot.
    pub fn occupy(&mut self, index: usize, record: MemberRecord) -> Result<()> {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(ArchiveError::SlotOutOfRange {
                index,
                capacity: CAPACITY,
            }),
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&MemberRecord> {
        self.find_index_by_name(name).map(|i| &self.slots[i])
    }

    pub fn find_index_by_name(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|m| m.is_live() && m.name == name)
    }

    /// Vacate the live slot named `name`, returning the record as it was.
    pub fn tombstone(&mut self, name: &str) -> Result<MemberRecord> {
        let index = self
            .find_index_by_name(name)
            .ok_or_else(|| ArchiveError::NotFound(name.to_string()))?;
        let slot = &mut self.slots[index];
        let vacated = slot.clone();
        slot.deleted = true;
        slot.size = 0;
        slot.occupied = false;
        Ok(vacated)
    }

    /// The live member with the highest table index. This anchors appends
    /// that find no reusable range.
    pub fn last_live_member(&self) -> Option<(usize, &MemberRecord)> {
        self.live_members().last()
    }

    pub fn reset(&mut self) {
        self.slots.fill(MemberRecord::default());
    }
}

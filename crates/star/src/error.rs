use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Truncated header: expected {expected} bytes, found {found}")]
    TruncatedHeader { expected: u64, found: u64 },

    #[error("Member not found: {0}")]
    NotFound(String),

    #[error("Directory full: all {capacity} slots are in use")]
    DirectoryFull { capacity: usize },

    #[error("Too many members: {count} given, capacity is {capacity}")]
    TooManyMembers { count: usize, capacity: usize },

    #[error("Slot {index} is out of range, capacity is {capacity}")]
    SlotOutOfRange { index: usize, capacity: usize },

    #[error("Invalid range: start {start} is past end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Duplicate member name: {0}")]
    DuplicateName(String),

    #[error("Member name too long: {name} (max {max} bytes)")]
    NameTooLong { name: String, max: usize },

    #[error("Empty member: {0} (zero-length members cannot be stored)")]
    EmptyMember(String),

    #[error("Unsafe member name: {0} (absolute or escapes the extraction root)")]
    UnsafeName(String),

    #[error("Short copy of {name}: expected {expected} bytes, copied {copied}")]
    ShortCopy {
        name: String,
        expected: u64,
        copied: u64,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

pub mod archive;
pub mod directory;
pub mod entry;
pub mod error;
pub mod free_space;
pub mod store;
pub mod workspace;

pub use archive::{Archive, ArchiveStats};
pub use directory::{Directory, MemberRecord};
pub use entry::MemberReader;
pub use error::{ArchiveError, Result};
pub use free_space::{FreeRange, FreeRangeList};
pub use store::ByteStore;
pub use workspace::{LocalWorkspace, SourceMeta, Workspace};

/// Width of the NUL-padded name field in a directory slot.
pub const NAME_LEN: usize = 100;
/// Number of slots in the directory.
pub const CAPACITY: usize = 100;
/// Serialized width of one slot, including the trailing alignment padding.
pub const RECORD_SIZE: usize = 136;
/// The body region starts here.
pub const HEADER_SIZE: u64 = (CAPACITY * RECORD_SIZE) as u64;

use crate::{
    directory::{Directory, MemberRecord},
    entry::MemberReader,
    error::{ArchiveError, Result},
    free_space::FreeRangeList,
    store::ByteStore,
    workspace::{check_extract_name, Workspace},
    CAPACITY, HEADER_SIZE,
};
use serde::Serialize;
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, info};

/// An archive backed by a [`ByteStore`].
///
/// Nothing is cached between calls: every operation loads the directory from
/// the store, works on it in memory and writes it back before returning.
pub struct Archive<S> {
    store: S,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    pub members: usize,
    pub capacity: usize,
    pub live_bytes: u64,
    pub archive_len: u64,
    pub free_ranges: usize,
    /// Bytes `pack` would give back.
    pub reclaimable_bytes: u64,
}

impl<S> Archive<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get_ref(&self) -> &S {
        &self.store
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ByteStore> Archive<S> {
    pub fn directory(&mut self) -> Result<Directory> {
        Directory::load(&mut self.store)
    }

    /// Replace whatever the store holds with a fresh archive of `names`,
    /// laid out back to back from `HEADER_SIZE` in the order given.
    ///
    /// With more than `CAPACITY` names the first `CAPACITY` are still
    /// written before `TooManyMembers` is returned.
    pub fn create<W: Workspace>(
        &mut self,
        workspace: &W,
        names: &[impl AsRef<str>],
    ) -> Result<Directory> {
        let mut directory = Directory::new();
        let mut cursor = HEADER_SIZE;
        for name in names.iter().take(CAPACITY) {
            let name = name.as_ref();
            if directory.find_by_name(name).is_some() {
                return Err(ArchiveError::DuplicateName(name.to_string()));
            }
            let meta = workspace.stat(name)?;
            let record = MemberRecord::live(name, meta.mode, meta.size, cursor)?;
            cursor = record.end;
            directory.insert_first_empty(record)?;
        }

        self.store.truncate(0)?;
        directory.save(&mut self.store)?;
        for (_, member) in directory.live_members() {
            self.copy_in(workspace, member)?;
        }
        self.store.flush()?;

        info!(
            members = directory.live_count(),
            archive_len = cursor,
            "archive created"
        );
        if names.len() > CAPACITY {
            return Err(ArchiveError::TooManyMembers {
                count: names.len(),
                capacity: CAPACITY,
            });
        }
        Ok(directory)
    }

    /// Live members in table order.
    pub fn list(&mut self) -> Result<Vec<MemberRecord>> {
        let directory = self.directory()?;
        Ok(directory.live_members().map(|(_, m)| m.clone()).collect())
    }

    /// The free ranges of the archive as it stands.
    pub fn free_space(&mut self) -> Result<FreeRangeList> {
        let directory = self.directory()?;
        self.free_space_of(&directory)
    }

    /// Zero the member's bytes and tombstone its slot. The vacated range
    /// shows up in the returned free list.
    pub fn delete(&mut self, name: &str) -> Result<FreeRangeList> {
        let mut directory = self.directory()?;
        let member = directory
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(name.to_string()))?;

        self.store.fill_zero(member.start, member.end)?;
        directory.tombstone(name)?;
        directory.save(&mut self.store)?;

        let free = self.free_space_of(&directory)?;
        info!(
            name,
            start = member.start,
            end = member.end,
            "member deleted"
        );
        Ok(free)
    }

    /// Add the workspace file `name` to the archive.
    ///
    /// The first free range large enough is reused in place. Failing that,
    /// the member goes right after the live member with the highest slot
    /// index, growing the archive if needed.
    pub fn append<W: Workspace>(&mut self, workspace: &W, name: &str) -> Result<MemberRecord> {
        let mut directory = self.directory()?;
        if directory.live_count() >= CAPACITY {
            return Err(ArchiveError::DirectoryFull { capacity: CAPACITY });
        }
        if directory.find_by_name(name).is_some() {
            return Err(ArchiveError::DuplicateName(name.to_string()));
        }

        let mut free = self.free_space_of(&directory)?;
        let meta = workspace.stat(name)?;
        let mut record = MemberRecord::live(name, meta.mode, meta.size, HEADER_SIZE)?;

        // A gap tagged with a live slot has no slot of its own to reuse.
        let fit = free.find_fit_by(record.size, |r| !directory.is_live(r.index));
        let index = match fit {
            Some(range) => {
                record.relocate(range.start);
                directory.occupy(range.index, record.clone())?;
                range.index
            }
            None => {
                let start = directory
                    .last_live_member()
                    .map_or(HEADER_SIZE, |(_, last)| last.end);
                record.relocate(start);
                directory.insert_as_logical_last(record.clone())?
            }
        };

        directory.save(&mut self.store)?;
        self.copy_in(workspace, &record)?;
        self.store.flush()?;
        if fit.is_some() {
            free.remove(index);
        }

        debug!(ranges = ?free, "free space after append");
        info!(
            name,
            index,
            start = record.start,
            end = record.end,
            reused = fit.is_some(),
            "member appended"
        );
        Ok(record)
    }

    /// Write members out into the workspace, each under its own name.
    ///
    /// With no names every live member is extracted. The first missing
    /// name stops the run; members already written stay written.
    pub fn extract<W: Workspace>(
        &mut self,
        workspace: &W,
        names: &[impl AsRef<str>],
    ) -> Result<Vec<MemberRecord>> {
        let directory = self.directory()?;
        let mut extracted = Vec::new();

        if names.is_empty() {
            for (_, member) in directory.live_members() {
                self.extract_member(workspace, member)?;
                extracted.push(member.clone());
            }
        } else {
            for name in names {
                let name = name.as_ref();
                let member = directory
                    .find_by_name(name)
                    .ok_or_else(|| ArchiveError::NotFound(name.to_string()))?;
                self.extract_member(workspace, member)?;
                extracted.push(member.clone());
            }
        }
        Ok(extracted)
    }

    /// Replace a member with the current content of its workspace file.
    pub fn update<W: Workspace>(&mut self, workspace: &W, name: &str) -> Result<MemberRecord> {
        if self.directory()?.find_by_name(name).is_none() {
            return Err(ArchiveError::NotFound(name.to_string()));
        }
        // Fail before deleting if the replacement can't be stored.
        let meta = workspace.stat(name)?;
        if meta.size == 0 {
            return Err(ArchiveError::EmptyMember(name.to_string()));
        }

        self.delete(name)?;
        self.append(workspace, name)
    }

    /// Compact the body so live members sit back to back from `HEADER_SIZE`
    /// in table order, and shrink the store to fit. Returns the number of
    /// bytes given back.
    pub fn pack(&mut self) -> Result<u64> {
        let mut directory = self.directory()?;
        let old_len = self.store.total_len()?;
        let mut free = FreeRangeList::from_directory(&directory, old_len)?;
        debug!(
            ranges = free.len(),
            reclaimable = free.total_bytes(),
            "packing"
        );

        let members: Vec<MemberRecord> =
            directory.live_members().map(|(_, m)| m.clone()).collect();
        if let Some(m) = members.iter().find(|m| m.end > old_len) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} ends at {} past the archive end {}", m.name, m.end, old_len),
            )
            .into());
        }

        let body_len: u64 = members.iter().map(|m| m.size).sum();
        let mut body = vec![0u8; to_usize(body_len)?];
        let mut at = 0;
        for m in &members {
            let n = to_usize(m.size)?;
            self.store.read_exact_at(m.start, &mut body[at..at + n])?;
            at += n;
        }

        directory.reset();
        let mut cursor = HEADER_SIZE;
        for mut m in members {
            m.relocate(cursor);
            cursor = m.end;
            directory.insert_first_empty(m)?;
        }
        directory.save(&mut self.store)?;

        self.store.truncate(HEADER_SIZE)?;
        self.store.write_all_at(HEADER_SIZE, &body)?;
        self.store.flush()?;
        free.clear();

        let new_len = HEADER_SIZE + body_len;
        let reclaimed = old_len.saturating_sub(new_len);
        info!(old_len, new_len, reclaimed, "archive packed");
        Ok(reclaimed)
    }

    /// A bounded reader over the content of member `name`.
    pub fn member_reader(&mut self, name: &str) -> Result<MemberReader<'_, S>> {
        let directory = self.directory()?;
        let member = directory
            .find_by_name(name)
            .ok_or_else(|| ArchiveError::NotFound(name.to_string()))?;
        Ok(MemberReader::new(
            &mut self.store,
            member.start,
            member.size,
        )?)
    }

    pub fn stats(&mut self) -> Result<ArchiveStats> {
        let directory = self.directory()?;
        let archive_len = self.store.total_len()?;
        let free = FreeRangeList::from_directory(&directory, archive_len)?;
        let live_bytes = directory.live_members().map(|(_, m)| m.size).sum();
        Ok(ArchiveStats {
            members: directory.live_count(),
            capacity: CAPACITY,
            live_bytes,
            archive_len,
            free_ranges: free.len(),
            reclaimable_bytes: archive_len.saturating_sub(HEADER_SIZE + live_bytes),
        })
    }

    fn free_space_of(&mut self, directory: &Directory) -> Result<FreeRangeList> {
        let archive_len = self.store.total_len()?;
        FreeRangeList::from_directory(directory, archive_len)
    }

    fn copy_in<W: Workspace>(&mut self, workspace: &W, member: &MemberRecord) -> Result<()> {
        let reader = workspace.open(&member.name)?;
        self.store.seek(SeekFrom::Start(member.start))?;
        let copied = io::copy(&mut reader.take(member.size), &mut self.store)?;
        if copied != member.size {
            return Err(ArchiveError::ShortCopy {
                name: member.name.clone(),
                expected: member.size,
                copied,
            });
        }
        debug!(name = %member.name, start = member.start, size = member.size, "content written");
        Ok(())
    }

    fn extract_member<W: Workspace>(&mut self, workspace: &W, member: &MemberRecord) -> Result<()> {
        check_extract_name(&member.name)?;
        let mut out = workspace.create(&member.name)?;
        let mut reader = MemberReader::new(&mut self.store, member.start, member.size)?;
        let copied = io::copy(&mut reader, &mut out)?;
        out.flush()?;
        if copied != member.size {
            return Err(ArchiveError::ShortCopy {
                name: member.name.clone(),
                expected: member.size,
                copied,
            });
        }
        info!(name = %member.name, size = member.size, "member extracted");
        Ok(())
    }
}

fn to_usize(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| {
        ArchiveError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{len} bytes do not fit in memory"),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::LocalWorkspace;
    use std::{fs, io::Cursor};
    use tempfile::TempDir;

    const H: u64 = HEADER_SIZE;

    fn workspace(files: &[(&str, &[u8])]) -> (TempDir, LocalWorkspace) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let ws = LocalWorkspace::new(dir.path());
        (dir, ws)
    }

    fn memory_archive() -> Archive<Cursor<Vec<u8>>> {
        Archive::new(Cursor::new(Vec::new()))
    }

    fn body(archive: &Archive<Cursor<Vec<u8>>>, start: u64, end: u64) -> &[u8] {
        &archive.get_ref().get_ref()[start as usize..end as usize]
    }

    #[test]
    fn test_create_lays_out_members_contiguously() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();

        let members = archive.list().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!((members[0].start, members[0].end), (H, H + 5));
        assert_eq!((members[1].start, members[1].end), (H + 5, H + 8));
        assert_eq!(body(&archive, H, H + 8), b"aaaaabbb");
        assert_eq!(archive.get_mut().total_len().unwrap(), H + 8);
    }

    #[test]
    fn test_create_replaces_previous_content() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = Archive::new(Cursor::new(vec![0xff; 20_000]));
        archive.create(&ws, &["b"]).unwrap();
        assert_eq!(archive.get_mut().total_len().unwrap(), H + 3);
        assert_eq!(archive.list().unwrap().len(), 1);
    }

    #[test]
    fn test_create_too_many_members_keeps_first_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..=CAPACITY).map(|i| format!("m{i}")).collect();
        for name in &names {
            fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        let ws = LocalWorkspace::new(dir.path());

        let mut archive = memory_archive();
        let err = archive.create(&ws, &names).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::TooManyMembers {
                count,
                capacity: CAPACITY
            } if count == CAPACITY + 1
        ));
        let members = archive.list().unwrap();
        assert_eq!(members.len(), CAPACITY);
        assert!(members.iter().all(|m| m.name != format!("m{CAPACITY}")));
    }

    #[test]
    fn test_create_rejects_duplicates_and_empty_files() {
        let (_dir, ws) = workspace(&[("a", b"a"), ("empty", b"")]);
        let mut archive = memory_archive();
        assert!(matches!(
            archive.create(&ws, &["a", "a"]),
            Err(ArchiveError::DuplicateName(name)) if name == "a"
        ));
        assert!(matches!(
            archive.create(&ws, &["a", "empty"]),
            Err(ArchiveError::EmptyMember(_))
        ));
        assert!(matches!(
            archive.create(&ws, &["missing"]),
            Err(ArchiveError::Io(_))
        ));
    }

    #[test]
    fn test_operations_on_headerless_store() {
        let (_dir, ws) = workspace(&[("a", b"a")]);
        let mut archive = memory_archive();
        assert!(matches!(
            archive.list(),
            Err(ArchiveError::TruncatedHeader { found: 0, .. })
        ));
        assert!(matches!(
            archive.append(&ws, "a"),
            Err(ArchiveError::TruncatedHeader { .. })
        ));
    }

    #[test]
    fn test_delete_zero_fills_and_tombstones() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();

        let free = archive.delete("a").unwrap();
        assert_eq!(body(&archive, H, H + 8), b"\0\0\0\0\0bbb");
        assert_eq!(free.find_fit(5).map(|r| (r.start, r.end)), Some((H, H + 5)));

        let names: Vec<_> = archive.list().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["b"]);
        assert!(archive.directory().unwrap().slots()[0].is_tombstone());
        assert!(matches!(archive.delete("a"), Err(ArchiveError::NotFound(_))));
    }

    #[test]
    fn test_append_without_free_space_goes_after_last_slot() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb"), ("c", b"cccc")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();

        let c = archive.append(&ws, "c").unwrap();
        assert_eq!((c.start, c.end), (H + 8, H + 12));
        assert_eq!(archive.directory().unwrap().find_index_by_name("c"), Some(2));
        assert_eq!(body(&archive, H, H + 12), b"aaaaabbbcccc");
    }

    #[test]
    fn test_append_into_empty_archive() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa")]);
        let mut archive = memory_archive();
        archive.create(&ws, &[] as &[&str]).unwrap();
        let a = archive.append(&ws, "a").unwrap();
        assert_eq!((a.start, a.end), (H, H + 5));
        assert_eq!(archive.directory().unwrap().find_index_by_name("a"), Some(0));
    }

    #[test]
    fn test_append_reuses_trailing_tombstone() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb"), ("c", b"cc")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();
        archive.delete("b").unwrap();

        let c = archive.append(&ws, "c").unwrap();
        assert_eq!((c.start, c.end), (H + 5, H + 7));
        assert_eq!(archive.directory().unwrap().find_index_by_name("c"), Some(1));
        assert_eq!(archive.get_mut().total_len().unwrap(), H + 8);
    }

    #[test]
    fn test_append_skips_gap_behind_live_slot() {
        let (_dir, ws) = workspace(&[
            ("a", b"aaaaa"),
            ("b", b"bbb"),
            ("c", b"cccc"),
            ("d", b"d"),
        ]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();
        archive.delete("a").unwrap();
        archive.append(&ws, "c").unwrap();

        // One byte is left between c and b, tagged with c's slot.
        let free = archive.free_space().unwrap();
        assert_eq!(free.find_fit(1).map(|r| (r.start, r.end, r.index)), Some((H + 4, H + 5, 0)));

        let d = archive.append(&ws, "d").unwrap();
        assert_eq!((d.start, d.end), (H + 8, H + 9));
        let directory = archive.directory().unwrap();
        assert_eq!(directory.find_index_by_name("c"), Some(0));
        assert_eq!(directory.find_index_by_name("d"), Some(2));
    }

    #[test]
    fn test_append_duplicate_name() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a"]).unwrap();
        assert!(matches!(
            archive.append(&ws, "a"),
            Err(ArchiveError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_append_to_full_directory() {
        let files: Vec<(String, Vec<u8>)> = (0..=CAPACITY)
            .map(|i| (format!("m{i}"), vec![i as u8 + 1]))
            .collect();
        let refs: Vec<(&str, &[u8])> = files
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_slice()))
            .collect();
        let (_dir, ws) = workspace(&refs);
        let names: Vec<&str> = refs[..CAPACITY].iter().map(|(n, _)| *n).collect();

        let mut archive = memory_archive();
        archive.create(&ws, &names).unwrap();
        let before = archive.get_ref().get_ref().clone();

        let extra = format!("m{CAPACITY}");
        assert!(matches!(
            archive.append(&ws, &extra),
            Err(ArchiveError::DirectoryFull { capacity: CAPACITY })
        ));
        assert_eq!(archive.get_ref().get_ref(), &before);
        assert_eq!(archive.list().unwrap().len(), CAPACITY);
    }

    #[test]
    fn test_extract_named_and_all() {
        let (_src, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();

        let (out_dir, out) = workspace(&[]);
        let extracted = archive.extract(&out, &["b"]).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(fs::read(out_dir.path().join("b")).unwrap(), b"bbb");
        assert!(!out_dir.path().join("a").exists());

        let extracted = archive.extract(&out, &[] as &[&str]).unwrap();
        assert_eq!(extracted.len(), 2);
        assert_eq!(fs::read(out_dir.path().join("a")).unwrap(), b"aaaaa");
    }

    #[test]
    fn test_extract_stops_at_first_missing_name() {
        let (_src, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();

        let (out_dir, out) = workspace(&[]);
        let err = archive.extract(&out, &["a", "nope", "b"]).unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(name) if name == "nope"));
        assert!(out_dir.path().join("a").exists());
        assert!(!out_dir.path().join("b").exists());
    }

    #[test]
    fn test_update_replaces_content() {
        let (dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();

        fs::write(dir.path().join("a"), b"AAA").unwrap();
        let a = archive.update(&ws, "a").unwrap();
        assert_eq!((a.start, a.end), (H, H + 3));

        let mut content = Vec::new();
        archive.member_reader("a").unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, b"AAA");
    }

    #[test]
    fn test_update_missing_member() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a"]).unwrap();
        assert!(matches!(
            archive.update(&ws, "b"),
            Err(ArchiveError::NotFound(_))
        ));
        assert!(archive.directory().unwrap().find_by_name("b").is_none());
    }

    #[test]
    fn test_update_keeps_member_when_source_is_gone() {
        let (dir, ws) = workspace(&[("a", b"aaaaa")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a"]).unwrap();
        fs::remove_file(dir.path().join("a")).unwrap();

        assert!(matches!(archive.update(&ws, "a"), Err(ArchiveError::Io(_))));
        assert!(archive.directory().unwrap().find_by_name("a").is_some());
    }

    #[test]
    fn test_update_keeps_member_when_source_is_empty() {
        let (dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();
        let before = archive.get_ref().get_ref().clone();
        fs::write(dir.path().join("a"), b"").unwrap();

        assert!(matches!(
            archive.update(&ws, "a"),
            Err(ArchiveError::EmptyMember(name)) if name == "a"
        ));
        assert_eq!(archive.get_ref().get_ref(), &before);

        let mut content = Vec::new();
        archive.member_reader("a").unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, b"aaaaa");
    }

    #[test]
    fn test_pack_compacts_and_truncates() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb"), ("c", b"cc")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b", "c"]).unwrap();
        archive.delete("a").unwrap();

        let reclaimed = archive.pack().unwrap();
        assert_eq!(reclaimed, 5);
        assert_eq!(archive.get_ref().get_ref().len() as u64, H + 5);
        assert_eq!(body(&archive, H, H + 5), b"bbbcc");

        let directory = archive.directory().unwrap();
        assert_eq!(directory.find_index_by_name("b"), Some(0));
        assert_eq!(directory.find_index_by_name("c"), Some(1));
        assert!(!directory.slots()[2].is_tombstone());
        assert!(archive.free_space().unwrap().is_empty());
    }

    #[test]
    fn test_pack_rejects_member_past_end() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a"]).unwrap();
        archive.get_mut().truncate(H + 2).unwrap();
        assert!(matches!(archive.pack(), Err(ArchiveError::Io(_))));
    }

    #[test]
    fn test_member_reader() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();

        let mut reader = archive.member_reader("b").unwrap();
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.offset(), H + 5);
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "bbb");
        assert!(matches!(
            archive.member_reader("zzz"),
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[test]
    fn test_stats() {
        let (_dir, ws) = workspace(&[("a", b"aaaaa"), ("b", b"bbb")]);
        let mut archive = memory_archive();
        archive.create(&ws, &["a", "b"]).unwrap();
        archive.delete("a").unwrap();

        let stats = archive.stats().unwrap();
        assert_eq!(
            stats,
            ArchiveStats {
                members: 1,
                capacity: CAPACITY,
                live_bytes: 3,
                archive_len: H + 8,
                free_ranges: 1,
                reclaimable_bytes: 5,
            }
        );
    }
}

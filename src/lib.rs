//! Folio
//!
//! A Rust library for extracting renderable content from EPUB eBook archives.
//!
//! This library opens an EPUB-style zip archive and normalizes its content
//! for rendering: it projects the publication metadata and cover image from
//! the package manifest, lists entries by extension, and renders every
//! content page with its image references rewritten into self-contained
//! `data:` URIs.
//!
//! ## Features
//!
//! - Session-based access: one [EpubSession](epub::EpubSession) per opened
//!   archive, with fail-fast checks before the archive is loaded.
//! - Manifest-driven lookup: entries are located by extension or by fuzzy
//!   path-fragment matching against the archive snapshot.
//! - Best-effort asset inlining: image references that resolve are embedded
//!   as base64 data URIs, references that do not are left untouched.
//! - Asynchronous fan-out: pages and images are read concurrently while the
//!   output order always matches discovery order.
//!
//! ## Quick Start
//!
//! ```rust, ignore
//! # use folio::epub::EpubSession;
//! # async fn example(bytes: &[u8]) -> Result<(), folio::error::FolioError> {
//! let mut session = EpubSession::new();
//! session.load(bytes)?;
//!
//! let metadata = session.read_metadata().await?;
//! println!("Title: {}", metadata.title);
//!
//! let cover = session.read_cover_data_uri().await?;
//! let pages = session.render_all_pages().await?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod utils;

pub mod archive;
pub mod epub;
pub mod error;
pub mod inline;
pub mod resolver;
pub mod types;

pub use utils::{DecodeBytes, XmlElement};

use futures::future::join_all;

use crate::{
    archive::{ArchiveAccessor, ZipAccessor},
    error::FolioError,
    inline::inline_images,
    resolver::{find_by_extension, find_by_path_fragment},
    types::{ContentEncoding, CoverReference, DecodedContent, Entry, Metadata},
    utils::{XmlElement, XmlReader, file_extension, image_media_subtype},
};

/// The outcome of rendering one page
///
/// Pages render independently under the fan-out in
/// [render_all_pages](EpubSession::render_all_pages); a failed page occupies
/// its slot as an error without suppressing its siblings.
pub type PageResult = Result<String, FolioError>;

/// A loaded archive session, representing one opened publication
///
/// The `EpubSession` structure is the entry point of the crate. It owns the
/// archive snapshot for exactly one publication and exposes the read
/// operations a host application renders from: manifest metadata, the cover
/// image as a data URI, generic extension listings and fully inlined pages.
///
/// A session has two states. It starts **unloaded**; every read operation
/// fails fast with [FolioError::ArchiveNotLoaded] until [load](Self::load)
/// (or [load_accessor](Self::load_accessor)) installs a snapshot, after
/// which the session is **loaded** for its remaining lifetime. Loading again
/// replaces the snapshot. The snapshot itself is immutable, so any number of
/// concurrent reads may share it without coordination.
///
/// # Notes
/// - The manifest document is re-read and re-parsed on every metadata or
///   cover access; callers must tolerate the repeated parse cost.
/// - Sessions are independent: hosts needing several publications open one
///   session per archive without cross-contamination.
pub struct EpubSession {
    /// The loaded archive snapshot; `None` while unloaded
    accessor: Option<Box<dyn ArchiveAccessor>>,
}

impl EpubSession {
    /// Creates a new session in the unloaded state
    pub fn new() -> Self {
        Self { accessor: None }
    }

    /// Loads an archive from its raw bytes
    ///
    /// The bytes are decompressed into an immutable in-memory snapshot.
    /// Loading into an already loaded session replaces the previous
    /// snapshot.
    ///
    /// ## Parameters
    /// - `bytes`: The compressed archive
    ///
    /// ## Return
    /// - `Ok(())`: The session is now loaded
    /// - `Err(FolioError)`: The bytes are not a readable archive; the
    ///   previous snapshot, if any, stays in place
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), FolioError> {
        let accessor = ZipAccessor::from_bytes(bytes)?;
        self.accessor = Some(Box::new(accessor));
        Ok(())
    }

    /// Installs a custom archive accessor as the loaded snapshot
    ///
    /// Intended for hosts that obtain archive content from somewhere other
    /// than an in-memory ZIP byte buffer.
    pub fn load_accessor(&mut self, accessor: Box<dyn ArchiveAccessor>) {
        self.accessor = Some(accessor);
    }

    /// Whether an archive has been loaded into this session
    pub fn is_loaded(&self) -> bool {
        self.accessor.is_some()
    }

    fn accessor(&self) -> Result<&dyn ArchiveAccessor, FolioError> {
        self.accessor.as_deref().ok_or(FolioError::ArchiveNotLoaded)
    }

    /// Locates the manifest entry of the archive
    ///
    /// The manifest is the single `.opf` entry; when several are present the
    /// first in enumeration order is taken, per the single-manifest
    /// assumption.
    ///
    /// ## Return
    /// - `Ok(Some(&Entry))`: The manifest entry
    /// - `Ok(None)`: The archive carries no `.opf` entry
    /// - `Err(FolioError)`: The session is not loaded
    pub fn locate_manifest_entry(&self) -> Result<Option<&Entry>, FolioError> {
        let accessor = self.accessor()?;
        Ok(find_by_extension(accessor.entries(), ".opf")
            .into_iter()
            .next())
    }

    /// Reads and parses the manifest document
    ///
    /// The document is recomputed on every call; there is no caching layer.
    ///
    /// ## Return
    /// - `Ok(Some(XmlElement))`: The parsed manifest root element
    /// - `Ok(None)`: The archive carries no manifest entry
    /// - `Err(FolioError)`: The session is not loaded, or the manifest
    ///   content is not parseable XML
    pub async fn load_manifest_document(&self) -> Result<Option<XmlElement>, FolioError> {
        let Some(entry) = self.locate_manifest_entry()? else {
            return Ok(None);
        };

        let content = self.accessor()?.read_text(&entry.path).await?;
        XmlReader::parse(&content).map(Some)
    }

    /// Retrieves the basic publication metadata
    ///
    /// Projects the first `dc:title` and first `dc:publisher` element of the
    /// manifest document. Both elements are required; the projection never
    /// returns partial data.
    ///
    /// ## Return
    /// - `Ok(Metadata)`: Title and publisher of the publication
    /// - `Err(FolioError)`: The session is not loaded, the archive has no
    ///   manifest, or a required element is absent
    pub async fn read_metadata(&self) -> Result<Metadata, FolioError> {
        let document = self
            .load_manifest_document()
            .await?
            .ok_or(FolioError::ManifestNotFound)?;

        let title = Self::dc_element_text(&document, "title")?;
        let publisher = Self::dc_element_text(&document, "publisher")?;

        Ok(Metadata { title, publisher })
    }

    fn dc_element_text(document: &XmlElement, name: &str) -> Result<String, FolioError> {
        document
            .find_by_prefixed_name("dc", name)
            .map(|element| element.text())
            .ok_or_else(|| FolioError::ManifestFieldMissing {
                field: format!("dc:{}", name),
            })
    }

    /// Retrieves the declared location of the cover image
    ///
    /// The manifest's package `version` attribute selects which element id
    /// declares the cover: a version of exactly `"2.0"` selects `cover`,
    /// any other value, including an absent attribute, selects
    /// `cover-image`. The `href` attribute of the element carrying that id
    /// is the cover location.
    ///
    /// ## Return
    /// - `Ok(CoverReference)`: The declared cover path
    /// - `Err(FolioError)`: The session is not loaded, the archive has no
    ///   manifest, or the selected id or its `href` is absent
    pub async fn read_cover_reference(&self) -> Result<CoverReference, FolioError> {
        let document = self
            .load_manifest_document()
            .await?
            .ok_or(FolioError::ManifestNotFound)?;

        let cover_id = match document.get_attr("version").as_deref() {
            Some("2.0") => "cover",
            _ => "cover-image",
        };

        let absolute_path = document
            .find_by_attr("id", cover_id)
            .and_then(|element| element.get_attr("href"))
            .ok_or(FolioError::CoverNotFound)?;

        Ok(CoverReference { absolute_path })
    }

    /// Retrieves the cover image as a data URI
    ///
    /// Resolves the declared cover location against the archive with the
    /// fuzzy fragment lookup, reads the image and renders
    /// `data:image/{subtype};base64,{payload}` with the MIME subtype derived
    /// from the entry's file extension.
    ///
    /// ## Return
    /// - `Ok(String)`: The cover image as a data URI
    /// - `Err(FolioError)`: The session is not loaded, the manifest or its
    ///   cover declaration is absent, or the declared entry does not exist
    pub async fn read_cover_data_uri(&self) -> Result<String, FolioError> {
        let reference = self.read_cover_reference().await?;

        let accessor = self.accessor()?;
        let entry = find_by_path_fragment(accessor.entries(), &reference.absolute_path)
            .ok_or(FolioError::CoverNotFound)?;

        let payload = accessor.read_base64(&entry.path).await?;
        let extension = file_extension(&entry.path).unwrap_or_default();

        Ok(format!(
            "data:image/{};base64,{}",
            image_media_subtype(&extension),
            payload
        ))
    }

    /// Reads every entry with the given extension, decoded as requested
    ///
    /// All matching entries are read concurrently; the output order matches
    /// archive-enumeration order regardless of read completion order. No
    /// matching entries yields an empty vector, not an error.
    ///
    /// ## Parameters
    /// - `suffix`: The extension to scan for, including the dot, e.g. `.css`
    /// - `encoding`: The encoding each entry is decoded into
    ///
    /// ## Return
    /// - `Ok(Vec<DecodedContent>)`: Decoded contents in enumeration order
    /// - `Err(FolioError)`: The session is not loaded, or a read failed
    pub async fn list_by_extension(
        &self,
        suffix: &str,
        encoding: ContentEncoding,
    ) -> Result<Vec<DecodedContent>, FolioError> {
        let accessor = self.accessor()?;
        let matched = find_by_extension(accessor.entries(), suffix);

        join_all(
            matched
                .into_iter()
                .map(|entry| accessor.read(&entry.path, encoding)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Renders every content page with its images inlined
    ///
    /// Pages are discovered with two extension scans, all `.html` entries
    /// followed by all `.xhtml` entries, concatenated in that fixed order.
    /// Every page is read and inlined independently under a join-all
    /// fan-out, and the output sequence preserves discovery order even
    /// though the underlying reads complete in arbitrary order.
    ///
    /// A failure rendering one page fills that page's slot with an error
    /// and never blocks or corrupts its siblings.
    ///
    /// ## Return
    /// - `Ok(Vec<PageResult>)`: One render result per discovered page
    /// - `Err(FolioError)`: The session is not loaded
    pub async fn render_all_pages(&self) -> Result<Vec<PageResult>, FolioError> {
        let accessor = self.accessor()?;
        let entries = accessor.entries();

        let mut pages = find_by_extension(entries, ".html");
        pages.extend(find_by_extension(entries, ".xhtml"));

        let renders = join_all(pages.into_iter().map(|entry| async move {
            let markup = accessor.read_text(&entry.path).await?;
            inline_images(&markup, accessor).await
        }))
        .await;

        Ok(renders)
    }
}

impl Default for EpubSession {
    fn default() -> Self {
        Self::new()
    }
}

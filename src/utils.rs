use indexmap::IndexMap;
use quick_xml::{Reader, events::BytesStart, events::Event};

use crate::error::FolioError;

/// Provides functionality to decode byte data into strings
///
/// This trait is primarily used to decode raw byte data (such as manifest or
/// page files read from the archive) into a suitable string representation.
/// It supports automatic detection of UTF-8 (with or without BOM), UTF-16 BE
/// and UTF-16 LE.
///
/// ## Notes
/// - When a byte stream lacks a BOM the decoding falls back to UTF-8, then
///   lossy UTF-8, so the result is always a string but may contain
///   replacement characters for genuinely binary input.
pub trait DecodeBytes {
    fn decode(&self) -> Result<String, FolioError>;
}

impl DecodeBytes for [u8] {
    fn decode(&self) -> Result<String, FolioError> {
        if self.is_empty() {
            return Err(FolioError::EmptyData);
        }

        // UTF-8 BOM (0xEF, 0xBB, 0xBF)
        if let Some(rest) = self.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
            return String::from_utf8(rest.to_vec()).map_err(FolioError::from);
        }

        // UTF-16 BE BOM (0xFE, 0xFF)
        if let Some(rest) = self.strip_prefix(&[0xFE, 0xFF]) {
            return decode_utf16(rest, u16::from_be_bytes);
        }

        // UTF-16 LE BOM (0xFF, 0xFE)
        if let Some(rest) = self.strip_prefix(&[0xFF, 0xFE]) {
            return decode_utf16(rest, u16::from_le_bytes);
        }

        match String::from_utf8(self.to_vec()) {
            Ok(text) => Ok(text),
            Err(_) => Ok(String::from_utf8_lossy(self).to_string()),
        }
    }
}

impl DecodeBytes for Vec<u8> {
    fn decode(&self) -> Result<String, FolioError> {
        self.as_slice().decode()
    }
}

fn decode_utf16(bytes: &[u8], unpack: fn([u8; 2]) -> u16) -> Result<String, FolioError> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unpack([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(FolioError::from)
}

/// Returns the lowercased text after the final `.` of a path
///
/// Returns `None` when the path contains no `.` at all.
pub fn file_extension(path: &str) -> Option<String> {
    path.rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
}

/// Maps a file extension to the subtype of its `image/*` media type
///
/// Extensions whose subtype differs from the extension itself are mapped
/// explicitly; everything else passes through unchanged.
pub fn image_media_subtype(extension: &str) -> &str {
    match extension {
        "jpg" | "jpeg" => "jpeg",
        "svg" => "svg+xml",
        "tif" | "tiff" => "tiff",
        other => other,
    }
}

/// Represents an element node in an XML document
#[derive(Debug)]
pub struct XmlElement {
    /// The local name of the element (excluding the namespace prefix)
    pub name: String,

    /// The namespace prefix of the element
    pub prefix: Option<String>,

    /// The attributes of the element, in document order
    pub attributes: IndexMap<String, String>,

    /// The direct text content of the element
    pub text: Option<String>,

    /// The children of the element
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String, prefix: Option<String>) -> Self {
        Self {
            name,
            prefix,
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Gets the text content of the element and all its child elements
    ///
    /// Collects the text content of the current element and of all its child
    /// elements, removing leading and trailing whitespace.
    pub fn text(&self) -> String {
        let mut result = String::new();

        if let Some(text) = &self.text {
            result.push_str(text);
        }

        for child in &self.children {
            result.push_str(&child.text());
        }

        result.trim().to_string()
    }

    /// Returns the value of the specified attribute
    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    /// Get children elements
    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }

    /// Find the first descendant (or self) with the given prefix and local name
    ///
    /// Elements are visited in document order, so "first" matches the first
    /// occurrence in the serialized file.
    pub fn find_by_prefixed_name(&self, prefix: &str, name: &str) -> Option<&XmlElement> {
        self.descendants().into_iter().find(|element| {
            element.name == name && element.prefix.as_deref() == Some(prefix)
        })
    }

    /// Find the first descendant (or self) carrying the given attribute value
    pub fn find_by_attr(&self, attribute: &str, value: &str) -> Option<&XmlElement> {
        self.descendants()
            .into_iter()
            .find(|element| element.attributes.get(attribute).is_some_and(|v| v == value))
    }

    fn descendants(&self) -> Vec<&XmlElement> {
        let mut collected = Vec::new();
        self.collect_into(&mut collected);
        collected
    }

    fn collect_into<'a>(&'a self, collected: &mut Vec<&'a XmlElement>) {
        collected.push(self);
        for child in &self.children {
            child.collect_into(collected);
        }
    }
}

/// XML parser used to parse XML content and build an XML element tree
pub struct XmlReader;

impl XmlReader {
    /// Parses an XML string and builds the root element
    ///
    /// This function parses the content with the `quick_xml` event reader
    /// and builds an [XmlElement] tree representing the structure of the
    /// whole document. Comments, processing instructions, declarations and
    /// doctypes are skipped.
    ///
    /// ## Parameters
    /// - `content`: The XML string to be parsed
    ///
    /// ## Return
    /// - `Ok(XmlElement)`: The root element of the XML element tree
    /// - `Err(FolioError)`: An error occurred during parsing
    pub fn parse(content: &str) -> Result<XmlElement, FolioError> {
        if content.is_empty() {
            return Err(FolioError::EmptyData);
        }

        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack = Vec::<XmlElement>::new();
        let mut root = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => break,

                Ok(Event::Start(start)) => {
                    stack.push(Self::open_element(&start));
                }

                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        match stack.last_mut() {
                            // The enclosing element adopts the closed one
                            Some(parent) => parent.children.push(element),

                            // An empty stack means the root element closed
                            None => root = Some(element),
                        }
                    }
                }

                Ok(Event::Empty(start)) => {
                    let element = Self::open_element(&start);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),

                        // A self-closing element as the entire document
                        None => root = Some(element),
                    }
                }

                Ok(Event::Text(text)) => {
                    if let Some(element) = stack.last_mut() {
                        let content = String::from_utf8_lossy(text.as_ref()).to_string();
                        if !content.trim().is_empty() {
                            element.text = Some(content);
                        }
                    }
                }

                Err(err) => return Err(err.into()),

                // Comment, PI, Declaration, Doctype, CData, GeneralRef
                _ => continue,
            }
        }

        root.ok_or(FolioError::FailedParsingXml)
    }

    fn open_element(start: &BytesStart) -> XmlElement {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        let prefix = start
            .name()
            .prefix()
            .map(|prefix| String::from_utf8_lossy(prefix.as_ref()).to_string());

        let mut element = XmlElement::new(name, prefix);
        for attr in start.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            if key.starts_with("xmlns") {
                continue;
            }

            let value = String::from_utf8_lossy(&attr.value).to_string();
            element.attributes.insert(key, value);
        }

        element
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::FolioError,
        utils::{DecodeBytes, XmlReader, file_extension, image_media_subtype},
    };

    /// Test with empty data
    #[test]
    fn test_decode_empty_data() {
        let data: Vec<u8> = vec![];
        let result = data.decode();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), FolioError::EmptyData);
    }

    /// Testing text decoding with UTF-8 BOM
    #[test]
    fn test_decode_utf8_with_bom() {
        let data: Vec<u8> = vec![0xEF, 0xBB, 0xBF, b'H', b'e', b'l', b'l', b'o'];
        assert_eq!(data.decode().unwrap(), "Hello");
    }

    /// Test text decoding with UTF-16 BE BOM
    #[test]
    fn test_decode_utf16_be_with_bom() {
        let data = vec![0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(data.decode().unwrap(), "Hi");
    }

    /// Testing text decoding with UTF-16 LE BOM
    #[test]
    fn test_decode_utf16_le_with_bom() {
        let data = vec![0xFF, 0xFE, b'H', 0x00, b'i', 0x00];
        assert_eq!(data.decode().unwrap(), "Hi");
    }

    /// Testing ordinary UTF-8 text (without BOM)
    #[test]
    fn test_decode_plain_utf8() {
        let data = b"Hello, World!".to_vec();
        assert_eq!(data.decode().unwrap(), "Hello, World!");
    }

    /// Invalid UTF-8 without BOM falls back to lossy decoding
    #[test]
    fn test_decode_lossy_fallback() {
        let data = vec![b'o', b'k', 0xFF];
        let decoded = data.decode().unwrap();
        assert!(decoded.starts_with("ok"));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("images/cover.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("a/b.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("mimetype"), None);
    }

    #[test]
    fn test_image_media_subtype() {
        assert_eq!(image_media_subtype("jpg"), "jpeg");
        assert_eq!(image_media_subtype("jpeg"), "jpeg");
        assert_eq!(image_media_subtype("svg"), "svg+xml");
        assert_eq!(image_media_subtype("png"), "png");
    }

    mod xml_reader_tests {
        use super::*;

        const PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
            <package xmlns="http://www.idpf.org/2007/opf" version="2.0">
                <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
                    <dc:title>The Trial</dc:title>
                    <dc:publisher>Verlag Die Schmiede</dc:publisher>
                </metadata>
                <manifest>
                    <item id="cover" href="images/cover.jpg" media-type="image/jpeg"/>
                    <item id="page1" href="page1.html" media-type="application/xhtml+xml"/>
                </manifest>
            </package>"#;

        /// The root element keeps its name and attributes
        #[test]
        fn test_parse_root() {
            let root = XmlReader::parse(PACKAGE).unwrap();
            assert_eq!(root.name, "package");
            assert_eq!(root.get_attr("version"), Some("2.0".to_string()));
        }

        /// Prefixed elements are found by prefix and local name
        #[test]
        fn test_find_by_prefixed_name() {
            let root = XmlReader::parse(PACKAGE).unwrap();

            let title = root.find_by_prefixed_name("dc", "title").unwrap();
            assert_eq!(title.text(), "The Trial");

            let publisher = root.find_by_prefixed_name("dc", "publisher").unwrap();
            assert_eq!(publisher.text(), "Verlag Die Schmiede");

            assert!(root.find_by_prefixed_name("dc", "creator").is_none());
        }

        /// Self-closing elements are found by their id attribute
        #[test]
        fn test_find_by_attr() {
            let root = XmlReader::parse(PACKAGE).unwrap();

            let item = root.find_by_attr("id", "cover").unwrap();
            assert_eq!(item.get_attr("href"), Some("images/cover.jpg".to_string()));

            assert!(root.find_by_attr("id", "missing").is_none());
        }

        /// Empty input is rejected before parsing
        #[test]
        fn test_parse_empty() {
            let result = XmlReader::parse("");
            assert_eq!(result.unwrap_err(), FolioError::EmptyData);
        }

        /// Input without any element yields no root
        #[test]
        fn test_parse_no_root() {
            let result = XmlReader::parse("<?xml version=\"1.0\"?>");
            assert_eq!(result.unwrap_err(), FolioError::FailedParsingXml);
        }
    }
}

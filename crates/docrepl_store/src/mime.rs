//! MIME type resolution.

use crate::types::DocumentKind;

/// A content type known to a [`MimeTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    /// MIME name, e.g. `application/xml`.
    pub name: String,
    /// How documents of this type are stored.
    pub kind: DocumentKind,
}

impl MimeType {
    /// MIME name used for content of unknown type.
    pub const BINARY: &'static str = "application/octet-stream";

    /// Creates a MIME type.
    pub fn new(name: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Returns true for XML types.
    #[must_use]
    pub fn is_xml(&self) -> bool {
        self.kind == DocumentKind::Xml
    }
}

/// Resolves content types.
pub trait MimeTable: Send + Sync {
    /// Resolves a MIME name (`text/xml`) or a file name or path
    /// (`/db/site.xml`) to a content type.
    fn content_type_for(&self, name_or_path: &str) -> Option<MimeType>;
}

/// `(mime name, kind, extensions)` entries of [`DefaultMimeTable`].
const DEFAULT_TYPES: &[(&str, DocumentKind, &[&str])] = &[
    ("application/xml", DocumentKind::Xml, &["xml", "xconf", "xmap", "xmi"]),
    ("text/xml", DocumentKind::Xml, &[]),
    ("application/xslt+xml", DocumentKind::Xml, &["xsl", "xslt"]),
    ("application/xml-schema", DocumentKind::Xml, &["xsd"]),
    ("application/xhtml+xml", DocumentKind::Xml, &["xhtml", "xht"]),
    ("image/svg+xml", DocumentKind::Xml, &["svg"]),
    ("application/rdf+xml", DocumentKind::Xml, &["rdf", "owl"]),
    ("application/atom+xml", DocumentKind::Xml, &["atom"]),
    ("application/xquery", DocumentKind::Binary, &["xq", "xql", "xqm", "xquery"]),
    ("text/plain", DocumentKind::Binary, &["txt", "text", "log"]),
    ("text/html", DocumentKind::Binary, &["html", "htm"]),
    ("text/css", DocumentKind::Binary, &["css"]),
    ("application/javascript", DocumentKind::Binary, &["js"]),
    ("application/json", DocumentKind::Binary, &["json"]),
    ("image/png", DocumentKind::Binary, &["png"]),
    ("image/jpeg", DocumentKind::Binary, &["jpg", "jpeg"]),
    ("image/gif", DocumentKind::Binary, &["gif"]),
    ("application/pdf", DocumentKind::Binary, &["pdf"]),
    ("application/zip", DocumentKind::Binary, &["zip", "xar"]),
    ("application/octet-stream", DocumentKind::Binary, &["bin", "dat"]),
];

/// A built-in table mapping common extensions to content types.
#[derive(Debug, Clone, Default)]
pub struct DefaultMimeTable {
    extra: Vec<(String, MimeType)>,
}

impl DefaultMimeTable {
    /// Creates the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an additional extension, taking precedence over built-ins.
    #[must_use]
    pub fn with_extension(mut self, extension: &str, mime: MimeType) -> Self {
        self.extra.push((extension.to_ascii_lowercase(), mime));
        self
    }

    fn by_name(&self, name: &str) -> Option<MimeType> {
        let name = name.trim().to_ascii_lowercase();
        if let Some((_, mime)) = self.extra.iter().find(|(_, m)| m.name == name) {
            return Some(mime.clone());
        }
        DEFAULT_TYPES
            .iter()
            .find(|(mime, _, _)| *mime == name)
            .map(|(mime, kind, _)| MimeType::new(*mime, *kind))
    }

    fn by_extension(&self, name_or_path: &str) -> Option<MimeType> {
        let file_name = name_or_path.rsplit('/').next().unwrap_or(name_or_path);
        let (_, extension) = file_name.rsplit_once('.')?;
        let extension = extension.to_ascii_lowercase();

        if let Some((_, mime)) = self.extra.iter().find(|(ext, _)| *ext == extension) {
            return Some(mime.clone());
        }
        DEFAULT_TYPES
            .iter()
            .find(|(_, _, extensions)| extensions.contains(&extension.as_str()))
            .map(|(mime, kind, _)| MimeType::new(*mime, *kind))
    }
}

impl MimeTable for DefaultMimeTable {
    fn content_type_for(&self, name_or_path: &str) -> Option<MimeType> {
        if name_or_path.contains('/') && !name_or_path.starts_with('/') {
            if let Some(mime) = self.by_name(name_or_path) {
                return Some(mime);
            }
        }
        self.by_extension(name_or_path)
    }
}

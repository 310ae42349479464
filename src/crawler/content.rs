//! Page content extraction
//!
//! This module turns a raw response body into page content:
//! - Character encoding detection independent of HTTP headers
//! - Permissive HTML parsing
//! - Title and paragraph text extraction

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use scraper::{Html, Selector};
use thiserror::Error;

/// Paragraphs whose trimmed text is this many characters or fewer are dropped
pub const MIN_BLOCK_CHARS: usize = 20;

/// How far into the document to look for a charset declaration
const CHARSET_SNIFF_BYTES: usize = 1024;

/// Errors raised while turning a fetched body into page content
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported content type: {content_type}")]
    UnsupportedContent { content_type: String },
}

/// Title and ordered text blocks extracted from a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Trimmed `<title>` text, empty if the document has none
    pub title: String,

    /// Paragraph texts longer than `MIN_BLOCK_CHARS`, in document order
    pub blocks: Vec<String>,
}

impl ExtractedPage {
    /// Appends a text block
    pub fn push_block(&mut self, block: String) {
        self.blocks.push(block);
    }

    /// The stored page content: blocks joined by newlines
    pub fn content(&self) -> String {
        self.blocks.join("\n")
    }
}

/// Rejects bodies whose declared media type is not HTML
///
/// A missing or empty Content-Type is accepted; the parser is permissive
/// enough to cope with whatever arrives.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), ParseError> {
    let Some(raw) = content_type else {
        return Ok(());
    };

    let media_type = raw
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        "" | "text/html" | "application/xhtml+xml" => Ok(()),
        _ => Err(ParseError::UnsupportedContent {
            content_type: raw.to_string(),
        }),
    }
}

/// Detects the character encoding of an HTML body
///
/// # Detection Order
///
/// 1. Byte-order mark
/// 2. `charset=` declaration (`<meta charset>` or `http-equiv`) within the
///    first 1024 bytes
/// 3. UTF-8, if the whole body is valid UTF-8
/// 4. windows-1252
///
/// The HTTP `Content-Type` charset is deliberately not consulted.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(encoding) = sniff_meta_charset(bytes) {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        WINDOWS_1252
    }
}

/// Decodes an HTML body to text using `detect_encoding`
pub fn decode_html(bytes: &[u8]) -> String {
    let encoding = detect_encoding(bytes);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(CHARSET_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(pos) = rest.find("charset") {
        rest = &rest[pos + "charset".len()..];
        let after = rest.trim_start();
        let Some(value) = after.strip_prefix('=') else {
            continue;
        };
        let label: String = value
            .trim_start()
            .trim_start_matches(['"', '\''])
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .collect();

        // A page cannot declare itself UTF-16 from inside ASCII-compatible bytes
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return Some(encoding.output_encoding());
        }
    }

    None
}

/// Extracts the title and text blocks from a parsed document
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use sitegraph::crawler::extract_content;
///
/// let html = Html::parse_document(
///     "<title> Docs </title><p>short</p><p>This paragraph is long enough to keep.</p>",
/// );
/// let page = extract_content(&html);
/// assert_eq!(page.title, "Docs");
/// assert_eq!(page.blocks, vec!["This paragraph is long enough to keep."]);
/// ```
pub fn extract_content(document: &Html) -> ExtractedPage {
    let mut page = ExtractedPage {
        title: extract_title(document),
        blocks: Vec::new(),
    };

    if let Ok(p_selector) = Selector::parse("p") {
        for element in document.select(&p_selector) {
            let text = element.text().collect::<String>();
            let text = text.trim();
            if text.chars().count() > MIN_BLOCK_CHARS {
                page.push_block(text.to_string());
            }
        }
    }

    page
}

fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

//! Turns an uploaded idea document into normalized [`Idea`] text.
//!
//! Supported formats are chosen by file extension: `.txt`, `.docx` and `.odt`.
//! Office formats are zip archives; paragraph text is recovered from the main
//! XML part with tag stripping, which is enough for prose documents.

use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use tracing::debug;

use crate::error::AppError;
use crate::model::Idea;

static DOCX_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</w:p>|<w:br\s*/>").expect("valid regex"));
static DOCX_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:tab\s*/>").expect("valid regex"));
static ODT_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</text:p>|</text:h>|<text:line-break\s*/>").expect("valid regex")
});
static ODT_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<text:s[^>]*/>|<text:tab\s*/>").expect("valid regex"));
static XML_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Docx,
    Odt,
}

impl DocumentFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, AppError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("txt") => Ok(DocumentFormat::PlainText),
            Some("docx") => Ok(DocumentFormat::Docx),
            Some("odt") => Ok(DocumentFormat::Odt),
            _ => Err(AppError::UnsupportedInput(file_name.to_string())),
        }
    }
}

pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Result<String, AppError> {
    match format {
        DocumentFormat::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DocumentFormat::Docx => {
            let xml = read_zip_entry(bytes, "word/document.xml")?;
            Ok(xml_to_text(&xml, &DOCX_BREAKS, &DOCX_SPACES))
        }
        DocumentFormat::Odt => {
            let xml = read_zip_entry(bytes, "content.xml")?;
            Ok(xml_to_text(&xml, &ODT_BREAKS, &ODT_SPACES))
        }
    }
}

fn read_zip_entry(bytes: &[u8], name: &str) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::Extraction(format!("not a valid document archive: {e}")))?;
    let mut entry = archive
        .by_name(name)
        .map_err(|e| AppError::Extraction(format!("missing {name}: {e}")))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| AppError::Extraction(format!("unreadable {name}: {e}")))?;
    Ok(xml)
}

fn xml_to_text(xml: &str, line_breaks: &Regex, spaces: &Regex) -> String {
    let text = line_breaks.replace_all(xml, "\n");
    let text = spaces.replace_all(&text, " ");
    let text = XML_TAGS.replace_all(&text, "");
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// English stopwords (NLTK corpus).
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Lowercases, strips punctuation, drops stopwords and stems what is left.
pub struct Normalizer {
    stopwords: HashSet<&'static str>,
    stemmer: Stemmer,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            stopwords: STOPWORDS.iter().copied().collect(),
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let cleaned = NON_ALNUM.replace_all(&lowered, "");

        cleaned
            .split_whitespace()
            .filter(|token| !self.stopwords.contains(token))
            .map(|token| self.stemmer.stem(token).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Detect the format, extract the text and normalize it.
    pub fn load_idea(&self, file_name: &str, bytes: &[u8]) -> Result<Idea, AppError> {
        let format = DocumentFormat::from_file_name(file_name)?;
        let raw = extract_text(format, bytes)?;
        let normalized = self.normalize(&raw);
        debug!(
            file_name,
            raw_chars = raw.chars().count(),
            normalized_chars = normalized.chars().count(),
            "document normalized"
        );
        if normalized.trim().is_empty() {
            return Err(AppError::Extraction(format!(
                "{file_name} contains no usable text"
            )));
        }
        Ok(Idea::new(normalized))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn zip_with(entry: &str, content: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file(entry, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn format_is_detected_case_insensitively() {
        assert_eq!(
            DocumentFormat::from_file_name("idea.TXT").unwrap(),
            DocumentFormat::PlainText
        );
        assert_eq!(
            DocumentFormat::from_file_name("pitch.docx").unwrap(),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_file_name("notes.odt").unwrap(),
            DocumentFormat::Odt
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = DocumentFormat::from_file_name("slides.pdf").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedInput(ref name) if name == "slides.pdf"));
        assert!(DocumentFormat::from_file_name("README").is_err());
    }

    #[test]
    fn normalize_drops_stopwords_and_punctuation() {
        let normalizer = Normalizer::new();
        let out = normalizer.normalize("An app connecting freelance tutors with students!");
        let tokens: Vec<&str> = out.split(' ').collect();
        assert!(!tokens.contains(&"an"));
        assert!(!tokens.contains(&"with"));
        assert!(tokens.contains(&"app"));
        assert!(tokens.contains(&"connect"));
        assert!(tokens.contains(&"tutor"));
        assert!(tokens.contains(&"student"));
        assert!(!out.contains('!'));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>Tutors &amp; students</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t></w:r></w:p></w:body></w:document>"#;
        let bytes = zip_with("word/document.xml", xml);
        let text = extract_text(DocumentFormat::Docx, &bytes).unwrap();
        assert_eq!(text.trim(), "Tutors & students\nSecond");
    }

    #[test]
    fn odt_paragraphs_become_lines() {
        let xml = r#"<office:document-content><office:body><office:text><text:p>Local<text:s/>sellers</text:p><text:h>Delivery</text:h></office:text></office:body></office:document-content>"#;
        let bytes = zip_with("content.xml", xml);
        let text = extract_text(DocumentFormat::Odt, &bytes).unwrap();
        assert_eq!(text.trim(), "Local sellers\nDelivery");
    }

    #[test]
    fn corrupt_archive_is_an_extraction_error() {
        let err = extract_text(DocumentFormat::Docx, b"plain bytes").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn shared_normalizer_gives_stable_output() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Normalizer>();

        let normalizer = Normalizer::new();
        let first = normalizer.normalize("Running tutors for students");
        let second = normalizer.normalize("Running tutors for students");
        assert_eq!(first, second);
        assert_eq!(first, "run tutor student");
    }

    #[test]
    fn blank_document_is_rejected() {
        let normalizer = Normalizer::new();
        let err = normalizer.load_idea("idea.txt", b"the and of").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}

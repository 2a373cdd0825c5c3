//! Text and image extraction from uploaded documents.

use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;

use ai_agent_core::{Error, Result};

use super::render::SlideImage;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Combined text of every document plus the uploaded images that can be
/// embedded in a deck.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub text: String,
    pub images: Vec<SlideImage>,
    /// Whether any document produced non-empty text.
    pub has_text: bool,
}

pub fn extract_content(documents: &[SourceDocument]) -> ExtractedContent {
    let mut content = ExtractedContent::default();

    for doc in documents {
        let extension = Path::new(&doc.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        content
            .text
            .push_str(&format!("\n\n--- Content from {} ---\n\n", doc.file_name));

        let extracted = match extension.as_str() {
            "pdf" => pdf_text(&doc.data),
            "docx" => docx_text(&doc.data),
            "txt" => Ok(String::from_utf8_lossy(&doc.data).into_owned()),
            ext if IMAGE_EXTENSIONS.contains(&ext) => {
                match SlideImage::from_bytes(doc.data.clone()) {
                    Some(image) => content.images.push(image),
                    None => tracing::warn!(file = %doc.file_name, "Unreadable image skipped"),
                }
                content
                    .text
                    .push_str(&format!("[Image file: {}]\n", doc.file_name));
                continue;
            }
            _ => {
                tracing::warn!(file = %doc.file_name, "Unsupported document type skipped");
                continue;
            }
        };

        match extracted {
            Ok(text) => {
                if !text.trim().is_empty() {
                    content.has_text = true;
                }
                content.text.push_str(&text);
            }
            Err(e) => tracing::warn!(file = %doc.file_name, error = %e, "Text extraction failed"),
        }
    }

    content
}

fn pdf_text(data: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::invalid_request(format!("Could not read PDF: {}", e)))
}

/// Paragraph text of `word/document.xml`.
pub fn docx_text(data: &[u8]) -> Result<String> {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"));

    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::invalid_request(format!("Could not read DOCX: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::invalid_request(format!("Could not read DOCX: {}", e)))?
        .read_to_string(&mut xml)?;

    let with_breaks = xml.replace("</w:p>", "\n");
    let stripped = tag.replace_all(&with_breaks, "");
    Ok(stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Write;

    fn png() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(4, 3).write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn docx(xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_docx_text() {
        let data = docx(
            r#"<w:document><w:body><w:p><w:r><w:t>Rust &amp; safety</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t></w:r></w:p></w:body></w:document>"#,
        );
        assert_eq!(docx_text(&data).unwrap(), "Rust & safety\nSecond\n");
    }

    #[test]
    fn test_extract_mixed_documents() {
        let content = extract_content(&[
            SourceDocument {
                file_name: "notes.txt".into(),
                data: b"Ownership and borrowing".to_vec(),
            },
            SourceDocument {
                file_name: "diagram.PNG".into(),
                data: png(),
            },
            SourceDocument {
                file_name: "broken.jpg".into(),
                data: vec![0xFF, 0xD8],
            },
            SourceDocument {
                file_name: "archive.tar".into(),
                data: vec![1, 2, 3],
            },
        ]);
        assert!(content.has_text);
        assert!(content.text.contains("--- Content from notes.txt ---"));
        assert!(content.text.contains("Ownership and borrowing"));
        assert!(content.text.contains("[Image file: diagram.PNG]"));
        assert!(content.text.contains("[Image file: broken.jpg]"));
        assert_eq!(content.images.len(), 1);
        assert_eq!((content.images[0].width, content.images[0].height), (4, 3));
    }

    #[test]
    fn test_images_only_has_no_text() {
        let content = extract_content(&[SourceDocument {
            file_name: "a.png".into(),
            data: png(),
        }]);
        assert!(!content.has_text);
        assert_eq!(content.images.len(), 1);
    }
}

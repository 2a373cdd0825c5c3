//! Image validation plus visual question answering and OCR through the
//! Hugging Face Inference API.

use base64::Engine as _;
use image::GenericImageView;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use ai_agent_core::{Error, Result};

use crate::huggingface::{first_field, HuggingFaceClient};

/// Information about an image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Image format (Png, Jpeg, ...).
    pub format: String,
    pub size_bytes: usize,
}

/// Decode the image to check it is well formed and read its dimensions.
pub fn validate_image(image_data: &[u8]) -> Result<ImageInfo> {
    let img = image::load_from_memory(image_data)
        .map_err(|e| Error::invalid_request(format!("Invalid image: {}", e)))?;

    let (width, height) = img.dimensions();
    let format = image::guess_format(image_data)
        .map(|f| format!("{:?}", f))
        .unwrap_or_else(|_| "unknown".to_string());

    Ok(ImageInfo {
        width,
        height,
        format,
        size_bytes: image_data.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionTask {
    Vqa,
    Ocr,
}

impl VisionTask {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "vqa" => Ok(Self::Vqa),
            "ocr" => Ok(Self::Ocr),
            other => Err(Error::invalid_request(format!(
                "Unknown vision task '{}'. Use vqa or ocr",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VqaAnswer {
    pub answer: String,
    pub question: String,
    pub image: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OcrText {
    pub text: String,
    pub image: String,
    pub model: String,
}

pub struct VisionTool {
    huggingface: HuggingFaceClient,
    vqa_model: String,
    ocr_model: String,
}

impl VisionTool {
    pub fn new(huggingface: HuggingFaceClient, vqa_model: impl Into<String>, ocr_model: impl Into<String>) -> Self {
        Self {
            huggingface,
            vqa_model: vqa_model.into(),
            ocr_model: ocr_model.into(),
        }
    }

    async fn load(path: &Path) -> Result<(Vec<u8>, ImageInfo)> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|_| Error::not_found(format!("Image not found: {}", path.display())))?;
        let info = validate_image(&data)?;
        Ok((data, info))
    }

    pub async fn answer_question(&self, path: &Path, question: &str) -> Result<VqaAnswer> {
        if question.trim().is_empty() {
            return Err(Error::invalid_request("A question is required for VQA"));
        }
        let (data, info) = Self::load(path).await?;
        tracing::info!(model = %self.vqa_model, width = info.width, height = info.height, "Running VQA");

        let body = json!({
            "inputs": {
                "image": base64::engine::general_purpose::STANDARD.encode(&data),
                "question": question
            }
        });
        let response = self.huggingface.post_json(&self.vqa_model, &body).await?;
        let answer = first_field(&response, "answer")
            .ok_or_else(|| Error::upstream("Hugging Face", "Response contained no answer"))?;

        Ok(VqaAnswer {
            answer,
            question: question.to_string(),
            image: path.display().to_string(),
            model: self.vqa_model.clone(),
        })
    }

    pub async fn extract_text(&self, path: &Path) -> Result<OcrText> {
        let (data, info) = Self::load(path).await?;
        tracing::info!(model = %self.ocr_model, format = %info.format, "Running OCR");

        let content_type = match info.format.as_str() {
            "Png" => "image/png",
            "Jpeg" => "image/jpeg",
            "Gif" => "image/gif",
            "WebP" => "image/webp",
            _ => "application/octet-stream",
        };
        let response = self.huggingface.post_bytes(&self.ocr_model, data, content_type).await?;
        let text = first_field(&response, "generated_text")
            .ok_or_else(|| Error::upstream("Hugging Face", "Response contained no generated_text"))?;

        Ok(OcrText {
            text,
            image: path.display().to_string(),
            model: self.ocr_model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_agent_core::config::HuggingFaceConfig;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::time::Duration;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_validate_image() {
        let info = validate_image(&png(4, 3)).unwrap();
        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!(info.format, "Png");

        assert!(validate_image(b"not an image").unwrap_err().is_client_error());
    }

    #[test]
    fn test_parse_task() {
        assert_eq!(VisionTask::parse("OCR").unwrap(), VisionTask::Ocr);
        assert!(VisionTask::parse("caption").is_err());
    }

    #[tokio::test]
    async fn test_missing_image_is_not_found() {
        let hf = HuggingFaceClient::new(&HuggingFaceConfig::default(), Duration::from_secs(1));
        let tool = VisionTool::new(hf, "vqa", "ocr");
        let err = tool.extract_text(Path::new("/nonexistent/a.png")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_vqa_requires_question() {
        let hf = HuggingFaceClient::new(&HuggingFaceConfig::default(), Duration::from_secs(1));
        let tool = VisionTool::new(hf, "vqa", "ocr");
        let err = tool.answer_question(Path::new("a.png"), " ").await.unwrap_err();
        assert!(err.is_client_error());
    }
}

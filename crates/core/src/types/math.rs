use serde::{Deserialize, Serialize};

/// Image attached to a Wolfram|Alpha pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathImage {
    pub url: String,
    pub alt: String,
    /// Title of the pod the image came from.
    pub title: String,
}

/// Result of a symbolic computation.
///
/// Failures are carried as `success = false` with the reason in
/// `text_results`; computing never raises.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MathResult {
    pub text_results: Vec<String>,
    pub images: Vec<MathImage>,
    pub plots: Vec<MathImage>,
    pub success: bool,
}

impl MathResult {
    /// A failed computation with a single message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            text_results: vec![message.into()],
            images: Vec::new(),
            plots: Vec::new(),
            success: false,
        }
    }

    /// Plain-text rendering used in chat replies.
    pub fn summary_text(&self) -> String {
        let mut out = self.text_results.join("\n");
        if !self.plots.is_empty() {
            out.push_str(&format!("\n\n[{} plot(s) available]", self.plots.len()));
        }
        if !self.images.is_empty() {
            out.push_str(&format!("\n[{} image(s) available]", self.images.len()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text() {
        let result = MathResult {
            text_results: vec!["Input: 2+2".into(), "Result: 4".into()],
            images: vec![],
            plots: vec![MathImage {
                url: "http://img".into(),
                alt: "plot".into(),
                title: "Plot".into(),
            }],
            success: true,
        };
        let text = result.summary_text();
        assert!(text.starts_with("Input: 2+2\nResult: 4"));
        assert!(text.contains("[1 plot(s) available]"));
        assert!(!text.contains("image(s)"));
    }
}

//! Fixed local directories for uploaded and generated files.
//!
//! Directory listings are the only catalog; nothing is indexed.

use std::path::{Path, PathBuf};

use ai_agent_core::{config::StorageConfig, Error, Result};

#[derive(Debug, Clone)]
pub struct FileStore {
    pub upload_dir: PathBuf,
    pub charts_dir: PathBuf,
    pub output_dir: PathBuf,
    pub slides_dir: PathBuf,
}

impl FileStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            charts_dir: PathBuf::from(&config.charts_dir),
            output_dir: PathBuf::from(&config.output_dir),
            slides_dir: PathBuf::from(&config.slides_dir),
        }
    }

    /// All directories rooted under `root`. Used by tests.
    pub fn under(root: &Path) -> Self {
        Self {
            upload_dir: root.join("uploads"),
            charts_dir: root.join("charts"),
            output_dir: root.join("output"),
            slides_dir: root.join("slides"),
        }
    }

    /// Create every directory if missing.
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.charts_dir, &self.output_dir, &self.slides_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::storage(format!("Cannot create {}: {}", dir.display(), e)))?;
        }
        Ok(())
    }

    /// Save an uploaded file under its sanitized name and return the path.
    pub async fn save_upload(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let name = sanitize_file_name(file_name)
            .ok_or_else(|| Error::invalid_request(format!("Invalid file name: {}", file_name)))?;
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(name);
        tokio::fs::write(&path, data).await?;
        tracing::debug!(path = %path.display(), size = data.len(), "Upload saved");
        Ok(path)
    }

    /// Write generated bytes into the output directory.
    pub async fn save_output(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Resolve a client-supplied upload path to an existing file in the
    /// upload directory. Only the final path component is honored.
    pub async fn resolve_upload(&self, path: &str) -> Result<PathBuf> {
        let name = sanitize_file_name(path)
            .ok_or_else(|| Error::invalid_request(format!("Invalid file path: {}", path)))?;
        let resolved = self.upload_dir.join(name);
        if tokio::fs::try_exists(&resolved).await.unwrap_or(false) {
            Ok(resolved)
        } else {
            Err(Error::not_found(format!("File not found: {}", path)))
        }
    }

    /// Path of a chart by bare file name, if it exists.
    pub async fn chart_path(&self, file_name: &str) -> Option<PathBuf> {
        let name = sanitize_file_name(file_name)?;
        let path = self.charts_dir.join(name);
        tokio::fs::try_exists(&path)
            .await
            .ok()
            .filter(|exists| *exists)
            .map(|_| path)
    }

    /// Names of the PNG charts generated so far.
    pub async fn list_charts(&self) -> Result<Vec<String>> {
        list_files(&self.charts_dir, "png").await
    }
}

/// File names in `dir` with the given extension, sorted.
pub async fn list_files(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Strip directory components; reject empty and dot-only names.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = Path::new(name).file_name()?.to_str()?.trim();
    if base.is_empty() || base.chars().all(|c| c == '.') {
        return None;
    }
    Some(base.to_string())
}

/// Filesystem-safe fragment of a prompt: alphanumerics, spaces, `-` and `_`,
/// spaces replaced with `_`, capped at `max_chars`.
pub fn safe_prompt_fragment(prompt: &str, max_chars: usize) -> String {
    prompt
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .take(max_chars)
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("data.csv").as_deref(), Some("data.csv"));
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn test_safe_prompt_fragment() {
        assert_eq!(safe_prompt_fragment("A cat, on a mat!", 50), "A_cat_on_a_mat");
        assert_eq!(safe_prompt_fragment("abcdef", 3), "abc");
    }

    #[tokio::test]
    async fn test_save_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::under(dir.path());
        store.ensure_dirs().await.unwrap();

        let path = store.save_upload("../sales.csv", b"a,b\n1,2\n").await.unwrap();
        assert_eq!(path, dir.path().join("uploads").join("sales.csv"));

        tokio::fs::write(store.charts_dir.join("chart_bar_1.png"), b"png").await.unwrap();
        tokio::fs::write(store.charts_dir.join("notes.txt"), b"x").await.unwrap();
        assert_eq!(store.list_charts().await.unwrap(), vec!["chart_bar_1.png"]);
        assert!(store.chart_path("chart_bar_1.png").await.is_some());
        assert!(store.chart_path("missing.png").await.is_none());

        assert_eq!(store.resolve_upload("uploads/sales.csv").await.unwrap(), path);
        assert!(matches!(
            store.resolve_upload("uploads/nope.csv").await,
            Err(Error::NotFound(_))
        ));
    }
}

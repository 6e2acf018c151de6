//! Where course documents come from.
//!
//! A course directory holds one sub-directory per language variant, each
//! with a `template.json` (UI configuration) and a `toc.json` (structure).

use async_trait::async_trait;
use course_core::model::{CourseDocument, DocumentLoadError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const TEMPLATE_FILE: &str = "template.json";
pub const TOC_FILE: &str = "toc.json";

/// Loads one language variant of a course.
#[async_trait]
pub trait CourseSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `DocumentLoadError::Unreachable` if the resources cannot be
    /// read, `Malformed` or `Invalid` if they do not describe a course.
    async fn load_document(&self, language: &str) -> Result<CourseDocument, DocumentLoadError>;
}

/// Reads `<root>/<language>/{template,toc}.json` from disk.
#[derive(Debug, Clone)]
pub struct FileCourseSource {
    root: PathBuf,
}

impl FileCourseSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Language codes that have a sub-directory under the course root.
    ///
    /// # Errors
    ///
    /// Returns `DocumentLoadError::Unreachable` if the root cannot be listed.
    pub async fn variants(&self) -> Result<Vec<String>, DocumentLoadError> {
        let unreachable = |e: std::io::Error| {
            DocumentLoadError::Unreachable(format!("{}: {e}", self.root.display()))
        };
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(unreachable)?;
        let mut languages = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unreachable)? {
            let toc = entry.path().join(TOC_FILE);
            if tokio::fs::try_exists(&toc).await.unwrap_or(false) {
                languages.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        languages.sort();
        Ok(languages)
    }

    async fn read(&self, language: &str, file: &str) -> Result<String, DocumentLoadError> {
        let path = self.root.join(language).join(file);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DocumentLoadError::Unreachable(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl CourseSource for FileCourseSource {
    async fn load_document(&self, language: &str) -> Result<CourseDocument, DocumentLoadError> {
        if language.trim().is_empty() || language.contains(['/', '\\', '.']) {
            return Err(DocumentLoadError::Unreachable(format!(
                "invalid language code: {language:?}"
            )));
        }
        let template = self.read(language, TEMPLATE_FILE).await?;
        let toc = self.read(language, TOC_FILE).await?;
        let document = CourseDocument::from_json(language, &template, &toc)?;
        log::info!(
            "loaded course {} ({language}) with {} pages from {}",
            document.id(),
            document.page_count(),
            self.root.display()
        );
        Ok(document)
    }
}

/// Course variants held in memory, keyed by language code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCourseSource {
    variants: HashMap<String, (String, String)>,
}

impl InMemoryCourseSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_variant(
        mut self,
        language: impl Into<String>,
        template_json: impl Into<String>,
        toc_json: impl Into<String>,
    ) -> Self {
        self.variants
            .insert(language.into(), (template_json.into(), toc_json.into()));
        self
    }
}

#[async_trait]
impl CourseSource for InMemoryCourseSource {
    async fn load_document(&self, language: &str) -> Result<CourseDocument, DocumentLoadError> {
        let (template, toc) = self
            .variants
            .get(language)
            .ok_or_else(|| DocumentLoadError::Unreachable(format!("no variant for {language}")))?;
        CourseDocument::from_json(language, template, toc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{ "CourseName": "Demo" }"#;
    const TOC: &str = r#"{
        "id": "demo",
        "title": "Demo",
        "topics": [{ "id": "t1", "title": "T", "pages": [
            { "id": "p1", "title": "Welcome", "template": "landing" }
        ]}]
    }"#;

    #[tokio::test]
    async fn in_memory_source_serves_known_variants() {
        let source = InMemoryCourseSource::new().with_variant("en", TEMPLATE, TOC);
        let doc = source.load_document("en").await.unwrap();
        assert_eq!(doc.language(), "en");

        let err = source.load_document("fr").await.unwrap_err();
        assert!(matches!(err, DocumentLoadError::Unreachable(_)));
    }

    #[tokio::test]
    async fn malformed_variant_is_reported() {
        let source = InMemoryCourseSource::new().with_variant("en", TEMPLATE, "{");
        let err = source.load_document("en").await.unwrap_err();
        assert!(matches!(err, DocumentLoadError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_directory_is_unreachable() {
        let source = FileCourseSource::new("does/not/exist");
        let err = source.load_document("en").await.unwrap_err();
        assert!(matches!(err, DocumentLoadError::Unreachable(_)));
    }

    #[tokio::test]
    async fn path_like_language_codes_are_refused() {
        let source = FileCourseSource::new(".");
        let err = source.load_document("../etc").await.unwrap_err();
        assert!(matches!(err, DocumentLoadError::Unreachable(_)));
    }
}

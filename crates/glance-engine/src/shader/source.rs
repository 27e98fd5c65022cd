use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::error::SourceReadError;

/// Shader source text plus the identifier it was loaded from.
///
/// Immutable once created; cloning shares the text.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    origin: Arc<str>,
    text: Arc<str>,
}

impl ShaderSource {
    /// Reads the whole file at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, SourceReadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SourceReadError::new(path, e))?;
        log::trace!("read shader source {} ({} bytes)", path.display(), text.len());

        Ok(Self {
            origin: path.display().to_string().into(),
            text: text.into(),
        })
    }

    /// Wraps text that did not come from the filesystem (embedded sources, tests).
    pub fn from_text(origin: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders").join(name)
    }

    #[test]
    fn reads_fixture_file() {
        let src = ShaderSource::read(fixture("triangle.vs")).unwrap();
        assert!(src.text().starts_with("#version 450"));
        assert!(src.origin().ends_with("triangle.vs"));
    }

    #[test]
    fn missing_file_reports_path_and_cause() {
        let err = ShaderSource::read("invalid/vertex/shader/path").unwrap_err();
        assert_eq!(err.path, Path::new("invalid/vertex/shader/path"));
        assert_eq!(err.cause.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn directory_is_not_readable_as_source() {
        assert!(ShaderSource::read(fixture("")).is_err());
    }

    #[test]
    fn clones_share_text() {
        let a = ShaderSource::from_text("inline", "void main() {}");
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.text, &b.text));
        assert_eq!(a, b);
    }
}

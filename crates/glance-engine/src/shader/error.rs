use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use super::context::StageKind;

/// A shader source text could not be read.
#[derive(Debug)]
pub struct SourceReadError {
    /// Identifier the source was requested under.
    pub path: PathBuf,
    pub cause: io::Error,
}

impl SourceReadError {
    pub(crate) fn new(path: impl Into<PathBuf>, cause: io::Error) -> Self {
        Self { path: path.into(), cause }
    }
}

impl fmt::Display for SourceReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to read shader source `{}`: {}",
            self.path.display(),
            self.cause
        )
    }
}

impl Error for SourceReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

/// Errors that abort shader program construction.
///
/// `Compile` and `Link` are only produced under [`FailurePolicy::Reject`];
/// the default policy reports those failures and still returns a program.
///
/// [`FailurePolicy::Reject`]: super::FailurePolicy::Reject
#[derive(Debug)]
pub enum ShaderError {
    SourceRead(SourceReadError),
    Compile { stage: StageKind, log: String },
    Link { log: String },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRead(err) => write!(f, "{err}"),
            Self::Compile { stage, log } => {
                write!(f, "{stage} shader failed to compile")?;
                if !log.is_empty() {
                    write!(f, ":\n{log}")?;
                }
                Ok(())
            }
            Self::Link { log } => {
                write!(f, "shader program failed to link")?;
                if !log.is_empty() {
                    write!(f, ":\n{log}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ShaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SourceRead(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceReadError> for ShaderError {
    fn from(err: SourceReadError) -> Self {
        Self::SourceRead(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_read_error_keeps_cause() {
        let err = SourceReadError::new(
            "missing.vs",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.cause.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("missing.vs"));

        let err = ShaderError::from(err);
        let cause = err.source().and_then(|e| e.source());
        assert!(cause.is_some_and(|c| c.to_string() == "no such file"));
    }

    #[test]
    fn compile_error_display_includes_log() {
        let err = ShaderError::Compile {
            stage: StageKind::Fragment,
            log: "expected `;`".into(),
        };
        let text = err.to_string();
        assert!(text.starts_with("fragment shader failed to compile"));
        assert!(text.ends_with("expected `;`"));
    }

    #[test]
    fn link_error_without_log() {
        let err = ShaderError::Link { log: String::new() };
        assert_eq!(err.to_string(), "shader program failed to link");
    }
}

//! Info log retrieval shared by the compile and link checks.

use super::context::InfoLog;

/// Where a diagnostic came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DiagnosticOrigin {
    Compile(super::StageKind),
    Link,
}

/// The queried log length disagreed with the number of characters written.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LengthMismatch {
    /// Length reported by the length query, terminator included.
    pub expected: usize,
    /// Characters reported by the fetch, terminator excluded.
    pub written: usize,
}

/// A compile or link failure reported while building a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub origin: DiagnosticOrigin,
    /// Id of the stage or program object the log belongs to.
    pub object: u32,
    pub log: String,
    pub length_mismatch: Option<LengthMismatch>,
}

/// A log obtained through [`retrieve`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RetrievedLog {
    pub text: String,
    pub length_mismatch: Option<LengthMismatch>,
}

/// Queries the log length and, when non-zero, fetches the log.
///
/// A fetch whose `written + 1` does not match the queried length is tolerated
/// but warned about, since the text may be scrambled.
pub(crate) fn retrieve(
    query_length: impl FnOnce() -> usize,
    fetch: impl FnOnce(usize) -> InfoLog,
) -> Option<RetrievedLog> {
    let expected = query_length();
    if expected == 0 {
        return None;
    }

    let InfoLog { text, written } = fetch(expected);

    let length_mismatch = (written + 1 != expected).then(|| {
        log::warn!(
            "unexpected info log length {written} (expected {expected}); log might be scrambled"
        );
        LengthMismatch { expected, written }
    });

    Some(RetrievedLog {
        text,
        length_mismatch,
    })
}

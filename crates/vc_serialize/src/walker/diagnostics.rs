use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::walker::{ElementError, ElementPath};

/// How serious an [`Issue`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// Category of an [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    UnknownType,
    TypeMismatch,
    CastFailed,
    FutureVersion,
    ConverterPolicyViolation,
    ConversionLoop,
    MissingFactory,
    LeafData,
    Structure,
    StoreRejected,
    Discarded,
}

impl IssueKind {
    /// Policy violations and unreadable data are errors, the rest warnings.
    pub fn severity(self) -> Severity {
        match self {
            Self::FutureVersion | Self::ConverterPolicyViolation | Self::ConversionLoop => {
                Severity::Error
            }
            _ => Severity::Warning,
        }
    }
}

/// One recoverable problem met during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    /// Element trail, such as `Scene.shapes[2].radius`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Collects the issues of one top-level operation.
///
/// Every issue is logged as it is pushed, so callers that only want the
/// overall result can ignore the collection.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Warning => log::warn!("{issue}"),
            Severity::Error => log::error!("{issue}"),
        }
        self.issues.push(issue);
    }

    /// Records `error` at `path`.
    pub fn report(&mut self, path: &ElementPath, error: &ElementError) {
        let kind = error.kind();
        self.push(Issue {
            severity: kind.severity(),
            kind,
            path: path.to_string(),
            message: error.to_string(),
        });
    }

    #[inline]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn clear(&mut self) {
        self.issues.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostics, IssueKind, Severity};
    use crate::walker::{ElementError, ElementPath};

    #[test]
    fn severity_follows_the_error_kind() {
        let mut path = ElementPath::new();
        path.push_field("Foo");
        let mut diagnostics = Diagnostics::new();

        diagnostics.report(&path, &ElementError::UnknownType { type_id: uuid::Uuid::nil() });
        assert!(!diagnostics.has_errors());

        diagnostics.report(
            &path,
            &ElementError::FutureVersion {
                type_id: uuid::Uuid::nil(),
                found: 9,
                max: 1,
            },
        );
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.count(IssueKind::UnknownType), 1);
        assert_eq!(diagnostics.issues()[1].severity, Severity::Error);
        assert_eq!(diagnostics.issues()[0].path, "Foo");
    }
}

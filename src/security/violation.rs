//! Typed reasons for rejecting source before compilation.

use std::fmt;

use super::policy::Capability;

/// Why the gate rejected a piece of source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// Source was empty or whitespace only
    EmptyInput,
    /// Source is longer than the policy allows
    TooLong { length: usize, limit: usize },
    /// Source references a primitive of a denied category
    CapabilityDenied { capability: Capability, symbol: String },
    /// Too many visibility qualifiers for the policy
    ComplexityExceeded { found: usize, limit: usize },
    /// Obfuscation heuristics or hidden code in comments
    SuspiciousStructure,
    /// Blacklisted import declaration
    DangerousImport { import: String },
    /// Blacklisted call site (`symbol(`)
    DangerousCall { method: String },
    /// Source matched a dangerous pattern
    DangerousPattern { pattern: String },
}

impl ViolationKind {
    /// Stable short label, used as a structured log field.
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::EmptyInput => "empty_input",
            ViolationKind::TooLong { .. } => "too_long",
            ViolationKind::CapabilityDenied { .. } => "capability_denied",
            ViolationKind::ComplexityExceeded { .. } => "complexity_exceeded",
            ViolationKind::SuspiciousStructure => "suspicious_structure",
            ViolationKind::DangerousImport { .. } => "dangerous_import",
            ViolationKind::DangerousCall { .. } => "dangerous_call",
            ViolationKind::DangerousPattern { .. } => "dangerous_pattern",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::EmptyInput => write!(f, "empty input"),
            ViolationKind::TooLong { length, limit } => {
                write!(f, "source too long ({length} > {limit})")
            }
            ViolationKind::CapabilityDenied { capability, symbol } => {
                write!(f, "{capability} capability denied ({symbol})")
            }
            ViolationKind::ComplexityExceeded { found, limit } => {
                write!(f, "complexity exceeded ({found} > {limit})")
            }
            ViolationKind::SuspiciousStructure => write!(f, "suspicious structure"),
            ViolationKind::DangerousImport { import } => write!(f, "dangerous import ({import})"),
            ViolationKind::DangerousCall { method } => write!(f, "dangerous call ({method})"),
            ViolationKind::DangerousPattern { pattern } => {
                write!(f, "dangerous pattern ({pattern})")
            }
        }
    }
}

/// A rejection verdict. Building one means the source is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct Violation {
    pub kind: ViolationKind,
    pub detail: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub(crate) fn empty_input() -> Self {
        Self::new(ViolationKind::EmptyInput, "Source code cannot be null or empty")
    }
}

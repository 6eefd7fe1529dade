//! Policy-driven static validation of raw source text.
//!
//! This is a lexical scan, not semantic analysis. It cannot see through
//! aliasing, string building, or comments that reconstruct a forbidden
//! symbol at runtime.

use std::sync::{Arc, LazyLock};

use super::policy::{Capability, PolicyConfig};
use super::symbols::{CompiledSymbols, SymbolTable};
use super::violation::{Violation, ViolationKind};

/// Tokens counted as a proxy for member count.
const VISIBILITY_QUALIFIERS: [&str; 3] = ["public ", "private ", "protected "];

static BUILTIN_SYMBOLS: LazyLock<Arc<CompiledSymbols>> = LazyLock::new(|| {
    Arc::new(
        SymbolTable::builtin()
            .compile()
            .expect("builtin symbol table compiles"),
    )
});

/// Validate `source` against `policy` using the built-in symbol table.
pub fn validate(source: &str, policy: &PolicyConfig) -> Result<(), Violation> {
    StaticValidator::new().validate(source, policy)
}

/// Checks source against a [`PolicyConfig`], first failure wins.
#[derive(Debug, Clone)]
pub struct StaticValidator {
    symbols: Arc<CompiledSymbols>,
}

impl StaticValidator {
    pub fn new() -> Self {
        Self {
            symbols: Arc::clone(&BUILTIN_SYMBOLS),
        }
    }

    /// Build a validator over a custom symbol table.
    pub fn with_symbols(table: &SymbolTable) -> Result<Self, aho_corasick::BuildError> {
        Ok(Self {
            symbols: Arc::new(table.compile()?),
        })
    }

    pub fn validate(&self, source: &str, policy: &PolicyConfig) -> Result<(), Violation> {
        if source.trim().is_empty() {
            return Err(Violation::empty_input());
        }

        if !policy.enable_validation() {
            return Ok(());
        }

        let length = source.chars().count();
        if length > policy.max_source_length() {
            return Err(Violation::new(
                ViolationKind::TooLong {
                    length,
                    limit: policy.max_source_length(),
                },
                format!(
                    "Source code exceeds maximum allowed length: {}",
                    policy.max_source_length()
                ),
            ));
        }

        for capability in policy.denied_capabilities() {
            if let Some(symbol) = self.symbols.find(capability, source) {
                return Err(Violation::new(
                    ViolationKind::CapabilityDenied {
                        capability,
                        symbol: symbol.to_string(),
                    },
                    format!(
                        "{} operations are not allowed: {symbol}",
                        capability_title(capability)
                    ),
                ));
            }
        }

        let found = complexity(source);
        if found > policy.max_complexity() {
            return Err(Violation::new(
                ViolationKind::ComplexityExceeded {
                    found,
                    limit: policy.max_complexity(),
                },
                format!(
                    "Code complexity exceeds maximum allowed: {} methods (found: {found})",
                    policy.max_complexity()
                ),
            ));
        }

        Ok(())
    }
}

impl Default for StaticValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Literal, non-overlapping count of visibility qualifiers.
///
/// Qualifiers inside string literals and comments are counted too.
pub fn complexity(source: &str) -> usize {
    VISIBILITY_QUALIFIERS
        .iter()
        .map(|q| source.matches(q).count())
        .sum()
}

fn capability_title(capability: Capability) -> &'static str {
    match capability {
        Capability::File => "File",
        Capability::Network => "Network",
        Capability::Introspection => "Reflection",
        Capability::Process => "System",
        Capability::Database => "Database",
    }
}

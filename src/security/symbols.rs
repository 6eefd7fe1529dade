//! Per-capability symbol lists consulted by the policy validator.
//!
//! The lists are plain data keyed by [`Capability`]; extending a policy means
//! adding symbols here, not touching validator code.

use aho_corasick::{AhoCorasick, MatchKind};
use std::collections::BTreeMap;

use super::policy::Capability;

const FILE_SYMBOLS: &[&str] = &[
    "java.io.File",
    "java.nio.file.Files",
    "java.nio.file.Paths",
    "FileInputStream",
    "FileOutputStream",
    "FileReader",
    "FileWriter",
];

const NETWORK_SYMBOLS: &[&str] = &[
    "java.net.Socket",
    "java.net.URL",
    "java.net.URLConnection",
    "java.net.HttpURLConnection",
    "java.net.ServerSocket",
];

const INTROSPECTION_SYMBOLS: &[&str] = &[
    "java.lang.reflect",
    "Class.forName",
    "getDeclaredMethod",
    "getMethod",
    "invoke",
    "getDeclaredField",
    "getField",
    "setAccessible",
    "newInstance",
];

const PROCESS_SYMBOLS: &[&str] = &[
    "Runtime.getRuntime",
    "ProcessBuilder",
    "System.exit",
    "System.halt",
    "System.gc",
    "System.runFinalization",
];

const DATABASE_SYMBOLS: &[&str] = &[
    "java.sql.Connection",
    "java.sql.DriverManager",
    "java.sql.Statement",
    "java.sql.PreparedStatement",
];

/// Mapping from capability to the substrings that reveal its use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<Capability, Vec<String>>,
}

impl SymbolTable {
    /// The built-in Java primitive lists.
    pub fn builtin() -> Self {
        let mut symbols = BTreeMap::new();
        for capability in Capability::ALL {
            let list = match capability {
                Capability::File => FILE_SYMBOLS,
                Capability::Network => NETWORK_SYMBOLS,
                Capability::Introspection => INTROSPECTION_SYMBOLS,
                Capability::Process => PROCESS_SYMBOLS,
                Capability::Database => DATABASE_SYMBOLS,
            };
            symbols.insert(capability, list.iter().map(|s| (*s).to_string()).collect());
        }
        Self { symbols }
    }

    /// A table with no symbols at all.
    pub fn empty() -> Self {
        Self {
            symbols: BTreeMap::new(),
        }
    }

    /// Add symbols to a category. Blank and duplicate symbols are ignored.
    pub fn with_symbols<I, S>(mut self, capability: Capability, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.symbols.entry(capability).or_default();
        for symbol in extra {
            let symbol = symbol.into();
            if !symbol.trim().is_empty() && !list.contains(&symbol) {
                list.push(symbol);
            }
        }
        self
    }

    pub fn symbols(&self, capability: Capability) -> &[String] {
        self.symbols.get(&capability).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn compile(&self) -> Result<CompiledSymbols, aho_corasick::BuildError> {
        let mut matchers = Vec::with_capacity(self.symbols.len());
        for (capability, list) in &self.symbols {
            if list.is_empty() {
                continue;
            }
            let automaton = AhoCorasick::builder()
                .match_kind(MatchKind::Standard)
                .build(list)?;
            matchers.push(CategoryMatcher {
                capability: *capability,
                automaton,
                symbols: list.clone(),
            });
        }
        Ok(CompiledSymbols { matchers })
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::builtin()
    }
}

struct CategoryMatcher {
    capability: Capability,
    automaton: AhoCorasick,
    symbols: Vec<String>,
}

/// Symbol table compiled into one automaton per category.
pub(crate) struct CompiledSymbols {
    matchers: Vec<CategoryMatcher>,
}

impl CompiledSymbols {
    /// First symbol of `capability`, in table order, that occurs in `source`.
    pub(crate) fn find(&self, capability: Capability, source: &str) -> Option<&str> {
        let matcher = self.matchers.iter().find(|m| m.capability == capability)?;
        let first = matcher
            .automaton
            .find_overlapping_iter(source)
            .map(|m| m.pattern().as_usize())
            .min()?;
        matcher.symbols.get(first).map(String::as_str)
    }
}

impl std::fmt::Debug for CompiledSymbols {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSymbols")
            .field(
                "categories",
                &self.matchers.iter().map(|m| m.capability).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

//! Companion source screen: blacklisted imports, call sites, dangerous
//! patterns and obfuscation heuristics.
//!
//! Rules tagged with a [`Capability`] are skipped when the policy allows that
//! capability. Untagged rules always apply.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use super::policy::{Capability, PolicyConfig};
use super::violation::{Violation, ViolationKind};

/// A screen rule: the matched text and the capability it guards, if any.
type Rule = (&'static str, Option<Capability>);

const DANGEROUS_IMPORTS: &[Rule] = &[
    ("java.io.File", Some(Capability::File)),
    ("java.io.FileInputStream", Some(Capability::File)),
    ("java.io.FileOutputStream", Some(Capability::File)),
    ("java.nio.file.Files", Some(Capability::File)),
    ("java.nio.file.Paths", Some(Capability::File)),
    ("java.lang.Runtime", Some(Capability::Process)),
    ("java.lang.Process", Some(Capability::Process)),
    ("java.lang.ProcessBuilder", Some(Capability::Process)),
    ("java.lang.System", Some(Capability::Process)),
    ("java.net.Socket", Some(Capability::Network)),
    ("java.net.URL", Some(Capability::Network)),
    ("java.net.URLConnection", Some(Capability::Network)),
    ("java.sql.Connection", Some(Capability::Database)),
    ("java.sql.DriverManager", Some(Capability::Database)),
    ("java.util.Properties", None),
    ("java.lang.reflect.Method", Some(Capability::Introspection)),
    ("java.lang.reflect.Field", Some(Capability::Introspection)),
    ("java.lang.reflect.Constructor", Some(Capability::Introspection)),
    ("java.lang.Class", Some(Capability::Introspection)),
    ("java.lang.ClassLoader", Some(Capability::Introspection)),
    ("java.security.AccessController", None),
    ("java.security.PrivilegedAction", None),
];

const DANGEROUS_CALLS: &[Rule] = &[
    ("exec", Some(Capability::Process)),
    ("getRuntime", Some(Capability::Process)),
    ("exit", Some(Capability::Process)),
    ("halt", Some(Capability::Process)),
    ("gc", Some(Capability::Process)),
    ("runFinalization", Some(Capability::Process)),
    ("loadLibrary", Some(Capability::Process)),
    ("load", Some(Capability::Process)),
    ("forName", Some(Capability::Introspection)),
    ("newInstance", Some(Capability::Introspection)),
    ("getDeclaredMethod", Some(Capability::Introspection)),
    ("getMethod", Some(Capability::Introspection)),
    ("invoke", Some(Capability::Introspection)),
    ("setAccessible", Some(Capability::Introspection)),
    ("getDeclaredField", Some(Capability::Introspection)),
    ("getField", Some(Capability::Introspection)),
    ("set", Some(Capability::Introspection)),
    ("get", Some(Capability::Introspection)),
    ("connect", Some(Capability::Network)),
    ("openConnection", Some(Capability::Network)),
    ("getInputStream", Some(Capability::Network)),
    ("getOutputStream", Some(Capability::Network)),
    ("delete", Some(Capability::File)),
    ("createNewFile", Some(Capability::File)),
    ("mkdir", Some(Capability::File)),
    ("mkdirs", Some(Capability::File)),
    ("renameTo", Some(Capability::File)),
    ("listFiles", Some(Capability::File)),
    ("list", Some(Capability::File)),
    ("walk", Some(Capability::File)),
    ("copy", Some(Capability::File)),
    ("move", Some(Capability::File)),
    ("deleteIfExists", Some(Capability::File)),
    ("createDirectories", Some(Capability::File)),
    ("createFile", Some(Capability::File)),
    ("write", Some(Capability::File)),
    ("readAllBytes", Some(Capability::File)),
    ("readAllLines", Some(Capability::File)),
];

const DANGEROUS_PATTERNS: &[Rule] = &[
    (r"Runtime\.getRuntime\(\)", Some(Capability::Process)),
    (r"ProcessBuilder", Some(Capability::Process)),
    (r"System\.exit", Some(Capability::Process)),
    (r"System\.halt", Some(Capability::Process)),
    (r"Class\.forName", Some(Capability::Introspection)),
    (r"ClassLoader", Some(Capability::Introspection)),
    (r"Method\.invoke", Some(Capability::Introspection)),
    (r"Field\.set", Some(Capability::Introspection)),
    (r"Field\.get", Some(Capability::Introspection)),
    (r"\bFiles\b", Some(Capability::File)),
    (r"\bPaths\b", Some(Capability::File)),
    (r"\bSocket\b", Some(Capability::Network)),
    (r"\bURL\b", Some(Capability::Network)),
    (r"\bURLConnection\b", Some(Capability::Network)),
    (r"\bConnection\b", Some(Capability::Database)),
    (r"\bDriverManager\b", Some(Capability::Database)),
    (r"\bProperties\b", None),
    (r"\beval\b", None),
    (r"\bscript\b", None),
    (r"\bjavascript\b", None),
    (r"\bvbscript\b", None),
];

/// Words inside a block comment that suggest hidden code.
const SUSPICIOUS_COMMENT_WORDS: &[&str] = &[
    "exec", "runtime", "process", "system", "file", "socket", "url", "class", "method", "field",
];

const JAVA_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "default", "break", "continue",
    "return", "try", "catch", "finally", "throw", "throws", "public", "private", "protected",
    "static", "final", "abstract", "synchronized", "volatile", "transient", "native", "class",
    "interface", "extends", "implements", "import", "package", "new", "this", "super",
    "instanceof", "void", "int", "long", "short", "byte", "char", "float", "double", "boolean",
    "true", "false", "null", "enum", "assert", "const", "goto",
];

const MAX_QUOTES: usize = 50;
const MAX_SHORT_IDENTIFIERS: usize = 10;

struct CompiledPattern {
    source: &'static str,
    regex: Regex,
    capability: Option<Capability>,
}

static COMPILED_PATTERNS: LazyLock<Vec<CompiledPattern>> = LazyLock::new(|| {
    DANGEROUS_PATTERNS
        .iter()
        .map(|(source, capability)| CompiledPattern {
            source,
            regex: RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .expect("builtin screen pattern compiles"),
            capability: *capability,
        })
        .collect()
});

/// Always-on lexical screen run after the policy validator.
#[derive(Debug, Clone, Copy)]
pub struct SourceScreen {
    policy: PolicyConfig,
}

impl SourceScreen {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    /// First violation found, if any. A policy with validation disabled
    /// skips every rule, untagged ones included; blank input is still rejected.
    pub fn screen(&self, source: &str) -> Result<(), Violation> {
        if source.trim().is_empty() {
            return Err(Violation::empty_input());
        }
        if !self.policy.enable_validation() {
            return Ok(());
        }

        self.check_imports(source)?;
        self.check_calls(source)?;
        self.check_patterns(source)?;
        check_structure(source)
    }

    fn applies(&self, capability: Option<Capability>) -> bool {
        capability.is_none_or(|c| !self.policy.allows(c))
    }

    fn check_imports(&self, source: &str) -> Result<(), Violation> {
        for line in source.lines() {
            let Some(declaration) = line.trim().strip_prefix("import ") else {
                continue;
            };
            let declaration = declaration.replace(';', "");
            let declaration = declaration.trim();
            for (import, capability) in DANGEROUS_IMPORTS {
                if self.applies(*capability) && declaration.contains(import) {
                    return Err(Violation::new(
                        ViolationKind::DangerousImport {
                            import: (*import).to_string(),
                        },
                        format!(
                            "Dangerous import detected: {declaration}. \
                             Import of {import} is not allowed for security reasons."
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_calls(&self, source: &str) -> Result<(), Violation> {
        for (method, capability) in DANGEROUS_CALLS {
            if self.applies(*capability) && source.contains(&format!("{method}(")) {
                return Err(Violation::new(
                    ViolationKind::DangerousCall {
                        method: (*method).to_string(),
                    },
                    format!(
                        "Dangerous method call detected: {method}. \
                         This method is not allowed for security reasons."
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_patterns(&self, source: &str) -> Result<(), Violation> {
        for pattern in COMPILED_PATTERNS.iter() {
            if self.applies(pattern.capability) && pattern.regex.is_match(source) {
                return Err(Violation::new(
                    ViolationKind::DangerousPattern {
                        pattern: pattern.source.to_string(),
                    },
                    format!(
                        "Dangerous pattern detected: {}. \
                         This pattern is not allowed for security reasons.",
                        pattern.source
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn check_structure(source: &str) -> Result<(), Violation> {
    if block_comments(source).any(has_suspicious_words) {
        return Err(Violation::new(
            ViolationKind::SuspiciousStructure,
            "Suspicious content detected in comments. Hidden code execution is not allowed.",
        ));
    }

    if source.matches('"').count() > MAX_QUOTES {
        return Err(Violation::new(
            ViolationKind::SuspiciousStructure,
            "Excessive string concatenation detected. This may indicate code obfuscation.",
        ));
    }

    let short = source
        .split_whitespace()
        .filter(|word| is_short_identifier(word))
        .count();
    if short > MAX_SHORT_IDENTIFIERS {
        return Err(Violation::new(
            ViolationKind::SuspiciousStructure,
            "Suspicious variable naming pattern detected. This may indicate code obfuscation.",
        ));
    }

    Ok(())
}

/// Bodies of every terminated `/* ... */` comment.
fn block_comments(source: &str) -> impl Iterator<Item = &str> {
    source
        .split("/*")
        .skip(1)
        .filter_map(|part| part.find("*/").map(|end| &part[..end]))
}

fn has_suspicious_words(comment: &str) -> bool {
    let lower = comment.to_lowercase();
    SUSPICIOUS_COMMENT_WORDS.iter().any(|w| lower.contains(w))
}

fn is_short_identifier(word: &str) -> bool {
    (1..=2).contains(&word.len())
        && word.bytes().all(|b| b.is_ascii_alphabetic())
        && !JAVA_KEYWORDS.contains(&word.to_ascii_lowercase().as_str())
}

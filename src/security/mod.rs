//! Static trust checks applied to plugin source before it is compiled.
//!
//! Two layers run in order and either can reject:
//!
//! - [`StaticValidator`]: policy-driven length, capability and complexity
//!   checks.
//! - [`SourceScreen`]: blacklisted imports, call sites, dangerous patterns and
//!   obfuscation heuristics.
//!
//! Both are best-effort lexical scans over raw text.

pub mod policy;
pub mod screen;
pub mod symbols;
pub mod validator;
pub mod violation;

pub use policy::{Capability, PolicyBuilder, PolicyConfig, PolicyError, PolicyPreset};
pub use screen::SourceScreen;
pub use symbols::SymbolTable;
pub use validator::StaticValidator;
pub use violation::{Violation, ViolationKind};

/// Both validation layers bound to one policy.
#[derive(Debug, Clone)]
pub struct SourceGate {
    policy: PolicyConfig,
    validator: StaticValidator,
    screen: SourceScreen,
}

impl SourceGate {
    pub fn new(policy: PolicyConfig) -> Self {
        Self::with_validator(policy, StaticValidator::new())
    }

    pub fn with_validator(policy: PolicyConfig, validator: StaticValidator) -> Self {
        Self {
            policy,
            validator,
            screen: SourceScreen::new(policy),
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Admit `source` or return the first violation found.
    pub fn admit(&self, source: &str) -> Result<(), Violation> {
        self.validator.validate(source, &self.policy)?;
        self.screen.screen(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPAWN: &str =
        r#"public class Spawn { public String run() { new ProcessBuilder("ls"); return "ok"; } }"#;

    #[test]
    fn policy_layer_reports_before_screen() {
        let err = SourceGate::new(PolicyConfig::strict()).admit(SPAWN).unwrap_err();
        assert_eq!(
            err.kind,
            ViolationKind::CapabilityDenied {
                capability: Capability::Process,
                symbol: "ProcessBuilder".into(),
            }
        );
    }

    #[test]
    fn screen_layer_can_reject_what_policy_admits() {
        let gate = SourceGate::new(PolicyConfig::permissive());
        let err = gate.admit("public class E { Object e = eval(1); }").unwrap_err();
        assert!(matches!(err.kind, ViolationKind::DangerousPattern { .. }));
    }

    #[test]
    fn permissive_admits_process_spawn() {
        assert_eq!(SourceGate::new(PolicyConfig::permissive()).admit(SPAWN), Ok(()));
    }
}

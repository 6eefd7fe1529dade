mod common;

use std::sync::Arc;
use std::thread;

use common::{init_tracing, write_source, FakeToolchain, SPAWN_SOURCE, SUM_SOURCE};
use dynaplug::{
    Capability, CompileError, PluginError, PluginRegistry, PluginService, PolicyConfig,
    ViolationKind,
};
use serde_json::json;

#[test]
fn strict_service_registers_and_invokes_sum() {
    init_tracing();
    let service = PluginService::new(FakeToolchain::new());
    let entry = service.compile_and_register("M", SUM_SOURCE).unwrap();
    assert_eq!(entry.name(), "m");
    assert_eq!(service.get("m").unwrap().as_ref(), Some(&entry));

    let result = service.invoke("m", "sum", &[json!(5), json!(3)]).unwrap();
    assert_eq!(result, Some(json!(8)));
}

#[test]
fn process_spawn_rejected_under_strict_before_compiling() {
    init_tracing();
    let toolchain = FakeToolchain::new();
    let service = PluginService::new(toolchain.clone());
    let err = service
        .compile_and_register("Spawner", SPAWN_SOURCE)
        .unwrap_err();
    match err {
        PluginError::Security(violation) => assert_eq!(
            violation.kind,
            ViolationKind::CapabilityDenied {
                capability: Capability::Process,
                symbol: "ProcessBuilder".into(),
            }
        ),
        other => panic!("expected a security violation, got {other:?}"),
    }
    assert_eq!(toolchain.calls(), 0);
    assert_eq!(service.size(), 0);
}

#[test]
fn process_spawn_registers_under_permissive() {
    let service = PluginService::with_policy(FakeToolchain::new(), PolicyConfig::permissive());
    let entry = service
        .compile_and_register("Spawner", SPAWN_SOURCE)
        .unwrap();
    assert_eq!(entry.name(), "spawner");
    assert!(service.contains("spawner").unwrap());
}

#[test]
fn missing_file_is_invalid_argument() {
    let dir = tempfile::tempdir().unwrap();
    let toolchain = FakeToolchain::new();
    let service = PluginService::new(toolchain.clone());
    let err = service
        .load_and_register(dir.path().join("Nope.java"))
        .unwrap_err();
    assert!(matches!(err, PluginError::InvalidArgument(_)));
    assert_eq!(toolchain.calls(), 0);
}

#[test]
fn load_and_register_screens_file_text() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let toolchain = FakeToolchain::new();
    let service = PluginService::new(toolchain.clone());

    let bad = write_source(dir.path(), "Spawner.java", SPAWN_SOURCE);
    assert!(matches!(
        service.load_and_register(&bad),
        Err(PluginError::Security(_))
    ));
    assert_eq!(toolchain.calls(), 0);

    let good = write_source(dir.path(), "MathPlugin.java", SUM_SOURCE);
    let entry = service.load_and_register(&good).unwrap();
    assert_eq!(entry.name(), "mathPlugin");
    assert_eq!(entry.class_name(), "MathPlugin");
}

#[test]
fn load_does_not_register() {
    let dir = tempfile::tempdir().unwrap();
    let service = PluginService::new(FakeToolchain::new());
    let path = write_source(dir.path(), "Loose.java", SUM_SOURCE);
    let entry = service.load(&path).unwrap();
    assert_eq!(entry.name(), "loose");
    assert_eq!(service.size(), 0);
    assert_eq!(service.get("loose").unwrap(), None);
}

#[test]
fn compile_errors_leave_registry_untouched() {
    let service = PluginService::new(FakeToolchain::new());
    let err = service
        .compile_and_register("Broken", "public class Broken { int x }")
        .unwrap_err();
    assert!(matches!(
        err,
        PluginError::Compile(CompileError::Rejected { ref unit, .. }) if unit == "Broken"
    ));
    assert!(service.list().is_empty());
}

#[test]
fn re_registration_replaces_previous_entry() {
    let service = PluginService::new(FakeToolchain::new());
    let first = service.compile_and_register("M", SUM_SOURCE).unwrap();
    let second = service.compile_and_register("M", SUM_SOURCE).unwrap();
    assert_ne!(first, second);
    assert_eq!(service.size(), 1);
    assert_eq!(service.get("m").unwrap(), Some(second));
}

#[test]
fn services_share_a_registry() {
    let registry = PluginRegistry::shared();
    let strict = PluginService::with_registry(
        FakeToolchain::new(),
        Arc::clone(&registry),
        PolicyConfig::strict(),
    );
    let permissive = PluginService::with_registry(
        FakeToolchain::new(),
        Arc::clone(&registry),
        PolicyConfig::permissive(),
    );

    permissive
        .compile_and_register("Spawner", SPAWN_SOURCE)
        .unwrap();
    assert!(strict.contains("spawner").unwrap());
    assert!(Arc::ptr_eq(strict.registry(), permissive.registry()));

    strict.remove("spawner").unwrap();
    assert_eq!(permissive.size(), 0);
}

#[test]
fn clearing_one_registry_leaves_another_alone() {
    let a = PluginService::new(FakeToolchain::new());
    let b = PluginService::new(FakeToolchain::new());
    a.compile_and_register("M", SUM_SOURCE).unwrap();
    b.compile_and_register("M", SUM_SOURCE).unwrap();

    a.clear();
    assert_eq!(a.size(), 0);
    assert_eq!(b.size(), 1);
    assert!(b.contains("m").unwrap());
}

#[test]
fn concurrent_registrations_through_one_service() {
    init_tracing();
    let service = Arc::new(PluginService::with_policy(
        FakeToolchain::new(),
        PolicyConfig::moderate(),
    ));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for i in 0..10 {
                    let class = format!("Plugin{t}x{i}");
                    let source = format!("public class {class} {{}}");
                    service.compile_and_register(&class, &source).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(service.size(), 80);
    assert!(service.contains("plugin3x7").unwrap());
}

#[test]
fn disabled_validation_accepts_anything() {
    let policy = PolicyConfig::strict()
        .to_builder()
        .enable_validation(false)
        .build()
        .unwrap();
    let service = PluginService::with_policy(FakeToolchain::new(), policy);
    let source = "import java.lang.Runtime;\npublic class Shell { void x() { Runtime.getRuntime().exec(\"sh\"); } }";
    let entry = service.compile_and_register("Shell", source).unwrap();
    assert_eq!(entry.name(), "shell");
}

#[test]
fn invoke_unknown_plugin_is_none() {
    let service = PluginService::new(FakeToolchain::new());
    assert_eq!(service.invoke("ghost", "sum", &[]).unwrap(), None);
}

#[test]
fn invoke_unknown_operation_is_an_error() {
    let service = PluginService::new(FakeToolchain::new());
    service.compile_and_register("M", SUM_SOURCE).unwrap();
    let err = service.invoke("m", "product", &[json!(2)]).unwrap_err();
    assert!(matches!(err, PluginError::Invoke(_)));
}

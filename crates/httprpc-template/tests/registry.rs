//! Modifier registry configuration and the process-wide registry.
//!
//! Only one test in this binary may touch [`ModifierRegistry::global`]; the
//! others pass a registry explicitly.

use std::sync::Arc;

use httprpc_beans::Scalar;
use httprpc_template::{
    Locale, MemoryLoader, ModifierConfig, ModifierRegistry, RegistryError, RenderOptions,
    TemplateSerializer,
};
use serde_json::json;
use serial_test::serial;

#[test]
#[serial]
fn installed_registry_becomes_the_default() {
    let mut registry = ModifierRegistry::builtins();
    registry.register_fn("shout", |value: Scalar, _, _| {
        Scalar::String(format!("{}!", value.to_string().to_uppercase()))
    });
    ModifierRegistry::install(registry).unwrap();

    let again = ModifierRegistry::install(ModifierRegistry::builtins()).unwrap_err();
    assert!(matches!(again, RegistryError::AlreadyInstalled));

    let loader = MemoryLoader::new().with("t.txt", "{{greeting:shout}}");
    let out = TemplateSerializer::new(loader, "t.txt", "text/plain")
        .render_to_string(&json!({"greeting": "hello"}), &RenderOptions::default())
        .unwrap();
    assert_eq!(out, "HELLO!");
    assert!(ModifierRegistry::global().resolve("shout").is_some());
}

#[test]
fn yaml_config_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modifiers.yaml");
    std::fs::write(
        &path,
        "modifiers:\n  money:\n    modifier: format\n    argument: currency\n  safe: ^html\n",
    )
    .unwrap();

    let config = ModifierConfig::from_path(&path).unwrap();
    let registry = Arc::new(ModifierRegistry::with_config(&config).unwrap());

    let loader = MemoryLoader::new().with("t.txt", "{{total:money}} {{label:safe}}");
    let serializer =
        TemplateSerializer::new(loader, "t.txt", "text/plain").with_modifiers(registry);
    let data = json!({"total": 1234.5, "label": "<new>"});

    let out = serializer
        .render_to_string(&data, &RenderOptions::default())
        .unwrap();
    assert_eq!(out, "$1,234.50 &lt;new&gt;");

    let german = RenderOptions::new().with_locale(Locale::parse("de-DE"));
    let out = serializer.render_to_string(&data, &german).unwrap();
    assert_eq!(out, "1.234,50\u{a0}€ &lt;new&gt;");
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ModifierConfig::from_path(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, RegistryError::Config(_)));
}

use std::path::Path;

use solar_core::errors::{ErrorInfo, SweepError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("train_set", "CMB-6")
        .with_context("reason", "example")
}

#[test]
fn registry_error_surface() {
    let err = SweepError::Registry(sample_info("registry.unknown_key", "no such set"));
    assert_eq!(err.code(), "registry.unknown_key");
    assert!(err.info().context.contains_key("train_set"));
}

#[test]
fn config_error_surface() {
    let err = SweepError::Config(sample_info("config.weight_selector", "unknown selector"));
    assert_eq!(err.info().code, "config.weight_selector");
    assert!(err.to_string().starts_with("config error: unknown selector"));
}

#[test]
fn io_helpers_record_path() {
    let err = SweepError::dataset_io("dataset.read", Path::new("/tmp/list.txt"), "missing");
    assert!(matches!(err, SweepError::Dataset(_)));
    assert_eq!(err.info().context.get("path").map(String::as_str), Some("/tmp/list.txt"));

    let err = SweepError::guard_io("guard.clear", Path::new("/tmp/pred"), "denied");
    assert!(matches!(err, SweepError::Guard(_)));
}

#[test]
fn display_includes_context_and_hint() {
    let err = SweepError::Collaborator(
        ErrorInfo::new("collab.exit", "trainer failed")
            .with_context("status", "1")
            .with_hint("check the trainer log"),
    );
    let rendered = err.to_string();
    assert!(rendered.contains("status=1"));
    assert!(rendered.contains("hint: check the trainer log"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = SweepError::Dataset(ErrorInfo::new("dataset.insufficient_samples", "too few"));
    let json = serde_json::to_value(&err).expect("json");
    assert_eq!(json["family"], "Dataset");
    assert_eq!(json["detail"]["code"], "dataset.insufficient_samples");
}

use dmc_core::errors::{DmcError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("order", "3")
        .with_context("move", "add-interaction")
}

#[test]
fn diagram_error_surface() {
    let err = DmcError::Diagram(sample_info("dead-id", "vertex 4 is not alive"));
    assert_eq!(err.info().code, "dead-id");
    assert!(err.info().context.contains_key("order"));
    assert!(!err.is_fatal());
}

#[test]
fn invariant_error_is_fatal() {
    let err = DmcError::Invariant(sample_info("weight-drift", "running weight diverged"));
    assert!(err.is_fatal());
    let rendered = err.to_string();
    assert!(rendered.starts_with("invariant violation: running weight diverged"));
    assert!(rendered.contains("move=add-interaction"));
}

#[test]
fn hint_is_rendered() {
    let err = DmcError::Config(
        ErrorInfo::new("bad-beta", "beta must be positive").with_hint("set beta > 0"),
    );
    assert!(err.to_string().ends_with("| hint: set beta > 0"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = DmcError::Lattice(sample_info("LT001", "empty lattice"));
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "Lattice");
    assert_eq!(json["detail"]["code"], "LT001");
    let back: DmcError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}

//! Tests for error types.
//!
//! Validates display formatting for every error category callers match on.

use std::path::PathBuf;
use vortex::Error;

// =============================================================================
// Build Error Tests
// =============================================================================

#[test]
fn test_file_not_found_display() {
    let err = Error::FileNotFound {
        path: "/scripts/missing.ts".to_string(),
    };
    assert_eq!(err.to_string(), "file not found: /scripts/missing.ts");
}

#[test]
fn test_confinement_violation_display() {
    let err = Error::ConfinementViolation {
        import: "../outside/evil.ts".to_string(),
        resolved: "/outside/evil.ts".to_string(),
        root: "/scripts/".to_string(),
    };
    let msg = err.to_string();

    assert!(msg.contains("../outside/evil.ts"), "should include import");
    assert!(msg.contains("/scripts/"), "should include root");
    assert!(msg.contains("/outside/evil.ts"), "should include resolved path");
}

#[test]
fn test_build_failed_joins_messages() {
    let err = Error::BuildFailed {
        messages: vec!["first".to_string(), "second".to_string()],
    };
    assert_eq!(err.to_string(), "build failed: first, second");
}

#[test]
fn test_config_parse_display() {
    let err = Error::ConfigParse {
        path: "/vortex.json".to_string(),
        reason: "expected value".to_string(),
    };
    let msg = err.to_string();

    assert!(msg.contains("/vortex.json"));
    assert!(msg.contains("expected value"));
}

// =============================================================================
// Artifact Error Tests
// =============================================================================

#[test]
fn test_artifact_too_large_display() {
    let err = Error::ArtifactTooLarge {
        size: 2048,
        limit: 1024,
    };
    let msg = err.to_string();

    assert!(msg.contains("2048"));
    assert!(msg.contains("1024"));
}

#[test]
fn test_digest_mismatch_display() {
    let err = Error::DigestMismatch {
        expected: "sha256:aaa".to_string(),
        computed: "sha256:bbb".to_string(),
    };
    let msg = err.to_string();

    assert!(msg.contains("sha256:aaa"));
    assert!(msg.contains("sha256:bbb"));
}

#[test]
fn test_artifact_write_failed_display() {
    let err = Error::ArtifactWriteFailed {
        path: PathBuf::from("/dist/Game.vortex"),
        reason: "read-only file system".to_string(),
    };
    let msg = err.to_string();

    assert!(msg.contains("/dist/Game.vortex"));
    assert!(msg.contains("read-only"));
}

// =============================================================================
// Pack Error Tests
// =============================================================================

#[test]
fn test_circular_dependency_display() {
    let err = Error::CircularDependency {
        id: "Vortex.Input".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "circular dependency detected for pack Vortex.Input"
    );
}

#[test]
fn test_missing_export_display() {
    let err = Error::MissingExport {
        id: "Vortex.Debug".to_string(),
        export: "public".to_string(),
    };
    assert_eq!(err.to_string(), "pack Vortex.Debug missing public export");
}

#[test]
fn test_invalid_pack_id_display() {
    let err = Error::InvalidPackId {
        id: "../etc".to_string(),
        reason: "pack id contains an empty segment",
    };
    let msg = err.to_string();

    assert!(msg.contains("../etc"));
    assert!(msg.contains("empty segment"));
}

// =============================================================================
// Conversion Tests
// =============================================================================

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: Error = io.into();

    assert!(matches!(err, Error::Io(_)));
    assert!(err.to_string().contains("denied"));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<Error>();
}

//! Tests for error handling

use mirror_core::{Address, ElementKind, MirrorError, MirrorResult};

#[test]
fn test_not_found_display()
{
    let error = MirrorError::NotFound {
        kind: ElementKind::Field,
        name: "speed".to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("field"));
    assert!(message.contains("speed"));
    assert!(error.is_not_found());
}

#[test]
fn test_marker_kind_display()
{
    let error = MirrorError::NotFound {
        kind: ElementKind::Marker,
        name: Address::new(0x10).to_string(),
    };
    let message = format!("{}", error);
    assert!(message.contains("type-of marker"));
    assert!(message.contains("0x0000000000000010"));
}

#[test]
fn test_contract_errors_are_not_not_found()
{
    let detached = MirrorError::Detached("Ghost".to_string());
    assert!(!detached.is_not_found());
    assert!(format!("{}", detached).contains("Ghost"));

    let mismatch = MirrorError::KindMismatch {
        name: "::Point".to_string(),
        expected: "an enum",
    };
    let message = format!("{}", mismatch);
    assert!(message.contains("::Point"));
    assert!(message.contains("an enum"));
}

#[test]
fn test_size_mismatch_display()
{
    let error = MirrorError::SizeMismatch { expected: 4, actual: 8 };
    let message = format!("{}", error);
    assert!(message.contains("expected 4"));
    assert!(message.contains("got 8"));
}

#[test]
fn test_address_unmapped_display()
{
    let error = MirrorError::AddressUnmapped(Address::new(0x1000));
    assert!(format!("{}", error).contains("0x0000000000001000"));
}

#[test]
fn test_io_error_conversion()
{
    fn open() -> MirrorResult<()>
    {
        let read: std::io::Result<()> = Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing binary"));
        read?;
        Ok(())
    }

    match open() {
        Err(MirrorError::Io(inner)) => assert_eq!(inner.kind(), std::io::ErrorKind::NotFound),
        other => panic!("Expected Io variant, got {:?}", other),
    }
}

#[test]
fn test_loading_a_missing_file_fails_with_io()
{
    let result = mirror_core::Database::load("/nonexistent/mirror/binary", &mirror_core::BuildOptions::default());
    assert!(matches!(result, Err(MirrorError::Io(_))));
}

#[test]
fn test_loading_a_non_object_file_fails()
{
    let path = std::env::temp_dir().join(format!("mirror-not-an-object-{}", std::process::id()));
    std::fs::write(&path, b"plain text, not an object file").unwrap();

    let result = mirror_core::Database::load(&path, &mirror_core::BuildOptions::default());
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(MirrorError::Object(_))));
}

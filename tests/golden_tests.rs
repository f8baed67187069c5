//! Golden tests - fixture-based tests that lock expected behavior
//!
//! These tests use JSON fixtures to verify that naming and tag handling
//! produce expected outputs. Revisioned names are persisted in buckets and
//! on disk, so any change here is a breaking change.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use std::fs;

// ============================================================================
// REVISION NAMING GOLDEN TESTS
// ============================================================================

mod revision_golden {
    use super::*;
    use bucket_sync::revision::next_revision;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        path: String,
        tag: String,
        expected: String,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_revision_naming_golden() {
        let fixture_path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/revision_naming.json"
        );
        let content =
            fs::read_to_string(fixture_path).expect("Failed to read revision_naming.json fixture");
        let fixture: Fixture =
            serde_json::from_str(&content).expect("Failed to parse fixture JSON");

        assert!(!fixture.test_cases.is_empty());
        for case in fixture.test_cases {
            assert_eq!(
                next_revision(&case.path, &case.tag),
                case.expected,
                "Case '{}': next_revision({:?}, {:?})",
                case.name,
                case.path,
                case.tag
            );
        }
    }
}

// ============================================================================
// TAG NORMALIZATION GOLDEN TESTS
// ============================================================================

mod tag_golden {
    use super::*;
    use bucket_sync::hash::normalize_tag;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: String,
        expected: String,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_tag_normalization_golden() {
        let fixture_path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/tag_normalization.json"
        );
        let content = fs::read_to_string(fixture_path)
            .expect("Failed to read tag_normalization.json fixture");
        let fixture: Fixture =
            serde_json::from_str(&content).expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            assert_eq!(
                normalize_tag(&case.input),
                case.expected,
                "Case '{}': normalize_tag({:?})",
                case.name,
                case.input
            );
        }
    }
}

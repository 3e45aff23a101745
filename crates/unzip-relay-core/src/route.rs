// crates/unzip-relay-core/src/route.rs
// ============================================================================
// Module: Entry Router
// Description: Pure routing decisions for decoded archive entries.
// Purpose: Classify entries and compute destination keys.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Routing is a pure function over entry metadata: directory markers carry
//! no bytes and destination stores create prefixes implicitly, so they are
//! skipped; non-file kinds are skipped with a reason; file entries extract
//! to `<archive-name>/<relative-path>` so every extracted object traces back
//! to its source archive.
//!
//! Security posture: entry paths come from untrusted archives. Paths that
//! escape the archive namespace (parent-directory segments, absolute roots,
//! backslash separators, empty segments) are refused rather than sanitized,
//! and the refusal is visible in job outcomes and audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::EntryKind;
use crate::core::EntryMetadata;

// ============================================================================
// SECTION: Routing Decision
// ============================================================================

/// Routing decision for one decoded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Stream the entry body to this destination key.
    Extract {
        /// Destination object key.
        destination_key: String,
    },
    /// Directory marker; nothing to write.
    SkipDirectory,
    /// Entry is not extractable; the reason is recorded in the outcome.
    SkipOther {
        /// Reason for skipping the entry.
        reason: String,
    },
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Computes the routing decision for an entry of the named archive.
///
/// The decision is a pure function of `(archive_name, metadata)`, so
/// re-running an extraction produces identical destination keys.
#[must_use]
pub fn route_entry(archive_name: &str, metadata: &EntryMetadata) -> RouteDecision {
    match metadata.kind {
        EntryKind::Directory => RouteDecision::SkipDirectory,
        EntryKind::Symlink => RouteDecision::SkipOther {
            reason: "symlink entries are not extracted".to_string(),
        },
        EntryKind::Other => RouteDecision::SkipOther {
            reason: "unsupported entry kind".to_string(),
        },
        EntryKind::File => {
            if !is_safe_relative_path(&metadata.relative_path) {
                return RouteDecision::SkipOther {
                    reason: format!("unsafe entry path: {}", metadata.relative_path),
                };
            }
            RouteDecision::Extract {
                destination_key: destination_key(archive_name, &metadata.relative_path),
            }
        }
    }
}

/// Computes the destination key for an extracted entry.
///
/// The key is the archive name joined with the raw entry path, preserving
/// the namespacing convention that makes extracted objects traceable.
#[must_use]
pub fn destination_key(archive_name: &str, relative_path: &str) -> String {
    format!("{archive_name}/{relative_path}")
}

/// Returns true when an entry path stays inside the archive namespace.
///
/// Refused: empty paths, absolute roots, backslash separators, and any
/// empty, `.`, or `..` segment.
#[must_use]
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return false;
    }
    path.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::RouteDecision;
    use super::is_safe_relative_path;
    use super::route_entry;
    use crate::core::EntryKind;
    use crate::core::EntryMetadata;

    /// Builds entry metadata for routing tests.
    fn metadata(path: &str, kind: EntryKind) -> EntryMetadata {
        EntryMetadata {
            relative_path: path.to_string(),
            kind,
            declared_size: Some(0),
        }
    }

    #[test]
    fn file_entries_extract_with_namespaced_keys() {
        let decision = route_entry("archive.zip", &metadata("dir/a.txt", EntryKind::File));
        assert_eq!(
            decision,
            RouteDecision::Extract {
                destination_key: "archive.zip/dir/a.txt".to_string(),
            }
        );
    }

    #[test]
    fn nested_archive_names_are_preserved() {
        let decision = route_entry("uploads/batch.zip", &metadata("a.txt", EntryKind::File));
        assert_eq!(
            decision,
            RouteDecision::Extract {
                destination_key: "uploads/batch.zip/a.txt".to_string(),
            }
        );
    }

    #[test]
    fn routing_is_deterministic() {
        let entry = metadata("x/y.bin", EntryKind::File);
        assert_eq!(route_entry("a.zip", &entry), route_entry("a.zip", &entry));
    }

    #[test]
    fn directories_are_skipped() {
        let decision = route_entry("archive.zip", &metadata("dir/", EntryKind::Directory));
        assert_eq!(decision, RouteDecision::SkipDirectory);
    }

    #[test]
    fn symlinks_are_skipped_with_reason() {
        let decision = route_entry("archive.zip", &metadata("link", EntryKind::Symlink));
        assert!(matches!(decision, RouteDecision::SkipOther { .. }));
    }

    #[test]
    fn traversal_paths_are_refused() {
        for path in ["../escape", "a/../../b", "/etc/passwd", "a\\b", "a//b", "."] {
            let decision = route_entry("archive.zip", &metadata(path, EntryKind::File));
            assert!(
                matches!(decision, RouteDecision::SkipOther { .. }),
                "path {path} must be refused"
            );
        }
    }

    #[test]
    fn safe_path_predicate() {
        assert!(is_safe_relative_path("a.txt"));
        assert!(is_safe_relative_path("deep/nested/dir/file.bin"));
        assert!(is_safe_relative_path("dotted.name/still.fine"));
        assert!(!is_safe_relative_path(""));
        assert!(!is_safe_relative_path("/rooted"));
        assert!(!is_safe_relative_path("trailing/"));
        assert!(!is_safe_relative_path("has/../parent"));
    }
}

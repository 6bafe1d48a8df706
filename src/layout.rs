// src/layout.rs
// Deterministic on-disk placement of resource artifacts

use std::path::{Path, PathBuf};

/// Append-only patch journal; the authoritative artifact.
pub const JOURNAL_FILE: &str = "resource.rdfp";
/// Materialized latest-snapshot cache; derived, safe to delete.
pub const CACHE_FILE: &str = "resource.cache";
/// Compact N-Quads dump of the latest snapshot; derived, safe to delete.
pub const QUADS_FILE: &str = "resource.nq";
/// Ordered memento range index; derived on cache regeneration.
pub const MEMENTO_FILE: &str = "memento.cache";

/// Scheme prefix shared by all resource identifiers.
pub const IDENTIFIER_PREFIX: &str = "info:trellis/";

/// Derives the resource directory under a partition root.
///
/// The CRC-32 of the full IRI supplies three two-character shard
/// directories; the full MD5 hex digest is the terminal directory. Two
/// calls with the same IRI always return byte-identical paths.
pub fn resource_directory(partition_root: &Path, identifier: &str) -> PathBuf {
    let crc = format!("{:08x}", crc32fast::hash(identifier.as_bytes()));
    let digest = format!("{:x}", md5::compute(identifier.as_bytes()));
    partition_root
        .join(&crc[0..2])
        .join(&crc[2..4])
        .join(&crc[4..6])
        .join(digest)
}

/// Extracts the resource path from an identifier: the scheme prefix, any
/// `?version=` query, and any fragment are stripped.
pub fn resource_path(identifier: &str) -> &str {
    let rest = identifier
        .strip_prefix(IDENTIFIER_PREFIX)
        .unwrap_or(identifier);
    let rest = rest.split('#').next().unwrap_or(rest);
    rest.split('?').next().unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;

    #[test]
    fn test_directory_vectors() {
        let root = Path::new("/data");
        assert_eq!(
            resource_directory(root, "info:trellis/resource"),
            Path::new("/data/e4/3d/d2/3c11fdfba716fe4a8c2ad59720f73b3e")
        );
        assert_eq!(
            resource_directory(root, "info:trellis/other"),
            Path::new("/data/56/02/ed/94db502039137b6017bd7089ceaf8ad1")
        );
    }

    #[test]
    fn test_directory_is_deterministic() {
        let root = Path::new("/data");
        let a = resource_directory(root, "info:trellis/repository/item");
        let b = resource_directory(root, "info:trellis/repository/item");
        assert_eq!(a, b);
    }

    #[test]
    fn test_resource_path_strips_version_and_fragment() {
        assert_eq!(
            resource_path("info:trellis/foo/bar?version=0123456#hash"),
            "foo/bar"
        );
        assert_eq!(resource_path("info:trellis/foo?version=0123456#hash"), "foo");
        assert_eq!(resource_path("info:trellis/foo/bar"), "foo/bar");
        assert_eq!(resource_path("info:trellis/foo#section"), "foo");
    }
}

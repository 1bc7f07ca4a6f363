//! In-memory reading of chart archives
//!
//! Only the top-level metadata files of a chart are kept; templates are left
//! to the template engine.

use std::io::Read;

use flate2::read::GzDecoder;
use indexmap::IndexMap;
use tar::Archive;

use crate::error::{RepoError, Result};

pub const CHART_FILE: &str = "Chart.yaml";
pub const CHART_LOCK_FILE: &str = "Chart.lock";
pub const VALUES_FILE: &str = "values.yaml";
pub const VALUES_SCHEMA_FILE: &str = "values.schema.json";
pub const REQUIREMENTS_FILE: &str = "requirements.yaml";

/// Files retained from an archive
pub const ARCHIVE_FILES: &[&str] = &[
    CHART_FILE,
    CHART_LOCK_FILE,
    VALUES_FILE,
    VALUES_SCHEMA_FILE,
    REQUIREMENTS_FILE,
];

/// Metadata files of one chart archive, by file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveFiles {
    files: IndexMap<String, String>,
}

impl ArchiveFiles {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Read the metadata files out of a gzipped chart tarball
///
/// Member names lose any leading `./` and their top-level directory. Any
/// member with an absolute path fails the whole read.
pub fn read_archive_files(data: &[u8], source: &str) -> Result<ArchiveFiles> {
    let archive_error = |message: String| RepoError::ArchiveError {
        url: source.to_string(),
        message,
    };

    let mut archive = Archive::new(GzDecoder::new(data));
    let entries = archive.entries().map_err(|e| archive_error(e.to_string()))?;

    let mut files = IndexMap::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(e.to_string()))?;
        let raw_path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        if raw_path.starts_with('/') {
            return Err(RepoError::UnsafeArchivePath { path: raw_path });
        }
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let relative = raw_path.trim_start_matches("./");
        let Some((_, name)) = relative.split_once('/') else {
            continue;
        };
        if !ARCHIVE_FILES.contains(&name) {
            continue;
        }

        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| archive_error(format!("{}: {}", raw_path, e)))?;
        files.insert(name.to_string(), content);
    }

    tracing::debug!(source, files = files.len(), "read chart archive");
    Ok(ArchiveFiles { files })
}

#[cfg(test)]
pub(crate) mod testing {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    /// Build a gzipped tarball from `(path, content)` pairs
    pub fn build_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, content) in files {
            let mut header = tar::Header::new_old();
            let name = &mut header.as_old_mut().name;
            name[..path.len()].copy_from_slice(path.as_bytes());
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append(&header, content.as_bytes()).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::build_archive;
    use super::*;
    use helmion_core::ErrorKind;

    #[test]
    fn test_keeps_metadata_files() {
        let data = build_archive(&[
            ("nginx/Chart.yaml", "apiVersion: v2\nname: nginx\n"),
            ("nginx/values.yaml", "replicaCount: 1\n"),
            ("nginx/templates/deployment.yaml", "kind: Deployment\n"),
            ("nginx/charts/common/values.yaml", "nested: true\n"),
            ("nginx/README.md", "# nginx\n"),
        ]);

        let files = read_archive_files(&data, "nginx-1.0.0.tgz").unwrap();

        assert_eq!(files.names().collect::<Vec<_>>(), vec!["Chart.yaml", "values.yaml"]);
        assert_eq!(files.get("values.yaml"), Some("replicaCount: 1\n"));
        assert!(!files.contains("README.md"));
    }

    #[test]
    fn test_dot_slash_prefix() {
        let data = build_archive(&[
            ("./nginx/Chart.yaml", "apiVersion: v2\nname: nginx\n"),
            ("./nginx/values.yaml", "replicaCount: 1\n"),
            ("./nginx/templates/service.yaml", "kind: Service\n"),
        ]);

        let files = read_archive_files(&data, "nginx-1.0.0.tgz").unwrap();

        assert_eq!(files.names().collect::<Vec<_>>(), vec!["Chart.yaml", "values.yaml"]);
    }

    #[test]
    fn test_rejects_absolute_paths() {
        let data = build_archive(&[
            ("nginx/Chart.yaml", "apiVersion: v2\nname: nginx\n"),
            ("/etc/values.yaml", "owned: true\n"),
        ]);

        let err = read_archive_files(&data, "nginx-1.0.0.tgz").unwrap_err();
        assert!(matches!(err, RepoError::UnsafeArchivePath { .. }));
        assert_eq!(err.kind(), ErrorKind::InputOutput);
    }

    #[test]
    fn test_not_a_tarball() {
        let err = read_archive_files(b"definitely not gzip", "broken.tgz").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputOutput);
    }
}

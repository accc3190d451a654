//! Working-tree packaging
//!
//! Builds the gzip tar stream shipped to the remote host. Version-control
//! metadata (`.git` directories at any depth) and log files (`*.log`) are
//! excluded; everything else travels verbatim.

use std::fs;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::errors::DeployError;
use crate::utils::sha256_hash;

/// A packaged working tree, ready to stream
#[derive(Debug, Clone)]
pub struct Archive {
    /// gzip-compressed tar bytes
    pub bytes: Vec<u8>,

    /// Hex SHA-256 digest of `bytes`, verified after transfer
    pub sha256: String,

    /// Number of regular files packed
    pub files: usize,
}

/// Package a working tree rooted at `root`
pub fn pack_tree(root: &Path) -> Result<Archive, DeployError> {
    if !root.is_dir() {
        return Err(DeployError::ArchiveError(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let mut files = 0usize;
    append_dir(&mut builder, root, Path::new(""), &mut files)?;

    let encoder = builder
        .into_inner()
        .map_err(|e| DeployError::ArchiveError(e.to_string()))?;
    let bytes = encoder
        .finish()
        .map_err(|e| DeployError::ArchiveError(e.to_string()))?;

    let sha256 = sha256_hash(&bytes);
    debug!(
        "Packed {} files, {} bytes, sha256 {}",
        files,
        bytes.len(),
        sha256
    );

    Ok(Archive {
        bytes,
        sha256,
        files,
    })
}

/// Whether a directory entry stays out of the archive
fn is_excluded(name: &str, is_dir: bool) -> bool {
    if is_dir {
        name == ".git"
    } else {
        name.ends_with(".log")
    }
}

fn append_dir<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    abs: &Path,
    rel: &Path,
    files: &mut usize,
) -> Result<(), DeployError> {
    let mut entries: Vec<_> = fs::read_dir(abs)
        .map_err(|e| DeployError::ArchiveError(format!("read {}: {}", abs.display(), e)))?
        .collect::<Result<_, _>>()
        .map_err(|e| DeployError::ArchiveError(e.to_string()))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let file_type = entry
            .file_type()
            .map_err(|e| DeployError::ArchiveError(e.to_string()))?;

        if is_excluded(&name_str, file_type.is_dir()) {
            debug!("Excluding {}", entry.path().display());
            continue;
        }

        let rel_child = rel.join(&name);
        if file_type.is_dir() {
            builder
                .append_dir(&rel_child, entry.path())
                .map_err(|e| DeployError::ArchiveError(e.to_string()))?;
            append_dir(builder, &entry.path(), &rel_child, files)?;
        } else if file_type.is_file() {
            let mut file = fs::File::open(entry.path())
                .map_err(|e| DeployError::ArchiveError(e.to_string()))?;
            builder
                .append_file(&rel_child, &mut file)
                .map_err(|e| DeployError::ArchiveError(e.to_string()))?;
            *files += 1;
        } else {
            // Symlinks are archived as links, never followed
            builder
                .append_path_with_name(entry.path(), &rel_child)
                .map_err(|e| DeployError::ArchiveError(e.to_string()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(archive: &Archive) -> Vec<String> {
        let decoder = flate2::read::GzDecoder::new(archive.bytes.as_slice());
        let mut reader = tar::Archive::new(decoder);
        reader
            .entries()
            .unwrap()
            .map(|e| {
                e.unwrap()
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect()
    }

    fn fixture_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join("app.log"), "old noise\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.py"), "print('hi')\n").unwrap();
        std::fs::write(dir.path().join("src/debug.log"), "noise\n").unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::write(dir.path().join(".git/config"), "[core]\n").unwrap();
        std::fs::create_dir_all(dir.path().join("vendor/.git")).unwrap();
        std::fs::write(dir.path().join("vendor/lib.py"), "x = 1\n").unwrap();
        dir
    }

    #[test]
    fn archive_excludes_vcs_metadata_and_logs() {
        let tree = fixture_tree();
        let archive = pack_tree(tree.path()).unwrap();
        let names = entry_names(&archive);

        assert!(names.contains(&"Dockerfile".to_string()));
        assert!(names.contains(&"src/main.py".to_string()));
        assert!(names.contains(&"vendor/lib.py".to_string()));
        assert!(!names.iter().any(|n| n.contains(".git")));
        assert!(!names.iter().any(|n| n.ends_with(".log")));
        assert_eq!(archive.files, 3);
    }

    #[test]
    fn digest_matches_the_packed_bytes() {
        let tree = fixture_tree();
        let archive = pack_tree(tree.path()).unwrap();
        assert_eq!(archive.sha256.len(), 64);
        assert_eq!(archive.sha256, sha256_hash(&archive.bytes));
    }

    #[test]
    fn packed_contents_round_trip() {
        let tree = fixture_tree();
        let archive = pack_tree(tree.path()).unwrap();

        let decoder = flate2::read::GzDecoder::new(archive.bytes.as_slice());
        let mut reader = tar::Archive::new(decoder);
        let mut found = false;
        for entry in reader.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().as_ref() == Path::new("src/main.py") {
                let mut contents = String::new();
                entry.read_to_string(&mut contents).unwrap();
                assert_eq!(contents, "print('hi')\n");
                found = true;
            }
        }
        assert!(found);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tree = tempfile::tempdir().unwrap();
        let gone = tree.path().join("nope");
        assert!(pack_tree(&gone).is_err());
    }
}

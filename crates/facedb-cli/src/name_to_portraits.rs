//! Portrait path lookup by person name.
//!
//! Never fails: an absent portrait tree, an unknown name, or an unreadable
//! directory all produce an empty result.

use crate::output;
use facedb_data::catalog::{self, EntryKind};
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for one lookup run.
pub struct NameToPortraitsArgs {
    pub data_path: PathBuf,
    pub name: String,
    pub info_path: PathBuf,
}

/// Absolute paths of every portrait file for `name`, in directory
/// enumeration order. Missing tree or name yields an empty list.
pub fn lookup(data_path: &Path, name: &str) -> Vec<PathBuf> {
    let portraits_dir = data_path.join("protraits");
    let Ok(entries) = catalog::list(&portraits_dir) else {
        return Vec::new();
    };

    let Some(entry) = entries.iter().find(|e| e.name == name) else {
        return Vec::new();
    };
    if entry.kind != EntryKind::Directory {
        return Vec::new();
    }

    let person_dir = portraits_dir.join(name);
    let Ok(files) = catalog::list(&person_dir) else {
        return Vec::new();
    };
    let base = fs::canonicalize(&person_dir).unwrap_or(person_dir);

    files
        .iter()
        .filter(|e| e.kind == EntryKind::File)
        .map(|e| base.join(&e.name))
        .collect()
}

/// Run the lookup and write the JSON array. A failed write is logged but
/// never fatal — this tool always succeeds.
pub fn run(args: &NameToPortraitsArgs) {
    let paths = lookup(&args.data_path, &args.name);
    tracing::info!(name = %args.name, portraits = paths.len(), "portrait lookup complete");
    for path in &paths {
        tracing::info!(path = %path.display(), "portrait found");
    }

    let listed: Vec<String> = paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    if let Err(e) = output::write_json(&args.info_path, &listed) {
        tracing::error!("cannot write the portrait report: {e:#}");
    } else {
        tracing::info!(path = %args.info_path.display(), "portrait report written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn build_portraits(root: &Path, name: &str, count: usize) {
        let dir = root.join("protraits").join(name);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            File::create(dir.join(format!("{i}.jpg"))).unwrap();
        }
    }

    #[test]
    fn test_missing_tree_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(lookup(dir.path(), "alice").is_empty());
    }

    #[test]
    fn test_unknown_name_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        build_portraits(dir.path(), "bob", 2);
        assert!(lookup(dir.path(), "alice").is_empty());
    }

    #[test]
    fn test_name_that_is_a_file_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("protraits")).unwrap();
        File::create(dir.path().join("protraits/alice")).unwrap();
        assert!(lookup(dir.path(), "alice").is_empty());
    }

    #[test]
    fn test_returns_every_file_as_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        build_portraits(dir.path(), "alice", 3);
        // Subdirectories and hidden files do not count as portraits.
        fs::create_dir(dir.path().join("protraits/alice/thumbs")).unwrap();
        File::create(dir.path().join("protraits/alice/.hidden.jpg")).unwrap();

        let paths = lookup(dir.path(), "alice");
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.is_absolute(), "{path:?} should be absolute");
            assert!(path.is_file());
        }
    }

    #[test]
    fn test_run_writes_empty_array_for_unknown_name() {
        let dir = tempfile::tempdir().unwrap();
        let info_path = dir.path().join("info.json");
        run(&NameToPortraitsArgs {
            data_path: dir.path().to_path_buf(),
            name: "alice".into(),
            info_path: info_path.clone(),
        });
        assert_eq!(fs::read_to_string(info_path).unwrap(), "[]\n");
    }

    #[test]
    fn test_run_writes_portrait_paths() {
        let dir = tempfile::tempdir().unwrap();
        build_portraits(dir.path(), "alice", 2);
        let info_path = dir.path().join("info.json");
        run(&NameToPortraitsArgs {
            data_path: dir.path().to_path_buf(),
            name: "alice".into(),
            info_path: info_path.clone(),
        });

        let contents = fs::read_to_string(info_path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}

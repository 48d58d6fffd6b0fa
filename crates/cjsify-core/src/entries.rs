// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Entry set resolution

use crate::config::EntryDir;
use crate::error::{ConvertError, Result};
use crate::resolver::canonical;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Build the ordered, duplicate-free entry list of a group.
///
/// The root entry comes first, followed by the files of each directory (in
/// the given directory order) whose name matches the directory's pattern.
/// Directory listings are sorted by file name; subdirectories are not
/// descended into.
pub fn resolve_entries(root: &Path, dirs: &[EntryDir], base: &Path) -> Result<Vec<PathBuf>> {
    let root = base.join(root);
    if !root.is_file() {
        return Err(ConvertError::PathNotFound(root));
    }

    let mut entries = vec![canonical(&root)];

    for entry_dir in dirs {
        let dir = base.join(&entry_dir.dir);
        if !dir.is_dir() {
            return Err(ConvertError::PathNotFound(dir));
        }
        let pattern = Regex::new(&entry_dir.pattern)?;

        let mut files = Vec::new();
        for item in std::fs::read_dir(&dir)? {
            let item = item?;
            if !item.file_type()?.is_file() {
                continue;
            }
            let name = item.file_name().to_string_lossy().into_owned();
            if pattern.is_match(&name) {
                files.push((name, item.path()));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, path) in files {
            let path = canonical(&path);
            if !entries.contains(&path) {
                entries.push(path);
            }
        }
    }

    tracing::debug!(count = entries.len(), "Resolved entry set");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        fs::create_dir_all(lib.join("__tests/fixtures")).unwrap();
        fs::write(lib.join("index.js"), "export default 1;").unwrap();
        fs::write(lib.join("__tests/b.js"), "").unwrap();
        fs::write(lib.join("__tests/a.js"), "").unwrap();
        fs::write(lib.join("__tests/notes.md"), "").unwrap();
        fs::write(lib.join("__tests/fixtures/c.js"), "").unwrap();
        dir
    }

    fn names(entries: &[PathBuf]) -> Vec<String> {
        entries
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_root_then_sorted_matches() {
        let dir = project();
        let dirs = vec![EntryDir::parse_flag("lib/__tests")];
        let entries = resolve_entries(Path::new("lib/index.js"), &dirs, dir.path()).unwrap();
        assert_eq!(names(&entries), ["index.js", "a.js", "b.js"]);
    }

    #[test]
    fn test_duplicates_dropped() {
        let dir = project();
        let dirs = vec![
            EntryDir::parse_flag("lib/__tests"),
            EntryDir::parse_flag("lib"),
            EntryDir::parse_flag("lib/__tests"),
        ];
        let entries = resolve_entries(Path::new("lib/index.js"), &dirs, dir.path()).unwrap();
        assert_eq!(names(&entries), ["index.js", "a.js", "b.js"]);
    }

    #[test]
    fn test_missing_paths() {
        let dir = project();
        let err = resolve_entries(Path::new("lib/nope.js"), &[], dir.path()).unwrap_err();
        assert!(matches!(err, ConvertError::PathNotFound(_)));

        let dirs = vec![EntryDir::parse_flag("lib/missing")];
        let err = resolve_entries(Path::new("lib/index.js"), &dirs, dir.path()).unwrap_err();
        assert!(matches!(err, ConvertError::PathNotFound(p) if p.ends_with("lib/missing")));
    }

    #[test]
    fn test_empty_listing_yields_root_only() {
        let dir = project();
        let dirs = vec![EntryDir {
            dir: "lib/__tests".into(),
            pattern: r"\.ts$".into(),
        }];
        let entries = resolve_entries(Path::new("lib/index.js"), &dirs, dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
    }
}

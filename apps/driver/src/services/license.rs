use crate::error::{PipelineErrorExt, Result};
use crate::models::settings::LicenseSettings;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lists tracked files under `root` that do not contain the license header.
///
/// Paths are relative to `root` and sorted. Directories that do not exist are
/// skipped; file contents are compared lossily so stray bytes never abort the scan.
///
/// # Errors
/// Returns an error if a directory cannot be walked or a file cannot be read.
pub fn find_missing_headers(root: &Path, settings: &LicenseSettings) -> Result<Vec<PathBuf>> {
    let extension = OsStr::new(settings.extension.trim_start_matches('.'));
    let mut missing = Vec::new();

    for dir in &settings.directories {
        let dir = root.join(dir);
        if !dir.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&dir) {
            let entry = entry
                .map_err(std::io::Error::from)
                .context(format!("Failed to walk {}", dir.display()))?;
            let path = entry.path();

            if !entry.file_type().is_file() || path.extension() != Some(extension) {
                continue;
            }

            let bytes = fs::read(path).context(format!("Failed to read {}", path.display()))?;
            if !String::from_utf8_lossy(&bytes).contains(&settings.header) {
                missing.push(path.strip_prefix(root).unwrap_or(path).to_path_buf());
            }
        }
    }

    missing.sort();
    missing.dedup();
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Licensed under the Apache License, Version 2.0";

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn reports_exactly_the_file_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/app/__init__.py", format!("# {HEADER}\n").as_bytes());
        write(root, "src/app/cli.py", b"print('no header here')\n");
        write(root, "tests/test_cli.py", format!("# {HEADER}\nimport app\n").as_bytes());
        write(root, "tests/fixtures/data.json", b"{}");
        write(root, "docs/conf.py", b"untracked directory\n");

        let missing = find_missing_headers(root, &LicenseSettings::default()).unwrap();
        assert_eq!(missing, [PathBuf::from("src/app/cli.py")]);
    }

    #[test]
    fn compliant_tree_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.py", format!("\"\"\"{HEADER}\"\"\"").as_bytes());
        write(dir.path(), "src/b.py", format!("#!/usr/bin/env python\n# {HEADER}\n").as_bytes());

        assert!(find_missing_headers(dir.path(), &LicenseSettings::default()).unwrap().is_empty());
    }

    #[test]
    fn missing_directories_and_binary_content_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = vec![0xff, 0xfe, b'\n'];
        content.extend_from_slice(HEADER.as_bytes());
        write(dir.path(), "src/odd.py", &content);

        assert!(find_missing_headers(dir.path(), &LicenseSettings::default()).unwrap().is_empty());
    }

    #[test]
    fn extension_setting_may_carry_a_dot() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/lib.rs", b"fn main() {}");
        write(dir.path(), "src/tool.py", b"no header");

        let settings =
            LicenseSettings { extension: ".rs".to_owned(), ..LicenseSettings::default() };
        let missing = find_missing_headers(dir.path(), &settings).unwrap();
        assert_eq!(missing, [PathBuf::from("src/lib.rs")]);
    }
}

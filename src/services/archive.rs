use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub(crate) enum ArchiveError {
    #[error("upload is not a readable zip archive: {0}")]
    Invalid(#[from] ZipError),
    #[error("archive entry {0} escapes the extraction directory")]
    UnsafePath(String),
    #[error("archive expands beyond the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("failed to write extracted file: {0}")]
    Io(#[from] io::Error),
}

/// Unpacks a zip into `destination`, returning the number of files written.
///
/// Entries whose names would resolve outside `destination` are rejected, and the
/// running total of decompressed bytes is checked against `max_uncompressed`
/// while copying, so a lying central directory cannot exceed the cap.
pub(crate) fn extract_zip(
    archive_bytes: &[u8],
    max_uncompressed: u64,
    destination: &Path,
) -> Result<usize, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut written_total = 0u64;
    let mut files = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafePath(entry.name().to_string()))?;
        let outpath = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if written_total.saturating_add(entry.size()) > max_uncompressed {
            return Err(ArchiveError::TooLarge { limit: max_uncompressed });
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        let remaining = max_uncompressed - written_total;
        let copied = io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut outfile)?;
        if copied > remaining {
            return Err(ArchiveError::TooLarge { limit: max_uncompressed });
        }

        written_total += copied;
        files += 1;
    }

    Ok(files)
}

/// First regular file under `root` whose name equals `file_name`, ignoring case.
/// Any directory part of `file_name` is dropped before matching.
pub(crate) fn find_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    let wanted = Path::new(file_name.trim()).file_name()?.to_str()?.to_ascii_lowercase();

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.to_ascii_lowercase() == wanted)
        })
        .map(|entry| entry.into_path())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).expect("start file");
            writer.write_all(contents).expect("write entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }

    #[test]
    fn extracts_nested_entries() {
        let bytes = build_zip(&[
            ("bundle/manifest.csv", b"QuestionText\n".as_slice()),
            ("bundle/images/map.png", b"png".as_slice()),
        ]);
        let dir = tempfile::tempdir().expect("tempdir");

        let files = extract_zip(&bytes, 1024, dir.path()).expect("extract");

        assert_eq!(files, 2);
        assert!(dir.path().join("bundle/images/map.png").is_file());
    }

    #[test]
    fn rejects_entries_escaping_destination() {
        let bytes = build_zip(&[("../outside.txt", b"nope".as_slice())]);
        let dir = tempfile::tempdir().expect("tempdir");

        let err = extract_zip(&bytes, 1024, dir.path()).expect_err("zip slip");
        assert!(matches!(err, ArchiveError::UnsafePath(_)));
    }

    #[test]
    fn enforces_uncompressed_limit() {
        let big = vec![b'a'; 4096];
        let bytes = build_zip(&[("big.txt", big.as_slice())]);
        let dir = tempfile::tempdir().expect("tempdir");

        let err = extract_zip(&bytes, 1000, dir.path()).expect_err("too large");
        assert!(matches!(err, ArchiveError::TooLarge { limit: 1000 }));
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = extract_zip(b"definitely not a zip", 1024, dir.path()).expect_err("invalid");
        assert!(matches!(err, ArchiveError::Invalid(_)));
    }

    #[test]
    fn find_file_matches_name_at_any_depth() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a/b/images");
        fs::create_dir_all(&nested).expect("dirs");
        fs::write(nested.join("Diagram.PNG"), b"x").expect("write");

        let found = find_file(dir.path(), "images/../diagram.png").expect("found");
        assert_eq!(found, nested.join("Diagram.PNG"));
        assert!(find_file(dir.path(), "missing.png").is_none());
    }
}

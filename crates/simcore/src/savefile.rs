use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SaveFileError {
    #[error("failed to create save directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write save file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to replace save file '{path}': {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read save file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes `text` to `path` atomically: the payload lands in a sibling temp
/// file first and is renamed over the destination, so a crash mid-write
/// never leaves a truncated save behind.
pub fn write_text_atomic(path: &Path, text: &str) -> Result<(), SaveFileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SaveFileError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text.as_bytes()).map_err(|source| SaveFileError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    replace_file(&tmp_path, path).map_err(|source| SaveFileError::Replace {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = text.len(), "save_file_written");
    Ok(())
}

pub fn read_text(path: &Path) -> Result<String, SaveFileError> {
    fs::read_to_string(path).map_err(|source| SaveFileError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save.tmp");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        write_text_atomic(&path, "{\"save_version\":1}").expect("write");
        let text = read_text(&path).expect("read");
        assert_eq!(text, "{\"save_version\":1}");
    }

    #[test]
    fn overwrite_replaces_previous_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        write_text_atomic(&path, "first").expect("write first");
        write_text_atomic(&path, "second").expect("write second");
        assert_eq!(read_text(&path).expect("read"), "second");
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        write_text_atomic(&path, "payload").expect("write");
        let entries: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn read_missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.json");
        let error = read_text(&path).expect_err("missing file");
        assert!(error.to_string().contains("missing.json"));
    }
}

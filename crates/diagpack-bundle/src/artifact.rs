//! Pretty-printed JSON artifacts.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{BundleError, BundleResult};

/// Serialize `value` to `{directory}/{file_name}` as two-space indented JSON.
///
/// The file is created or truncated, written in one call, and synced so a
/// failing close is reported. No staging is involved; on error the file
/// content must be treated as invalid.
///
/// # Errors
///
/// Returns [`BundleError::Json`] when serialization fails,
/// [`BundleError::ShortWrite`] when the file accepts fewer bytes than the
/// payload, and [`BundleError::Io`] for create, write, or sync failures.
pub fn write_artifact<T>(directory: &Path, file_name: &str, value: &T) -> BundleResult<PathBuf>
where
    T: Serialize + ?Sized,
{
    let path = directory.join(file_name);
    let payload =
        serde_json::to_vec_pretty(value).map_err(|err| BundleError::json("serialize artifact", &path, err))?;

    let mut file = File::create(&path).map_err(|err| BundleError::io("create artifact", &path, err))?;
    write_checked(&mut file, &payload, "write artifact", &path)?;
    file.sync_all()
        .map_err(|err| BundleError::io("close artifact", &path, err))?;

    debug!(path = %path.display(), bytes = payload.len(), "artifact written");
    Ok(path)
}

/// Issue one write and require the sink to accept every byte.
pub(crate) fn write_checked<W>(
    sink: &mut W,
    bytes: &[u8],
    operation: &'static str,
    path: &Path,
) -> BundleResult<()>
where
    W: Write + ?Sized,
{
    let written = sink
        .write(bytes)
        .map_err(|err| BundleError::io(operation, path, err))?;
    if written == bytes.len() {
        Ok(())
    } else {
        Err(BundleError::ShortWrite {
            operation,
            path: path.to_path_buf(),
            written,
            expected: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use anyhow::Result;
    use diagpack_core::BackupKind;
    use diagpack_test_support::fixtures::{backup_record, secret_storage, temp_dir};
    use std::fs;
    use std::io;

    struct HalfSink;

    impl Write for HalfSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len() / 2)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_two_space_indented_json() -> Result<()> {
        let dir = temp_dir()?;
        let value = serde_json::json!({"a": 1, "b": {"c": [true]}});
        let path = write_artifact(dir.path(), "x.report.json", &value)?;
        let text = fs::read_to_string(&path)?;
        assert_eq!(
            text,
            "{\n  \"a\": 1,\n  \"b\": {\n    \"c\": [\n      true\n    ]\n  }\n}"
        );
        Ok(())
    }

    #[test]
    fn overwrites_existing_file() -> Result<()> {
        let dir = temp_dir()?;
        let path = dir.path().join("x.report.json");
        fs::write(&path, "stale content that is longer than the payload")?;
        write_artifact(dir.path(), "x.report.json", &serde_json::json!({}))?;
        assert_eq!(fs::read_to_string(&path)?, "{}");
        Ok(())
    }

    #[test]
    fn stripped_backup_never_leaks_storage() -> Result<()> {
        let dir = temp_dir()?;
        let mut record = backup_record("2024-01-01T00:00:00Z", "65a0", BackupKind::Logical);
        record.store = secret_storage();
        record.strip_storage();
        let path = write_artifact(dir.path(), "x.backup.json", &record)?;
        let text = fs::read_to_string(path)?;
        assert!(!text.contains("AKIA-SECRET"));
        assert!(!text.contains("hunter2"));
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value["store"], serde_json::json!({}));
        Ok(())
    }

    #[test]
    fn short_write_is_reported() {
        let err = write_checked(&mut HalfSink, b"0123456789", "write artifact", Path::new("x"));
        match err {
            Err(BundleError::ShortWrite {
                written, expected, ..
            }) => {
                assert_eq!(written, 5);
                assert_eq!(expected, 10);
            }
            other => panic!("expected short write, got {other:?}"),
        }
    }

    #[test]
    fn missing_directory_is_io_error() -> Result<()> {
        let dir = temp_dir()?;
        let err = write_artifact(&dir.path().join("absent"), "x.json", &serde_json::json!({}))
            .err()
            .map(|err| err.kind());
        assert_eq!(err, Some(ErrorKind::Io));
        Ok(())
    }
}

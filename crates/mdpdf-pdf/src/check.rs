//! Output validation and delivery.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::GenerationError;

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_TRAILER: &[u8] = b"%%EOF";

/// How far from the end of the file `%%EOF` may appear.
const TRAILER_WINDOW: u64 = 1024;

/// Check that `path` holds a complete PDF and return its size.
///
/// A complete PDF starts with `%PDF-` and ends with an `%%EOF` marker near
/// the end of the file. A missing marker usually means the engine was
/// interrupted mid-write.
pub fn validate_pdf(path: &Path) -> Result<u64, GenerationError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(GenerationError::invalid(path, "engine produced no output file"));
        }
        Err(e) => return Err(GenerationError::io(path, e)),
    };
    let size = file
        .metadata()
        .map_err(|e| GenerationError::io(path, e))?
        .len();
    if size == 0 {
        return Err(GenerationError::invalid(path, "file is empty"));
    }

    let mut header = [0u8; PDF_MAGIC.len()];
    if file.read_exact(&mut header).is_err() || header != PDF_MAGIC {
        return Err(GenerationError::invalid(path, "missing %PDF- signature"));
    }

    let tail_start = size.saturating_sub(TRAILER_WINDOW);
    file.seek(SeekFrom::Start(tail_start))
        .map_err(|e| GenerationError::io(path, e))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)
        .map_err(|e| GenerationError::io(path, e))?;
    if !tail.windows(PDF_TRAILER.len()).any(|w| w == PDF_TRAILER) {
        return Err(GenerationError::invalid(
            path,
            "missing %%EOF trailer, file is truncated",
        ));
    }

    Ok(size)
}

/// Move a generated PDF to `destination`, replacing any existing file.
///
/// Tries a rename first. Across filesystems the file is copied into a
/// temporary sibling of `destination` and renamed over it, so readers never
/// observe a partially written PDF.
pub fn persist(pdf: &Path, destination: &Path) -> Result<(), GenerationError> {
    if fs::rename(pdf, destination).is_ok() {
        tracing::debug!(path = %destination.display(), "moved PDF into place");
        return Ok(());
    }

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| GenerationError::io(dir, e))?;
    let mut source = File::open(pdf).map_err(|e| GenerationError::io(pdf, e))?;
    io::copy(&mut source, &mut staged).map_err(|e| GenerationError::io(pdf, e))?;
    staged
        .persist(destination)
        .map_err(|e| GenerationError::io(destination, e.error))?;

    tracing::debug!(path = %destination.display(), "copied PDF into place");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF\n";

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_valid_pdf() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "ok.pdf", MINIMAL_PDF);

        assert_eq!(validate_pdf(&path).unwrap(), MINIMAL_PDF.len() as u64);
    }

    #[test]
    fn test_trailer_found_in_large_file() {
        let tmp = TempDir::new().unwrap();
        let mut bytes = b"%PDF-1.5\n".to_vec();
        bytes.extend(std::iter::repeat_n(b'x', 10_000));
        bytes.extend_from_slice(b"\n%%EOF\n");
        let path = write(tmp.path(), "big.pdf", &bytes);

        assert!(validate_pdf(&path).is_ok());
    }

    #[test]
    fn test_empty_file() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "empty.pdf", b"");

        let err = validate_pdf(&path).unwrap_err();

        assert!(matches!(err, GenerationError::InvalidPdf { ref reason, .. } if reason == "file is empty"));
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();

        let err = validate_pdf(&tmp.path().join("none.pdf")).unwrap_err();

        assert!(matches!(err, GenerationError::InvalidPdf { .. }));
    }

    #[test]
    fn test_wrong_signature() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "fake.pdf", b"<html>%%EOF</html>");

        let err = validate_pdf(&path).unwrap_err();

        assert!(err.to_string().contains("missing %PDF- signature"));
    }

    #[test]
    fn test_truncated_file() {
        let tmp = TempDir::new().unwrap();
        let mut bytes = b"%PDF-1.5\n".to_vec();
        bytes.extend(std::iter::repeat_n(b'x', 4096));
        let path = write(tmp.path(), "cut.pdf", &bytes);

        let err = validate_pdf(&path).unwrap_err();

        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_persist_moves_file() {
        let tmp = TempDir::new().unwrap();
        let source = write(tmp.path(), "gen.pdf", MINIMAL_PDF);
        let destination = tmp.path().join("out").join("final.pdf");
        fs::create_dir_all(destination.parent().unwrap()).unwrap();

        persist(&source, &destination).unwrap();

        assert_eq!(fs::read(&destination).unwrap(), MINIMAL_PDF);
        assert!(!source.exists());
    }

    #[test]
    fn test_persist_replaces_existing() {
        let tmp = TempDir::new().unwrap();
        let source = write(tmp.path(), "gen.pdf", MINIMAL_PDF);
        let destination = write(tmp.path(), "final.pdf", b"old");

        persist(&source, &destination).unwrap();

        assert_eq!(fs::read(&destination).unwrap(), MINIMAL_PDF);
    }
}

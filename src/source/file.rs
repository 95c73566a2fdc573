//! Snapshot files on disk.

use super::SourceError;
use crate::models::Snapshot;
use std::path::Path;
use tracing::debug;

/// Read a `{ "templates": [...], "instances": [...] }` snapshot file.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let snapshot: Snapshot =
        serde_json::from_str(&content).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        "Read {} templates and {} instances from {}",
        snapshot.templates.len(),
        snapshot.instances.len(),
        path.display()
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_snapshot() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "templates": [{{"id": 1, "name": "Spring peel", "type": "treatment", "value": 1200}}],
                "instances": [
                    {{"id": 10, "templateId": 1, "customerId": 5, "customerName": "Mei", "status": "redeemed"}}
                ]
            }}"#
        )
        .unwrap();

        let snapshot = read_snapshot(file.path()).unwrap();

        assert_eq!(snapshot.templates.len(), 1);
        assert_eq!(snapshot.instances.len(), 1);
        assert!(snapshot.instances[0].is_redeemed());
    }

    #[test]
    fn test_read_snapshot_missing_sections() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();

        let snapshot = read_snapshot(file.path()).unwrap();

        assert!(snapshot.templates.is_empty());
        assert!(snapshot.instances.is_empty());
    }

    #[test]
    fn test_read_snapshot_errors() {
        let missing = read_snapshot(Path::new("/nonexistent/snapshot.json"));
        assert!(matches!(missing, Err(SourceError::Read { .. })));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let invalid = read_snapshot(file.path());
        assert!(matches!(invalid, Err(SourceError::Parse { .. })));
    }
}

//! Library manifest loading.
//!
//! A manifest is a headerless CSV file, one reference image per line:
//!
//! ```text
//! # path, group, [latitude, longitude]
//! photos/museum_front.jpg, 1, 48.8606, 2.3376
//! photos/museum_side.jpg, 1
//! photos/bridge.jpg, 2, 48.8566, 2.3522
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use tracing::debug;

use crate::library::{GeoPoint, GroupId, LibraryEntry};

/// Read every entry of the manifest at `csv_path`.
pub fn load_manifest<P: AsRef<Path>>(csv_path: P) -> Result<Vec<LibraryEntry>> {
    let csv_path = csv_path.as_ref();
    let base_dir = csv_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut entries = Vec::new();
    for (index, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let line = rec.position().map_or(index as u64 + 1, |p| p.line());

        let raw_path = rec.get(0).map(str::trim).unwrap_or_default();
        if raw_path.is_empty() {
            continue;
        }
        let Some(raw_group) = rec.get(1).map(str::trim).filter(|g| !g.is_empty()) else {
            bail!("Missing group id for {} on line {}", raw_path, line);
        };
        let path = resolve(&base_dir, raw_path);
        let group: u64 = raw_group
            .parse()
            .with_context(|| format!("Bad group id on line {}", line))?;

        let location = match (rec.get(2).map(str::trim), rec.get(3).map(str::trim)) {
            (Some(lat), Some(lon)) if !lat.is_empty() && !lon.is_empty() => {
                let latitude: f64 = lat
                    .parse()
                    .with_context(|| format!("Bad latitude on line {}", line))?;
                let longitude: f64 = lon
                    .parse()
                    .with_context(|| format!("Bad longitude on line {}", line))?;
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    bail!("Location out of range on line {}: {}, {}", line, latitude, longitude);
                }
                Some(GeoPoint::new(latitude, longitude))
            }
            _ => None,
        };

        entries.push(LibraryEntry {
            path,
            group: GroupId::new(group),
            location,
        });
    }

    debug!(entries = entries.len(), manifest = %csv_path.display(), "loaded manifest");
    Ok(entries)
}

fn resolve(base_dir: &Path, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn manifest(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_manifest() {
        let file = manifest(
            "# path, group, lat, lon\n\
             a.jpg, 1, 48.8606, 2.3376\n\
             b.jpg, 1\n\
             /abs/c.jpg, 2, , \n",
        );
        let entries = load_manifest(file.path()).unwrap();
        assert_eq!(entries.len(), 3);

        let dir = file.path().parent().unwrap();
        assert_eq!(entries[0].path, dir.join("a.jpg"));
        assert_eq!(entries[0].group, GroupId::new(1));
        assert_eq!(entries[0].location, Some(GeoPoint::new(48.8606, 2.3376)));
        assert_eq!(entries[1].location, None);
        assert_eq!(entries[2].path, PathBuf::from("/abs/c.jpg"));
        assert_eq!(entries[2].location, None);
    }

    #[test]
    fn test_bad_group_fails() {
        let file = manifest("a.jpg, museum\n");
        assert!(load_manifest(file.path()).is_err());
    }

    #[test]
    fn test_missing_group_fails() {
        let file = manifest("a.jpg, 1\nforgot_group.jpg\nc.jpg, 3\n");
        let err = load_manifest(file.path()).unwrap_err();
        assert!(err.to_string().contains("forgot_group.jpg"));

        let file = manifest("a.jpg, 1\nb.jpg, \n");
        assert!(load_manifest(file.path()).is_err());
    }

    #[test]
    fn test_errors_report_file_line() {
        let file = manifest("# path, group\n# second comment\na.jpg, 1\nb.jpg, museum\n");
        let err = load_manifest(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 4"), "{err}");
    }

    #[test]
    fn test_out_of_range_location_fails() {
        let file = manifest("a.jpg, 1, 95.0, 2.0\n");
        assert!(load_manifest(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load_manifest("/definitely/not/here.csv").is_err());
    }
}

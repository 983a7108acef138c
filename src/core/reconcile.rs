use crate::core::catalog::Catalog;
use crate::core::hash::{ContentHash, HashError, HashService};
use indicatif::ProgressBar;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Image directory {path:?} does not exist")]
    MissingDirectory { path: PathBuf },

    #[error("Failed to list {path:?}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to hash {path:?}: {source}")]
    Hash { path: PathBuf, source: HashError },
}

/// Split `filename` at its last `.` into base name and extension.
///
/// `None` when there is no `.` or either side would be empty.
pub fn split_extension(filename: &str) -> Option<(&str, &str)> {
    match filename.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => Some((base, ext)),
        _ => None,
    }
}

/// Names of the regular files directly inside `dir`.
pub fn scan_directory(dir: &Path) -> Result<BTreeSet<String>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut images = BTreeSet::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => {
                images.insert(name.to_string());
            }
            None => tracing::warn!("skipping non UTF-8 file name {:?}", entry.path()),
        }
    }
    Ok(images)
}

/// Every `{base}.{ext}` file name the catalog accounts for.
pub fn expand_catalog(catalog: &Catalog) -> BTreeSet<String> {
    catalog
        .iter()
        .flat_map(|(base, entry)| entry.extensions.iter().map(move |ext| format!("{base}.{ext}")))
        .collect()
}

pub fn diff_new_images(on_disk: &BTreeSet<String>, catalogued: &BTreeSet<String>) -> BTreeSet<String> {
    on_disk.difference(catalogued).cloned().collect()
}

/// Filesystem state compared against catalog state.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub on_disk: BTreeSet<String>,
    pub catalogued: BTreeSet<String>,
    pub new_images: BTreeSet<String>,
}

impl Reconciliation {
    pub fn compute(images_dir: &Path, catalog: &Catalog) -> Result<Self, ScanError> {
        let on_disk = scan_directory(images_dir)?;
        let catalogued = expand_catalog(catalog);
        let new_images = diff_new_images(&on_disk, &catalogued);
        tracing::debug!(
            on_disk = on_disk.len(),
            catalogued = catalogued.len(),
            new = new_images.len(),
            "reconciled {}",
            images_dir.display()
        );
        Ok(Self {
            on_disk,
            catalogued,
            new_images,
        })
    }

    /// Catalogued files that are no longer on disk.
    pub fn missing(&self) -> impl Iterator<Item = &String> {
        self.catalogued.difference(&self.on_disk)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateVerdict {
    /// Both copies are catalogued. Left for the operator to sort out.
    BothCatalogued,
    RemoveImage,
    RemoveOther,
    RemoveEither,
}

/// Two files with identical content. `other` is the one seen first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePair {
    pub image: String,
    pub other: String,
    pub image_catalogued: bool,
    pub other_catalogued: bool,
}

impl DuplicatePair {
    pub fn verdict(&self) -> DuplicateVerdict {
        match (self.image_catalogued, self.other_catalogued) {
            (true, true) => DuplicateVerdict::BothCatalogued,
            (true, false) => DuplicateVerdict::RemoveOther,
            (false, true) => DuplicateVerdict::RemoveImage,
            (false, false) => DuplicateVerdict::RemoveEither,
        }
    }

    pub fn describe(&self, images_dir: &Path) -> DuplicateDescription<'_> {
        DuplicateDescription {
            pair: self,
            images_dir: images_dir.to_path_buf(),
        }
    }
}

/// Two-line human report for a duplicate pair.
pub struct DuplicateDescription<'a> {
    pair: &'a DuplicatePair,
    images_dir: PathBuf,
}

impl fmt::Display for DuplicateDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pair = self.pair;
        writeln!(
            f,
            "Files identical: '{}' and '{}'",
            self.images_dir.join(&pair.image).display(),
            self.images_dir.join(&pair.other).display()
        )?;
        match pair.verdict() {
            DuplicateVerdict::BothCatalogued => write!(f, " Both already in catalog. :/"),
            DuplicateVerdict::RemoveOther => write!(f, " Remove: {}", pair.other),
            DuplicateVerdict::RemoveImage => write!(f, " Remove: {}", pair.image),
            DuplicateVerdict::RemoveEither => {
                write!(f, " Both are not in catalog. Remove one of them.")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateReport {
    pub pairs: Vec<DuplicatePair>,
}

impl DuplicateReport {
    pub fn has_duplicates(&self) -> bool {
        !self.pairs.is_empty()
    }
}

/// Hash every file in `all_images` (read from `images_dir`) and pair each
/// repeat of a hash with the first file that produced it.
pub fn find_duplicates(
    images_dir: &Path,
    catalog_images: &BTreeSet<String>,
    all_images: &BTreeSet<String>,
    hash_service: &HashService,
    progress: &ProgressBar,
) -> Result<DuplicateReport, ScanError> {
    let mut first_seen: HashMap<ContentHash, &String> = HashMap::new();
    let mut report = DuplicateReport::default();

    for image in all_images {
        let path = images_dir.join(image);
        let hash = hash_service
            .compute_content_hash(&path)
            .map_err(|source| ScanError::Hash { path, source })?;
        progress.inc(1);

        if let Some(other) = first_seen.get(&hash) {
            tracing::debug!(%hash, "{} duplicates {}", image, other);
            report.pairs.push(DuplicatePair {
                image: image.clone(),
                other: (*other).clone(),
                image_catalogued: catalog_images.contains(image),
                other_catalogued: catalog_images.contains(*other),
            });
        } else {
            first_seen.insert(hash, image);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::CatalogEntry;
    use std::fs;
    use tempfile::TempDir;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn catalog_with(entries: &[(&str, &[&str])]) -> Catalog {
        let mut catalog = Catalog::new();
        for (base, exts) in entries {
            let mut entry = CatalogEntry::new(exts[0], "tag");
            entry.extensions = exts.iter().map(|e| e.to_string()).collect();
            catalog.insert(*base, entry);
        }
        catalog
    }

    fn duplicates(dir: &Path, catalogued: &[&str]) -> DuplicateReport {
        let all = scan_directory(dir).unwrap();
        find_duplicates(
            dir,
            &names(catalogued),
            &all,
            &HashService::new(),
            &ProgressBar::hidden(),
        )
        .unwrap()
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("photo.jpg"), Some(("photo", "jpg")));
        assert_eq!(split_extension("photo.v2.png"), Some(("photo.v2", "png")));
        assert_eq!(split_extension("README"), None);
        assert_eq!(split_extension("trailing."), None);
        assert_eq!(split_extension(".hidden"), None);
    }

    #[test]
    fn test_scan_directory_is_flat() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"a").unwrap();
        fs::write(temp_dir.path().join("README"), b"r").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("b.jpg"), b"b").unwrap();

        assert_eq!(scan_directory(temp_dir.path()).unwrap(), names(&["README", "a.jpg"]));
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_directory(&temp_dir.path().join("images"));
        assert!(matches!(result, Err(ScanError::MissingDirectory { .. })));
    }

    #[test]
    fn test_expand_catalog() {
        let catalog = catalog_with(&[("photo", &["jpg", "png"][..]), ("map.v2", &["svg"][..])]);
        assert_eq!(
            expand_catalog(&catalog),
            names(&["map.v2.svg", "photo.jpg", "photo.png"])
        );
    }

    #[test]
    fn test_diff_new_images() {
        let catalog = catalog_with(&[("photo", &["jpg"][..]), ("gone", &["gif"][..])]);
        let on_disk = names(&["photo.jpg", "photo.png", "other.jpg", "README"]);

        let new_images = diff_new_images(&on_disk, &expand_catalog(&catalog));

        assert_eq!(new_images, names(&["README", "other.jpg", "photo.png"]));
    }

    #[test]
    fn test_reconciliation_reports_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("photo.jpg"), b"p").unwrap();
        let catalog = catalog_with(&[("photo", &["jpg"][..]), ("gone", &["gif"][..])]);

        let rec = Reconciliation::compute(temp_dir.path(), &catalog).unwrap();

        assert!(rec.new_images.is_empty());
        assert_eq!(rec.missing().collect::<Vec<_>>(), vec!["gone.gif"]);
    }

    #[test]
    fn test_find_duplicates_flags_only_identical_pair() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"same").unwrap();
        fs::write(temp_dir.path().join("b.jpg"), b"same").unwrap();
        fs::write(temp_dir.path().join("c.jpg"), b"different").unwrap();

        let report = duplicates(temp_dir.path(), &[]);

        assert!(report.has_duplicates());
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].image, "b.jpg");
        assert_eq!(report.pairs[0].other, "a.jpg");
        assert_eq!(report.pairs[0].verdict(), DuplicateVerdict::RemoveEither);
    }

    #[test]
    fn test_no_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"one").unwrap();
        fs::write(temp_dir.path().join("b.jpg"), b"two").unwrap();

        assert!(!duplicates(temp_dir.path(), &[]).has_duplicates());
    }

    #[test]
    fn test_duplicate_verdicts() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), b"same").unwrap();
        fs::write(temp_dir.path().join("b.jpg"), b"same").unwrap();

        let cases = [
            (vec!["a.jpg", "b.jpg"], DuplicateVerdict::BothCatalogued, " Both already in catalog. :/"),
            (vec!["a.jpg"], DuplicateVerdict::RemoveImage, " Remove: b.jpg"),
            (vec!["b.jpg"], DuplicateVerdict::RemoveOther, " Remove: a.jpg"),
            (vec![], DuplicateVerdict::RemoveEither, " Both are not in catalog. Remove one of them."),
        ];
        for (catalogued, verdict, advice) in cases {
            let report = duplicates(temp_dir.path(), &catalogued);
            let pair = &report.pairs[0];
            assert_eq!(pair.verdict(), verdict);

            let text = pair.describe(Path::new("images")).to_string();
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(lines[0], "Files identical: 'images/b.jpg' and 'images/a.jpg'");
            assert_eq!(lines[1], advice);
        }
    }

    #[test]
    fn test_three_copies_pair_with_first() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            fs::write(temp_dir.path().join(name), b"same").unwrap();
        }

        let report = duplicates(temp_dir.path(), &[]);

        let pairs: Vec<(&str, &str)> = report
            .pairs
            .iter()
            .map(|p| (p.image.as_str(), p.other.as_str()))
            .collect();
        assert_eq!(pairs, vec![("b.png", "a.png"), ("c.png", "a.png")]);
    }
}

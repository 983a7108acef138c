use crate::core::catalog::{Catalog, CatalogError};
use crate::core::classify::EntryClassifier;
use crate::core::hash::HashService;
use crate::core::prompt::{PromptError, Prompter};
use crate::core::reconcile::{DuplicateReport, Reconciliation, ScanError, find_duplicates};
use indicatif::style::TemplateError;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Progress bar template error: {0}")]
    Progress(#[from] TemplateError),
}

impl AppError {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, AppError::Prompt(PromptError::Interrupted))
    }
}

/// Where the catalog and its images live.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_file: PathBuf,
    pub images_dir: PathBuf,
}

/// How an update run ended. Only `Written` touches the catalog file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    DuplicatesFound { pairs: usize },
    NothingNew { catalogued: usize },
    Declined,
    Written { added: usize },
}

/// Catalog plus everything learned about the image directory.
struct Survey {
    catalog: Catalog,
    reconciliation: Reconciliation,
    duplicates: DuplicateReport,
}

fn survey(settings: &Settings) -> Result<Survey, AppError> {
    let catalog = Catalog::load(&settings.data_file)?;
    let reconciliation = Reconciliation::compute(&settings.images_dir, &catalog)?;
    for missing in reconciliation.missing() {
        tracing::warn!("catalogued file {} not found in {}", missing, settings.images_dir.display());
    }

    let progress = hashing_progress(reconciliation.on_disk.len() as u64)?;
    let duplicates = find_duplicates(
        &settings.images_dir,
        &reconciliation.catalogued,
        &reconciliation.on_disk,
        &HashService::new(),
        &progress,
    )?;
    progress.finish_and_clear();

    Ok(Survey {
        catalog,
        reconciliation,
        duplicates,
    })
}

fn hashing_progress(len: u64) -> Result<ProgressBar, TemplateError> {
    let progress = ProgressBar::new(len);
    progress.set_style(ProgressStyle::with_template(
        "{spinner:.green} Hashing images [{bar:30}] {pos}/{len}",
    )?);
    Ok(progress)
}

fn print_duplicates(report: &DuplicateReport, images_dir: &Path) {
    for pair in &report.pairs {
        println!("{}", pair.describe(images_dir));
    }
}

/// The interactive run: classify every image not yet in the catalog, then
/// rewrite the catalog. Nothing is written unless classification starts.
pub fn run_update<P: Prompter>(settings: &Settings, prompter: &mut P) -> Result<Outcome, AppError> {
    let Survey {
        mut catalog,
        reconciliation,
        duplicates,
    } = survey(settings)?;

    if duplicates.has_duplicates() {
        print_duplicates(&duplicates, &settings.images_dir);
        println!("Please remove duplicate files first!");
        return Ok(Outcome::DuplicatesFound {
            pairs: duplicates.pairs.len(),
        });
    }

    let new_images = &reconciliation.new_images;
    if new_images.is_empty() {
        let catalogued = reconciliation.catalogued.len();
        println!("Read {} entries, no new images => abort", catalogued);
        return Ok(Outcome::NothingNew { catalogued });
    }

    let question = format!("Start to add {} new images?", new_images.len());
    if !prompter.confirm(&question, true)? {
        return Ok(Outcome::Declined);
    }

    let total = new_images.len();
    let mut added = 0;
    let mut classifier = EntryClassifier::new(prompter, &settings.images_dir);
    for (i, image) in new_images.iter().enumerate() {
        added += classifier.classify(i + 1, total, &mut catalog, image)?;
    }

    // Written even when nothing was added; this also normalizes hand edits.
    catalog.save(&settings.data_file)?;
    tracing::info!(added, "catalog updated");
    println!(
        "Wrote {} new entries to {} => done",
        added,
        settings.data_file.display()
    );
    Ok(Outcome::Written { added })
}

/// Non-interactive dry run of the update pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub duplicate_pairs: usize,
    pub new_images: Vec<String>,
    pub missing: Vec<String>,
}

pub fn run_check(settings: &Settings) -> Result<CheckSummary, AppError> {
    let Survey {
        reconciliation,
        duplicates,
        ..
    } = survey(settings)?;

    print_duplicates(&duplicates, &settings.images_dir);
    let summary = CheckSummary {
        duplicate_pairs: duplicates.pairs.len(),
        new_images: reconciliation.new_images.iter().cloned().collect(),
        missing: reconciliation.missing().cloned().collect(),
    };

    for image in &summary.new_images {
        println!("new: {}", settings.images_dir.join(image).display());
    }
    for image in &summary.missing {
        println!("missing: {}", settings.images_dir.join(image).display());
    }
    println!(
        "{} catalogued files, {} new, {} missing, {} duplicate pair(s)",
        reconciliation.catalogued.len(),
        summary.new_images.len(),
        summary.missing.len(),
        summary.duplicate_pairs
    );
    Ok(summary)
}

/// Rewrite the catalog in normalized form without looking at any images.
pub fn run_format(settings: &Settings) -> Result<usize, AppError> {
    let catalog = Catalog::load(&settings.data_file)?;
    catalog.save(&settings.data_file)?;
    println!(
        "Formatted {} entries in {}",
        catalog.len(),
        settings.data_file.display()
    );
    Ok(catalog.len())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub entries: usize,
    pub files: usize,
    pub by_license: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
}

impl CatalogStats {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut stats = CatalogStats {
            entries: catalog.len(),
            ..Default::default()
        };
        for (_, entry) in catalog.iter() {
            stats.files += entry.extensions.len();
            let license = entry.license.map_or("(none)", |l| l.as_str());
            *stats.by_license.entry(license.to_string()).or_default() += 1;
            let language = entry.language.map_or("(none)", |l| l.as_str());
            *stats.by_language.entry(language.to_string()).or_default() += 1;
        }
        stats
    }
}

pub fn run_stats(settings: &Settings) -> Result<CatalogStats, AppError> {
    let stats = CatalogStats::from_catalog(&Catalog::load(&settings.data_file)?);

    println!("{} entries, {} files", stats.entries, stats.files);
    println!("License:");
    for (license, count) in &stats.by_license {
        println!("   {license}: {count}");
    }
    println!("Language:");
    for (language, count) in &stats.by_language {
        println!("   {language}: {count}");
    }
    Ok(stats)
}

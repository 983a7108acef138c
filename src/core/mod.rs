pub mod catalog;
pub mod classify;
pub mod hash;
pub mod prompt;
pub mod reconcile;
pub mod validate;

pub use catalog::{Catalog, CatalogEntry, CatalogError, Language, License};
pub use classify::EntryClassifier;
pub use hash::{ContentHash, HashService};
pub use prompt::{PromptError, Prompter, TerminalPrompter};
pub use reconcile::{DuplicatePair, DuplicateReport, DuplicateVerdict, Reconciliation, ScanError};

use crate::core::catalog::{Catalog, CatalogEntry};
use crate::core::prompt::{PromptError, Prompter};
use crate::core::reconcile::split_extension;
use crate::core::validate::{
    Verdict, check_author, check_language, check_license, check_tags, check_title,
};
use std::path::Path;

/// Field values while an entry is being classified. Empty means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Draft {
    tags: String,
    title: String,
    author: String,
    license: String,
    language: String,
}

impl Draft {
    fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            tags: entry.tags.clone(),
            title: entry.title.clone().unwrap_or_default(),
            author: entry.author.clone().unwrap_or_default(),
            license: entry.license.map(|l| l.to_string()).unwrap_or_default(),
            language: entry.language.map(|l| l.to_string()).unwrap_or_default(),
        }
    }

    /// Only call once every field has passed its validator.
    fn into_entry(self, extension: &str) -> CatalogEntry {
        let mut entry = CatalogEntry::new(extension, self.tags);
        entry.title = non_empty(self.title);
        entry.author = non_empty(self.author);
        entry.license = non_empty(self.license).and_then(|l| l.parse().ok());
        entry.language = non_empty(self.language).and_then(|l| l.parse().ok());
        entry
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Decides how a single new image enters the catalog, asking the operator
/// for whatever cannot be inferred.
pub struct EntryClassifier<'a, P: Prompter> {
    prompter: &'a mut P,
    images_dir: &'a Path,
}

impl<'a, P: Prompter> EntryClassifier<'a, P> {
    pub fn new(prompter: &'a mut P, images_dir: &'a Path) -> Self {
        Self {
            prompter,
            images_dir,
        }
    }

    /// Classify `filename`, returning how many catalog changes were made
    /// (0 or 1). The catalog is only touched after the operator confirms.
    pub fn classify(
        &mut self,
        index: usize,
        total: usize,
        catalog: &mut Catalog,
        filename: &str,
    ) -> Result<usize, PromptError> {
        println!("[{}/{}] '{}'", index, total, self.images_dir.join(filename).display());

        let Some((base_name, extension)) = split_extension(filename) else {
            println!("File has no extension => ignore");
            return Ok(0);
        };

        if let Some(entry) = catalog.get_mut(base_name) {
            let question = format!(
                "Image exists as different type {:?}. Add {} as new type?",
                entry.extensions, extension
            );
            if self.prompter.confirm(&question, true)? {
                entry.extensions.push(extension.to_string());
                println!("done");
                return Ok(1);
            }
            println!("ignore");
            return Ok(0);
        }

        let mut draft = match catalog.find_variant(base_name) {
            Some((key, entry)) => {
                tracing::debug!("prefilling {} from {}", filename, key);
                Draft::from_entry(entry)
            }
            None => Draft::default(),
        };

        loop {
            draft.tags = self.ask("Tags", check_tags, &draft.tags)?;
            draft.title = self.ask("Title", check_title, &draft.title)?;
            draft.author = self.ask("Author", check_author, &draft.author)?;
            draft.license = self.ask("License", check_license, &draft.license)?;
            draft.language = self.ask("Language", check_language, &draft.language)?;

            if self.prompter.confirm("Done?", true)? {
                break;
            }
        }

        catalog.insert(base_name, draft.into_entry(extension));
        println!("done");
        Ok(1)
    }

    /// Re-ask until `check` passes, offering the rejected text for editing.
    fn ask(
        &mut self,
        prompt: &str,
        check: fn(&str) -> Verdict,
        prefill: &str,
    ) -> Result<String, PromptError> {
        let mut prefill = prefill.to_string();
        loop {
            let answer = self.prompter.input(prompt, &prefill)?;
            let value = answer.trim();
            match check(value) {
                Ok(()) => return Ok(value.to_string()),
                Err(guidance) => {
                    println!("{guidance}");
                    prefill = value.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Language, License};
    use crate::core::prompt::scripted::{Answer, ScriptedPrompter, text};

    fn photo_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert("photo", CatalogEntry::new("jpg", "x"));
        catalog
    }

    fn classify(prompter: &mut ScriptedPrompter, catalog: &mut Catalog, filename: &str) -> usize {
        EntryClassifier::new(prompter, Path::new("images"))
            .classify(1, 1, catalog, filename)
            .unwrap()
    }

    #[test]
    fn test_new_extension_accepted() {
        let mut catalog = photo_catalog();
        let mut prompter = ScriptedPrompter::new([Answer::Keep]);

        assert_eq!(classify(&mut prompter, &mut catalog, "photo.png"), 1);

        let entry = catalog.get("photo").unwrap();
        assert_eq!(entry.extensions, vec!["jpg", "png"]);
        assert_eq!(entry.tags, "x");
        assert_eq!(catalog.len(), 1);
        assert_eq!(prompter.asked[0].1, "true");
    }

    #[test]
    fn test_new_extension_declined() {
        let mut catalog = photo_catalog();
        let mut prompter = ScriptedPrompter::new([Answer::No]);

        assert_eq!(classify(&mut prompter, &mut catalog, "photo.png"), 0);
        assert_eq!(catalog, photo_catalog());
    }

    #[test]
    fn test_file_without_extension_is_skipped() {
        let mut catalog = photo_catalog();
        let mut prompter = ScriptedPrompter::new([]);

        assert_eq!(classify(&mut prompter, &mut catalog, "README"), 0);
        assert_eq!(catalog, photo_catalog());
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_new_entry_keeps_only_non_empty_fields() {
        let mut catalog = Catalog::new();
        let mut prompter = ScriptedPrompter::new([
            text("  beach, sunset "),
            text("Evening"),
            text(""),
            text("CC0-1.0"),
            text(""),
            Answer::Yes,
        ]);

        assert_eq!(classify(&mut prompter, &mut catalog, "shore.jpg"), 1);

        let entry = catalog.get("shore").unwrap();
        assert_eq!(entry.extensions, vec!["jpg"]);
        assert_eq!(entry.tags, "beach, sunset");
        assert_eq!(entry.title.as_deref(), Some("Evening"));
        assert_eq!(entry.author, None);
        assert_eq!(entry.license, Some(License::Cc0));
        assert_eq!(entry.language, None);
    }

    #[test]
    fn test_rejected_value_is_offered_again() {
        let mut catalog = Catalog::new();
        let mut prompter = ScriptedPrompter::new([
            text(""),
            text("Foo"),
            text("foo"),
            Answer::Keep,
            Answer::Keep,
            text("MIT"),
            text(""),
            text("klingon"),
            text("english"),
            Answer::Keep,
        ]);

        assert_eq!(classify(&mut prompter, &mut catalog, "x.png"), 1);

        let prefills: Vec<&str> = prompter.asked.iter().map(|(_, p)| p.as_str()).collect();
        assert_eq!(
            prefills,
            vec!["", "", "Foo", "", "", "", "MIT", "", "klingon", "true"]
        );
        let entry = catalog.get("x").unwrap();
        assert_eq!(entry.tags, "foo");
        assert_eq!(entry.license, None);
        assert_eq!(entry.language, Some(Language::English));
    }

    #[test]
    fn test_not_done_restarts_with_previous_answers() {
        let mut catalog = Catalog::new();
        let mut prompter = ScriptedPrompter::new([
            text("cat"),
            text("Tom"),
            Answer::Keep,
            Answer::Keep,
            Answer::Keep,
            Answer::No,
            Answer::Keep,
            text("Tom the cat"),
            Answer::Keep,
            Answer::Keep,
            text("german"),
            Answer::Yes,
        ]);

        assert_eq!(classify(&mut prompter, &mut catalog, "tom.gif"), 1);

        assert_eq!(prompter.asked[6], ("Tags".to_string(), "cat".to_string()));
        assert_eq!(prompter.asked[7], ("Title".to_string(), "Tom".to_string()));
        let entry = catalog.get("tom").unwrap();
        assert_eq!(entry.title.as_deref(), Some("Tom the cat"));
        assert_eq!(entry.language, Some(Language::German));
    }

    #[test]
    fn test_defaults_come_from_dotted_variant() {
        let mut catalog = Catalog::new();
        let mut variant = CatalogEntry::new("jpg", "river");
        variant.author = Some("Ida".to_string());
        variant.language = Some(Language::Dutch);
        catalog.insert("river.small", variant);
        catalog.insert("river2", CatalogEntry::new("jpg", "unrelated"));
        let mut prompter = ScriptedPrompter::new([
            Answer::Keep,
            Answer::Keep,
            Answer::Keep,
            Answer::Keep,
            Answer::Keep,
            Answer::Keep,
        ]);

        assert_eq!(classify(&mut prompter, &mut catalog, "river.png"), 1);

        assert_eq!(prompter.asked[0].1, "river");
        assert_eq!(prompter.asked[2].1, "Ida");
        assert_eq!(prompter.asked[4].1, "dutch");
        let entry = catalog.get("river").unwrap();
        assert_eq!(entry.extensions, vec!["png"]);
        assert_eq!(entry.author.as_deref(), Some("Ida"));
        assert_eq!(entry.language, Some(Language::Dutch));
    }

    #[test]
    fn test_interrupt_leaves_catalog_untouched() {
        let mut catalog = Catalog::new();
        let mut prompter = ScriptedPrompter::new([text("dog"), Answer::Interrupt]);

        let result = EntryClassifier::new(&mut prompter, Path::new("images"))
            .classify(1, 1, &mut catalog, "dog.jpg");

        assert!(matches!(result, Err(PromptError::Interrupted)));
        assert!(catalog.is_empty());
    }
}

//! Filter context construction.
//!
//! Catalog membership is resolved once per run by loading the existing
//! gamelist's entry names into a set; per-entry media checks are O(1)
//! stat calls against the fixed media tree.

use std::collections::{HashMap, HashSet};

use rom_scout_frontend::{EsDeGenerator, MediaKind, normalize_base_name};

use crate::filter::FilterContext;

/// Builds a [`FilterContext`] per candidate entry.
pub struct FilterContextBuilder<'a> {
    generator: &'a EsDeGenerator,
    existing_names: HashSet<String>,
    configured_kinds: Vec<MediaKind>,
}

impl<'a> FilterContextBuilder<'a> {
    /// Load the existing catalog names once; subsequent `build` calls do
    /// only filesystem stats.
    pub fn new(generator: &'a EsDeGenerator, configured_kinds: Vec<MediaKind>) -> Self {
        Self {
            existing_names: generator.existing_entry_names(),
            generator,
            configured_kinds,
        }
    }

    /// Compute the facts for one entry, keyed by its base name.
    pub fn build(&self, entry_name: &str) -> FilterContext {
        let base_name = normalize_base_name(entry_name);
        let has_metadata = self.existing_names.contains(&base_name);

        // Every kind is checked (not just configured ones) so a filter can
        // reference kinds outside the configured set.
        let mut has_media = HashMap::new();
        for &kind in MediaKind::all() {
            has_media.insert(kind, self.generator.media_exists(kind, &base_name));
        }

        FilterContext {
            base_name,
            has_metadata,
            has_media,
            configured_kinds: self.configured_kinds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rom_scout_frontend::GamelistEntry;

    #[test]
    fn metadata_and_media_facts_reflect_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let generator = EsDeGenerator::new(
            dir.path().join("gamelist.xml"),
            dir.path().join("media"),
            false,
        );

        // Seed a catalog with entry A and a cover for A.
        generator
            .merge_and_write(vec![GamelistEntry {
                path: "./Game A.md".to_string(),
                name: "Game A".to_string(),
                ..Default::default()
            }])
            .unwrap();
        generator
            .write_media(MediaKind::Cover, "game a", "png", b"img")
            .unwrap();

        let builder = FilterContextBuilder::new(&generator, vec![MediaKind::Cover]);

        let ctx_a = builder.build("Game A.md");
        assert_eq!(ctx_a.base_name, "game a");
        assert!(ctx_a.has_metadata);
        assert!(ctx_a.has_media[&MediaKind::Cover]);

        let ctx_b = builder.build("Game B.md");
        assert!(!ctx_b.has_metadata);
        assert!(!ctx_b.has_media[&MediaKind::Cover]);
    }

    #[test]
    fn missing_gamelist_means_no_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let generator = EsDeGenerator::new(
            dir.path().join("gamelist.xml"),
            dir.path().join("media"),
            false,
        );
        let builder = FilterContextBuilder::new(&generator, vec![MediaKind::Cover]);
        assert!(!builder.build("Anything.md").has_metadata);
    }
}

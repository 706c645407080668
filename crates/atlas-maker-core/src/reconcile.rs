use crate::atlas::AtlasAsset;
use crate::catalog::AssetCatalog;
use crate::source::{Action, SourceEntry, SourceImage};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, trace};

/// Tracks the build session for one target atlas: one entry per region name.
#[derive(Debug, Default)]
pub struct Reconciler {
    entries: Vec<SourceEntry>,
    target: Option<PathBuf>,
}

/// Number of entries per action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub include: usize,
    pub add: usize,
    pub update: usize,
    pub delete: usize,
    pub ignore: usize,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity (asset path) of the atlas the entries were reconciled against.
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Re-derive all entries from the current atlas and the full new selection.
    /// Switching to a different atlas also drops user delete flags.
    pub fn reconcile(
        &mut self,
        selection: &[SourceImage],
        atlas: Option<&AtlasAsset>,
        catalog: &dyn AssetCatalog,
    ) {
        let identity = atlas.map(|a| a.asset_path().to_path_buf());
        let atlas_changed = identity != self.target;
        self.target = identity;
        let previous = std::mem::take(&mut self.entries);
        self.entries = reconcile_entries(previous, selection, atlas, catalog, atlas_changed);
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SourceEntry> {
        self.entries
    }

    pub fn get(&self, name: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Flag or unflag an entry for removal. Returns false if no entry has that name.
    pub fn set_delete(&mut self, name: &str, delete: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(e) => {
                e.delete = delete;
                true
            }
            None => false,
        }
    }

    /// Flip the delete flag; returns the new value.
    pub fn toggle_delete(&mut self, name: &str) -> Option<bool> {
        let e = self.entries.iter_mut().find(|e| e.name == name)?;
        e.delete = !e.delete;
        Some(e.delete)
    }

    /// Entries the next rebuild packs, in display order.
    pub fn included(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries.iter().filter(|e| e.is_included())
    }

    /// True if a rebuild would change the atlas.
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.is_changed())
    }

    pub fn counts(&self) -> ActionCounts {
        ActionCounts::from_entries(&self.entries)
    }
}

impl ActionCounts {
    pub fn from_entries(entries: &[SourceEntry]) -> Self {
        let mut c = Self::default();
        for e in entries {
            match e.action() {
                Action::Include => c.include += 1,
                Action::Add => c.add += 1,
                Action::Update => c.update += 1,
                Action::Delete => c.delete += 1,
                Action::Ignore => c.ignore += 1,
            }
        }
        c
    }
}

#[instrument(skip_all, fields(previous = previous.len(), selected = selection.len(), atlas_changed = atlas_changed))]
/// One reconciliation pass.
///
/// 1. Drop references carried from the previous pass; a new target atlas also resets delete flags.
/// 2. Attach every region of `atlas` to its same-named entry.
/// 3. Attach every selected source, expanding multi-image containers into their sub-images.
///    Selecting the atlas's own raster marks the entry ignored and is never expanded.
/// 4. Prune entries with neither an existing region nor a selected source.
/// 5. Sort: Add/Ignore entries last, then by name.
pub fn reconcile_entries(
    previous: Vec<SourceEntry>,
    selection: &[SourceImage],
    atlas: Option<&AtlasAsset>,
    catalog: &dyn AssetCatalog,
    atlas_changed: bool,
) -> Vec<SourceEntry> {
    let own_raster = atlas.map(|a| a.raster_path());
    let mut entries = previous;
    for e in &mut entries {
        e.existing = None;
        e.selected = None;
        e.ignore = false;
        if atlas_changed {
            e.delete = false;
        }
    }
    let mut index: HashMap<String, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.clone(), i))
        .collect();

    if let Some(atlas) = atlas {
        for src in atlas.sources() {
            let e = entry_mut(&mut entries, &mut index, src.name());
            if let SourceImage::SubImage { sprite, .. } = &src {
                e.border = sprite.border;
                e.pivot = sprite.pivot;
            }
            e.existing = Some(src);
        }
    }

    for src in selection {
        let is_own_raster = matches!(src, SourceImage::File { path }
            if own_raster.as_deref().is_some_and(|own| same_path(own, path)));
        if is_own_raster {
            debug!(path = ?src.path(), "selected the atlas's own raster, ignoring");
            let e = entry_mut(&mut entries, &mut index, src.name());
            e.selected = Some(src.clone());
            e.ignore = true;
            continue;
        }
        match src {
            SourceImage::File { path } => match catalog.sub_images(path).filter(|s| !s.is_empty()) {
                Some(sprites) => {
                    trace!(?path, count = sprites.len(), "expanding container");
                    for sprite in sprites {
                        attach_selected(
                            &mut entries,
                            &mut index,
                            SourceImage::sub_image(path.clone(), sprite),
                        );
                    }
                }
                None => attach_selected(&mut entries, &mut index, src.clone()),
            },
            SourceImage::SubImage { .. } => attach_selected(&mut entries, &mut index, src.clone()),
        }
    }

    entries.retain(|e| !e.is_unused());
    entries.sort_by(|a, b| {
        let la = matches!(a.action(), Action::Add | Action::Ignore);
        let lb = matches!(b.action(), Action::Add | Action::Ignore);
        la.cmp(&lb).then_with(|| a.name.cmp(&b.name))
    });
    entries
}

fn entry_mut<'a>(
    entries: &'a mut Vec<SourceEntry>,
    index: &mut HashMap<String, usize>,
    name: String,
) -> &'a mut SourceEntry {
    let i = match index.get(&name) {
        Some(&i) => i,
        None => {
            entries.push(SourceEntry::new(name.clone()));
            index.insert(name, entries.len() - 1);
            entries.len() - 1
        }
    };
    &mut entries[i]
}

fn attach_selected(
    entries: &mut Vec<SourceEntry>,
    index: &mut HashMap<String, usize>,
    src: SourceImage,
) {
    let e = entry_mut(entries, index, src.name());
    if let SourceImage::SubImage { sprite, .. } = &src {
        e.border = sprite.border;
        e.pivot = sprite.pivot;
    }
    e.ignore = false;
    e.selected = Some(src);
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

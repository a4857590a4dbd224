use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::analysis::groups::GroupId;
use crate::analysis::large_files;
use crate::asset::{Asset, AssetId};
use crate::error::Error;
use crate::library::{Library, Scope};

/// Which asset ids are currently selected. Keyed by id only, so an asset that
/// shows up in a duplicate group and a screenshot bucket has one selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: HashSet<AssetId>,
}

impl SelectionState {
    pub fn is_selected(&self, id: &AssetId) -> bool {
        self.selected.contains(id)
    }

    pub fn set(&mut self, id: &AssetId, selected: bool) {
        if selected {
            self.selected.insert(id.clone());
        } else {
            self.selected.remove(id);
        }
    }

    /// Flip `id` and return its new value.
    pub fn toggle(&mut self, id: &AssetId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetId> {
        self.selected.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub count: usize,
    pub bytes: u64,
}

/// Bulk actions the current selection makes available in a scope. Whether
/// the user's tier permits them is the entitlement gate's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EnabledActions {
    pub delete: bool,
    pub compress: bool,
    pub keep_recommended: bool,
}

/// Owns the selection over a read-only [`Library`]. Totals are recomputed
/// from the selection on every query.
#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    library: Library,
    state: SelectionState,
}

impl SelectionEngine {
    pub fn new(library: Library) -> Self {
        Self {
            library,
            state: SelectionState::default(),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_selected(&self, id: &AssetId) -> bool {
        self.state.is_selected(id)
    }

    pub fn toggle(&mut self, id: &AssetId) -> Result<bool, Error> {
        if !self.library.contains(id) {
            return Err(Error::UnknownAsset(id.to_string()));
        }
        Ok(self.state.toggle(id))
    }

    /// "Keep Recommended": select every member except the recommended one,
    /// which is explicitly deselected. Other groups are not touched.
    pub fn select_recommended_deletions(&mut self, group_id: GroupId) -> Result<(), Error> {
        let group = self
            .library
            .group(group_id)
            .ok_or(Error::UnknownGroup(group_id))?;
        for member in group.members() {
            self.state.set(&member.id, !group.is_recommended(&member.id));
        }
        debug!(
            "Selected {} deletion candidates in group {}",
            group.members().len() - 1,
            group_id
        );
        Ok(())
    }

    pub fn select_all(&mut self, scope: Scope) -> Result<(), Error> {
        self.set_scope(scope, true)
    }

    pub fn deselect_all(&mut self, scope: Scope) -> Result<(), Error> {
        self.set_scope(scope, false)
    }

    fn set_scope(&mut self, scope: Scope, selected: bool) -> Result<(), Error> {
        let ids: Vec<AssetId> = self
            .library
            .scope_assets(scope)?
            .into_iter()
            .map(|a| a.id.clone())
            .collect();
        for id in &ids {
            self.state.set(id, selected);
        }
        Ok(())
    }

    pub fn totals(&self, scope: Scope) -> Result<Totals, Error> {
        let mut seen: HashSet<&AssetId> = HashSet::new();
        let mut totals = Totals::default();
        for asset in self.library.scope_assets(scope)? {
            if self.state.is_selected(&asset.id) && seen.insert(&asset.id) {
                totals.count += 1;
                totals.bytes += asset.size_bytes;
            }
        }
        Ok(totals)
    }

    /// Selected assets in `scope`, in display order.
    pub fn selected_assets(&self, scope: Scope) -> Result<Vec<Asset>, Error> {
        Ok(self
            .library
            .scope_assets(scope)?
            .into_iter()
            .filter(|a| self.state.is_selected(&a.id))
            .cloned()
            .collect())
    }

    /// Estimated bytes saved by compressing the selected large files in `scope`.
    pub fn compression_savings(&self, scope: Scope) -> Result<u64, Error> {
        let selected = self.selected_assets(scope)?;
        Ok(large_files::compression_savings(
            self.library.large_files(),
            selected.iter().map(|a| &a.id),
        ))
    }

    pub fn enabled_actions(&self, scope: Scope) -> Result<EnabledActions, Error> {
        let totals = self.totals(scope)?;
        Ok(EnabledActions {
            delete: totals.count > 0,
            compress: self.compression_savings(scope)? > 0,
            keep_recommended: matches!(scope, Scope::Group(_)),
        })
    }

    pub fn deselect(&mut self, ids: &[AssetId]) {
        for id in ids {
            self.state.set(id, false);
        }
    }

    /// Install a rebuilt library. Selections of assets that no longer exist
    /// are dropped, the rest carry over.
    pub fn reload(&mut self, library: Library) {
        let stale: Vec<AssetId> = self
            .state
            .iter()
            .filter(|id| !library.contains(id))
            .cloned()
            .collect();
        if !stale.is_empty() {
            debug!("Dropping {} stale selections", stale.len());
        }
        self.deselect(&stale);
        self.library = library;
    }
}

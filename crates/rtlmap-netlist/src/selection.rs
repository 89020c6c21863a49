//! Selections
//!
//! A [`Selection`] is a filter over the modules and members (wires, cells)
//! of a design. Passes operate on the innermost selection of the design's
//! selection stack; pushing a narrow selection scopes a nested pass to a
//! single module, with the pop guaranteed by the caller.

use crate::ident::IdString;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A filter over modules and their members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    /// When true, everything is selected and the sets below are ignored.
    pub full_selection: bool,
    /// Modules selected as a whole.
    pub modules: IndexSet<IdString>,
    /// Partially selected modules and their selected members.
    pub members: IndexMap<IdString, IndexSet<IdString>>,
}

impl Selection {
    /// A selection covering the whole design.
    pub fn full() -> Self {
        Selection {
            full_selection: true,
            modules: IndexSet::new(),
            members: IndexMap::new(),
        }
    }

    /// A selection covering nothing.
    pub fn empty() -> Self {
        Selection {
            full_selection: false,
            modules: IndexSet::new(),
            members: IndexMap::new(),
        }
    }

    /// Select a module as a whole.
    pub fn select_module(&mut self, module: IdString) {
        if !self.full_selection {
            self.members.shift_remove(&module);
            self.modules.insert(module);
        }
    }

    /// Select one member of a module. A no-op when the module is already
    /// selected as a whole.
    pub fn select_member(&mut self, module: IdString, member: IdString) {
        if self.full_selection || self.modules.contains(&module) {
            return;
        }
        self.members.entry(module).or_default().insert(member);
    }

    /// True when the module is selected, wholly or partially.
    pub fn selects_module(&self, module: &IdString) -> bool {
        self.full_selection || self.modules.contains(module) || self.members.contains_key(module)
    }

    /// True when the member is covered by this selection.
    pub fn selects_member(&self, module: &IdString, member: &IdString) -> bool {
        if self.full_selection || self.modules.contains(module) {
            return true;
        }
        self.members.get(module).map(|m| m.contains(member)).unwrap_or(false)
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_selection_selects_everything() {
        let sel = Selection::full();
        assert!(sel.selects_module(&IdString::new("\\m")));
        assert!(sel.selects_member(&IdString::new("\\m"), &IdString::new("\\c")));
    }

    #[test]
    fn whole_module_selection_covers_members() {
        let mut sel = Selection::empty();
        sel.select_module(IdString::new("\\m"));
        assert!(sel.selects_module(&IdString::new("\\m")));
        assert!(sel.selects_member(&IdString::new("\\m"), &IdString::new("\\c")));
        assert!(!sel.selects_module(&IdString::new("\\other")));
    }

    #[test]
    fn partial_selection_tracks_members() {
        let mut sel = Selection::empty();
        sel.select_member(IdString::new("\\m"), IdString::new("\\c"));
        assert!(sel.selects_module(&IdString::new("\\m")));
        assert!(sel.selects_member(&IdString::new("\\m"), &IdString::new("\\c")));
        assert!(!sel.selects_member(&IdString::new("\\m"), &IdString::new("\\d")));
    }
}

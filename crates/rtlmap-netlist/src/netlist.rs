//! Netlist object model
//!
//! A [`Design`] is an ordered collection of [`Module`]s; a module is a
//! netlist of [`Cell`]s connected by signals over named [`Wire`]s, plus
//! top-level signal equalities. Objects are identified by name within
//! their container, and cross-references (signal chunks to wires) resolve
//! through the module's wire table.

use crate::constant::Const;
use crate::error::{NetlistError, Result};
use crate::ident::IdString;
use crate::selection::Selection;
use crate::sigspec::SigSpec;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Attribute table shared by all named objects.
pub type Attributes = IndexMap<IdString, Const>;

/// A named bit-vector, possibly a port of its module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    /// Wire name.
    pub name: IdString,
    /// Bit width, at least 1.
    pub width: usize,
    /// Positional port index, 1-based; 0 when the wire is not a port.
    pub port_id: usize,
    /// True when the port reads from outside the module.
    pub port_input: bool,
    /// True when the port drives outside the module.
    pub port_output: bool,
    /// Free-form attributes.
    pub attributes: Attributes,
}

impl Wire {
    /// A plain non-port wire.
    pub fn new(name: impl Into<IdString>, width: usize) -> Self {
        Wire {
            name: name.into(),
            width,
            port_id: 0,
            port_input: false,
            port_output: false,
            attributes: Attributes::new(),
        }
    }

    /// The whole wire as a signal.
    pub fn sig(&self) -> SigSpec {
        SigSpec::wire(self.name.clone(), self.width)
    }

    /// True when the named attribute is present with a non-zero value.
    pub fn get_bool_attribute(&self, name: &IdString) -> bool {
        self.attributes.get(name).map(Const::as_bool).unwrap_or(false)
    }

    /// Set the named attribute to constant 1.
    pub fn set_bool_attribute(&mut self, name: IdString) {
        self.attributes.insert(name, Const::from_u64(1, 1));
    }
}

/// An instance of a module or primitive inside another module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Instance name.
    pub name: IdString,
    /// Type identifier: the name of the instantiated module or primitive.
    pub ty: IdString,
    /// Parameter bindings.
    pub parameters: IndexMap<IdString, Const>,
    /// Parameters whose values are to be read as signed.
    pub signed_parameters: IndexSet<IdString>,
    /// Port connections. Keys beginning with `$` are positional (`$1`...).
    pub connections: IndexMap<IdString, SigSpec>,
    /// Free-form attributes.
    pub attributes: Attributes,
}

impl Cell {
    /// A cell with no parameters or connections yet.
    pub fn new(name: impl Into<IdString>, ty: impl Into<IdString>) -> Self {
        Cell {
            name: name.into(),
            ty: ty.into(),
            parameters: IndexMap::new(),
            signed_parameters: IndexSet::new(),
            connections: IndexMap::new(),
            attributes: Attributes::new(),
        }
    }
}

/// A memory array. Templates used by the mapper must not contain these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Memory name.
    pub name: IdString,
    /// Word width in bits.
    pub width: usize,
    /// Number of words.
    pub size: usize,
    /// Free-form attributes.
    pub attributes: Attributes,
}

/// Clock edge selector for a process sync rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncEdge {
    /// Rising edge.
    Posedge,
    /// Falling edge.
    Negedge,
}

/// One synchronous rule of a process: on `edge` of `signal`, apply the
/// listed `(target, value)` updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRule {
    /// Triggering edge.
    pub edge: SyncEdge,
    /// The signal whose edge triggers the rule.
    pub signal: SigSpec,
    /// Register updates applied on the edge.
    pub updates: Vec<(SigSpec, SigSpec)>,
}

/// A behavioural process: combinational root assignments plus sync rules.
///
/// Processes are produced by the frontends for `always`-style content and
/// lowered to cells and connections by the `proc` pass; the mapper refuses
/// templates that still contain them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    /// Process name.
    pub name: IdString,
    /// Unconditional combinational assignments.
    pub assigns: Vec<(SigSpec, SigSpec)>,
    /// Edge-triggered rules.
    pub syncs: Vec<SyncRule>,
    /// Free-form attributes.
    pub attributes: Attributes,
}

/// A netlist unit: wires, cells, top-level signal equalities, and the
/// behavioural leftovers (memories, processes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Module name.
    pub name: IdString,
    /// Wires, keyed by name, in insertion order.
    pub wires: IndexMap<IdString, Wire>,
    /// Cells, keyed by name, in insertion order.
    pub cells: IndexMap<IdString, Cell>,
    /// Top-level signal equalities `(lhs, rhs)`.
    pub connections: Vec<(SigSpec, SigSpec)>,
    /// Memories, keyed by name.
    pub memories: IndexMap<IdString, Memory>,
    /// Processes, keyed by name.
    pub processes: IndexMap<IdString, Process>,
    /// Free-form attributes.
    pub attributes: Attributes,
    /// Declared parameters and their default values.
    pub parameter_defaults: IndexMap<IdString, Const>,
}

impl Module {
    /// An empty module.
    pub fn new(name: impl Into<IdString>) -> Self {
        Module {
            name: name.into(),
            wires: IndexMap::new(),
            cells: IndexMap::new(),
            connections: Vec::new(),
            memories: IndexMap::new(),
            processes: IndexMap::new(),
            attributes: Attributes::new(),
            parameter_defaults: IndexMap::new(),
        }
    }

    /// Add a wire. Wire names are unique within a module.
    pub fn add_wire(&mut self, wire: Wire) -> Result<()> {
        if self.wires.contains_key(&wire.name) {
            return Err(NetlistError::DuplicateWire {
                module: self.name.clone(),
                name: wire.name,
            });
        }
        self.wires.insert(wire.name.clone(), wire);
        Ok(())
    }

    /// Look up a wire by name.
    pub fn wire(&self, name: &IdString) -> Option<&Wire> {
        self.wires.get(name)
    }

    /// Look up a wire by name, mutably.
    pub fn wire_mut(&mut self, name: &IdString) -> Option<&mut Wire> {
        self.wires.get_mut(name)
    }

    /// Remove a wire, returning it. Signals referencing the wire are not
    /// touched; the design check reports them as dangling.
    pub fn remove_wire(&mut self, name: &IdString) -> Option<Wire> {
        self.wires.shift_remove(name)
    }

    /// Rename a wire in place, rewriting every signal that references it.
    /// The wire moves to the end of the insertion order. Fails when the
    /// old name is missing or the new name is taken.
    pub fn rename_wire(&mut self, old: &IdString, new: IdString) -> Result<()> {
        if self.wires.contains_key(&new) {
            return Err(NetlistError::DuplicateWire { module: self.name.clone(), name: new });
        }
        let mut wire = self.wires.shift_remove(old).ok_or_else(|| NetlistError::WireNotFound {
            module: self.name.clone(),
            name: old.clone(),
        })?;
        wire.name = new.clone();
        self.wires.insert(new.clone(), wire);

        let rename = |sig: &mut SigSpec| {
            for chunk in sig.chunks_mut() {
                if let crate::sigspec::SigChunk::Wire { name, .. } = chunk {
                    if name == old {
                        *name = new.clone();
                    }
                }
            }
        };
        for cell in self.cells.values_mut() {
            for sig in cell.connections.values_mut() {
                rename(sig);
            }
        }
        for (lhs, rhs) in &mut self.connections {
            rename(lhs);
            rename(rhs);
        }
        for process in self.processes.values_mut() {
            for (lhs, rhs) in &mut process.assigns {
                rename(lhs);
                rename(rhs);
            }
            for sync in &mut process.syncs {
                rename(&mut sync.signal);
                for (lhs, rhs) in &mut sync.updates {
                    rename(lhs);
                    rename(rhs);
                }
            }
        }
        Ok(())
    }

    /// Add a cell. Cell names are unique within a module.
    pub fn add_cell(&mut self, cell: Cell) -> Result<()> {
        if self.cells.contains_key(&cell.name) {
            return Err(NetlistError::DuplicateCell {
                module: self.name.clone(),
                name: cell.name,
            });
        }
        self.cells.insert(cell.name.clone(), cell);
        Ok(())
    }

    /// Look up a cell by name.
    pub fn cell(&self, name: &IdString) -> Option<&Cell> {
        self.cells.get(name)
    }

    /// Look up a cell by name, mutably.
    pub fn cell_mut(&mut self, name: &IdString) -> Option<&mut Cell> {
        self.cells.get_mut(name)
    }

    /// Remove a cell, returning it.
    pub fn remove_cell(&mut self, name: &IdString) -> Option<Cell> {
        self.cells.shift_remove(name)
    }

    /// The port wires in `port_id` order.
    pub fn ports(&self) -> Vec<&Wire> {
        let mut ports: Vec<&Wire> = self.wires.values().filter(|w| w.port_id > 0).collect();
        ports.sort_by_key(|w| w.port_id);
        ports
    }

    /// True when the named attribute is present with a non-zero value.
    pub fn get_bool_attribute(&self, name: &IdString) -> bool {
        self.attributes.get(name).map(Const::as_bool).unwrap_or(false)
    }

    /// The named attribute decoded as a string, when present.
    pub fn get_string_attribute(&self, name: &IdString) -> Option<String> {
        self.attributes.get(name).map(Const::decode_string)
    }
}

/// An ordered collection of modules plus a selection stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    /// Modules, keyed by name, in insertion order.
    pub modules: IndexMap<IdString, Module>,
    /// Active selections, innermost last. An empty stack selects
    /// everything.
    pub selection_stack: Vec<Selection>,
}

impl Design {
    /// An empty design.
    pub fn new() -> Self {
        Design::default()
    }

    /// Add a module. Module names are unique within a design.
    pub fn add_module(&mut self, module: Module) -> Result<()> {
        if self.modules.contains_key(&module.name) {
            return Err(NetlistError::DuplicateModule(module.name));
        }
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    /// Look up a module by name.
    pub fn module(&self, name: &IdString) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Look up a module by name, mutably.
    pub fn module_mut(&mut self, name: &IdString) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    /// Remove a module, returning it.
    pub fn remove_module(&mut self, name: &IdString) -> Option<Module> {
        self.modules.shift_remove(name)
    }

    /// The innermost active selection, if any selection is installed.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection_stack.last()
    }

    /// True when everything is selected.
    pub fn full_selection(&self) -> bool {
        self.selection().map(|s| s.full_selection).unwrap_or(true)
    }

    /// True when the named module is selected.
    pub fn selected_module(&self, module: &IdString) -> bool {
        self.selection().map(|s| s.selects_module(module)).unwrap_or(true)
    }

    /// True when the named member of the named module is selected.
    pub fn selected_member(&self, module: &IdString, member: &IdString) -> bool {
        self.selection().map(|s| s.selects_member(module, member)).unwrap_or(true)
    }

    /// Grow the innermost selection to include a freshly created member,
    /// so objects introduced by a pass stay visible to it.
    pub fn select_member(&mut self, module: &IdString, member: &IdString) {
        if let Some(sel) = self.selection_stack.last_mut() {
            if !sel.full_selection {
                sel.select_member(module.clone(), member.clone());
            }
        }
    }
}

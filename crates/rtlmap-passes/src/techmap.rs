//! Technology mapping and hierarchy flattening
//!
//! `techmap` replaces every cell whose type matches a template in the map
//! library with a parameter-specialized, name-prefixed copy of that
//! template's body. `flatten` is the same engine fed the design as its own
//! map library.
//!
//! Templates steer the mapper through special wires:
//! - `_TECHMAP_FAIL_`: a fully-constant non-zero value vetoes the template.
//! - `_TECHMAP_DO_<suffix>`: the constant value decodes to a command string
//!   that is executed on the template (in ascending suffix order); the wire
//!   is then renamed to `_TECHMAP_DONE_<suffix>`.
//! - Any other `_TECHMAP_*` tag left after elaboration is a fatal error.
//!
//! Mapping iterates to a fixpoint: cells introduced by an expansion are
//! themselves candidates in the next round.

use crate::error::{PassError, Result};
use crate::{parse_selection, Pass, PassRegistry};
use indexmap::IndexMap;
use rtlmap_frontend::{frontend_call, Dialect};
use rtlmap_netlist::{
    Const, Design, IdString, Module, NetlistError, Selection, SigChunk, SigMap, SigSpec, State,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

/// The built-in default map library: unit-width RTL cells to gate
/// primitives.
const BUILTIN_LIBRARY: &str = include_str!("stdcells.il");

fn keep_attr() -> IdString {
    IdString::new("\\keep")
}

fn special_attr() -> IdString {
    IdString::new("\\_techmap_special_")
}

fn celltype_attr() -> IdString {
    IdString::new("\\techmap_celltype")
}

fn top_attr() -> IdString {
    IdString::new("\\top")
}

/// Apply the hygienic expansion prefix to one identifier. User-scoped
/// names stay user-scoped under the prefix; auto-generated names move into
/// a `$techmap` namespace that carries the prefix.
fn apply_prefix(prefix: &IdString, id: &IdString) -> IdString {
    if id.is_user_scoped() {
        IdString::new(format!("{}.{}", prefix, id.tail()))
    } else {
        IdString::new(format!("$techmap{}.{}", prefix, id))
    }
}

/// Apply the prefix to every wire reference of a signal and rebind the
/// references against the host module, which must already contain the
/// cloned wires.
fn apply_prefix_sig(prefix: &IdString, sig: &mut SigSpec, module: &Module) -> Result<()> {
    for chunk in sig.chunks_mut() {
        if let SigChunk::Wire { name, .. } = chunk {
            let new_name = apply_prefix(prefix, name);
            if module.wire(&new_name).is_none() {
                return Err(PassError::MissingCloneTarget(new_name));
            }
            *name = new_name;
        }
    }
    Ok(())
}

/// One special wire of a template: the wire and its driving signal.
#[derive(Debug, Clone)]
struct TechmapWire {
    wire: IdString,
    value: SigSpec,
}

/// Special wires keyed by tag. The sorted map makes the documented
/// ascending-order processing of `_TECHMAP_DO_*` tags explicit.
type SpecialWires = BTreeMap<String, Vec<TechmapWire>>;

/// Classify a wire name: the trailing dot-separated segment (or the whole
/// name minus its sigil) when it starts with `_TECHMAP_`. Auto-generated
/// names are never special.
fn special_wire_tag(name: &IdString) -> Option<&str> {
    let raw = name.as_str();
    if raw.len() < 2 || raw.starts_with('$') {
        return None;
    }
    let tail = match raw[1..].rfind('.') {
        Some(pos) => &raw[pos + 2..],
        None => &raw[1..],
    };
    tail.starts_with("_TECHMAP_").then_some(tail)
}

/// The `_TECHMAP_DO_` infix of a directive wire replaced by
/// `_TECHMAP_DONE_`, keeping any dotted prefix.
fn rename_done(name: &IdString) -> String {
    let raw = name.as_str();
    let seg_start = match raw[1..].rfind('.') {
        Some(pos) => pos + 2,
        None => 1,
    };
    format!(
        "{}_TECHMAP_DONE_{}",
        &raw[..seg_start],
        &raw[seg_start + "_TECHMAP_DO_".len()..]
    )
}

/// Find the special wires of a template. Each hit is marked `keep` (so
/// later cleanups leave it alone) and `_techmap_special_` (so its
/// attributes are stripped when it is cloned into a host module). The
/// reported values are the wires' drivers: the template's top-level
/// connections are applied as a substitution.
fn find_special_wires(module: &mut Module) -> SpecialWires {
    let mut result = SpecialWires::new();
    for wire in module.wires.values_mut() {
        if let Some(tag) = special_wire_tag(&wire.name) {
            let record = TechmapWire { wire: wire.name.clone(), value: wire.sig() };
            result.entry(tag.to_string()).or_default().push(record);
            wire.set_bool_attribute(keep_attr());
            wire.set_bool_attribute(special_attr());
        }
    }
    if !result.is_empty() {
        let sigmap = SigMap::from_module(module);
        for records in result.values_mut() {
            for record in records.iter_mut() {
                sigmap.apply(&mut record.value);
            }
        }
    }
    result
}

/// Where templates come from: an owned map library, or the design itself
/// (flatten mode).
enum MapLibrary {
    External(Design),
    Inline,
}

impl MapLibrary {
    fn get<'a>(&'a self, design: &'a Design, name: &IdString) -> Option<&'a Module> {
        match self {
            MapLibrary::External(map) => map.module(name),
            MapLibrary::Inline => design.module(name),
        }
    }
}

/// Per-invocation mapping state: the two memoization caches and the mode
/// flag. Both caches die with the invocation.
struct TechmapState<'a> {
    registry: &'a PassRegistry,
    flatten_mode: bool,
    /// `(template, canonical parameter binding) -> specialized template`.
    cache: HashMap<(IdString, BTreeMap<IdString, Const>), IdString>,
    /// `specialized template -> usable?`, memoizing elaboration.
    do_cache: HashMap<IdString, bool>,
}

impl<'a> TechmapState<'a> {
    fn new(registry: &'a PassRegistry, flatten_mode: bool) -> Self {
        TechmapState {
            registry,
            flatten_mode,
            cache: HashMap::new(),
            do_cache: HashMap::new(),
        }
    }

    /// Elaborate a template once: run its directives, honor its fail
    /// wire, and decide whether it is usable. Memoized in `do_cache`.
    fn elaborate(&mut self, map: &mut Design, tpl_name: &IdString) -> Result<bool> {
        if let Some(&usable) = self.do_cache.get(tpl_name) {
            return Ok(usable);
        }
        self.do_cache.insert(tpl_name.clone(), true);
        let mut usable = true;

        let mut keep_running = true;
        while keep_running {
            keep_running = false;
            let module = map
                .module_mut(tpl_name)
                .ok_or_else(|| NetlistError::ModuleNotFound(tpl_name.clone()))?;
            let special = find_special_wires(module);

            for record in special.get("_TECHMAP_FAIL_").into_iter().flatten() {
                if let Some(value) = record.value.as_const() {
                    if value.as_bool() {
                        info!(
                            "Not using module `{}' from techmap as it contains a {} marker wire with non-zero value {}.",
                            tpl_name, record.wire, record.value
                        );
                        usable = false;
                    }
                }
            }
            if !usable {
                break;
            }

            // One directive per rescan; the sorted tag map yields them in
            // ascending order.
            let directive = special.iter().find_map(|(tag, records)| {
                if tag.starts_with("_TECHMAP_DO_") {
                    records.first().cloned()
                } else {
                    None
                }
            });
            let Some(record) = directive else {
                continue;
            };

            let value = record.value.as_const().ok_or_else(|| PassError::NonConstSpecialWire {
                wire: record.wire.clone(),
                value: record.value.to_string(),
            })?;
            let command = value.decode_string();

            // Retire the wire so the directive runs exactly once.
            let module = map
                .module_mut(tpl_name)
                .ok_or_else(|| NetlistError::ModuleNotFound(tpl_name.clone()))?;
            let mut new_name = IdString::new(rename_done(&record.wire));
            while module.wire(&new_name).is_some() {
                new_name = IdString::new(format!("{}_", new_name));
            }
            module.rename_wire(&record.wire, new_name)?;

            info!("Running \"{}\" on template `{}'.", command, tpl_name);
            let mut scope = Selection::empty();
            scope.select_module(tpl_name.clone());
            map.selection_stack.push(scope);
            let outcome = self.registry.call(map, &command);
            map.selection_stack.pop();
            outcome?;

            keep_running = true;
        }

        // Whatever special wires remain must be accounted for.
        let module = map
            .module_mut(tpl_name)
            .ok_or_else(|| NetlistError::ModuleNotFound(tpl_name.clone()))?;
        let special = find_special_wires(module);
        for (tag, records) in &special {
            if tag != "_TECHMAP_FAIL_"
                && !tag.starts_with("_TECHMAP_DO_")
                && !tag.starts_with("_TECHMAP_DONE_")
            {
                return Err(PassError::UnknownSpecialWire(tag.clone()));
            }
            if usable {
                for record in records {
                    if !record.value.is_fully_const() {
                        return Err(PassError::NonConstSpecialWire {
                            wire: record.wire.clone(),
                            value: record.value.to_string(),
                        });
                    }
                }
            }
        }

        self.do_cache.insert(tpl_name.clone(), usable);
        Ok(usable)
    }

    /// Expand one cell in place: clone the template body into the host
    /// module under the cell's name prefix, reconcile the port widths,
    /// fold the port equalities into a signal rewrite, and remove the
    /// cell.
    fn module_worker(
        &self,
        design: &mut Design,
        module_name: &IdString,
        cell_name: &IdString,
        tpl: &Module,
    ) -> Result<()> {
        info!("Mapping `{}.{}' using `{}'.", module_name, cell_name, tpl.name);

        if !tpl.memories.is_empty() {
            return Err(PassError::TemplateMemories(tpl.name.clone()));
        }
        if !tpl.processes.is_empty() {
            return Err(PassError::TemplateProcesses(tpl.name.clone()));
        }

        let module = design
            .module_mut(module_name)
            .ok_or_else(|| NetlistError::ModuleNotFound(module_name.clone()))?;
        let cell = module
            .cell(cell_name)
            .cloned()
            .ok_or_else(|| NetlistError::CellNotFound {
                module: module_name.clone(),
                name: cell_name.clone(),
            })?;
        let prefix = &cell.name;
        let mut added_members: Vec<IdString> = Vec::new();

        // Clone the template wires under the prefix, stripping port
        // metadata. `$i` positional names resolve through the port table.
        let mut positional_ports: IndexMap<IdString, IdString> = IndexMap::new();
        for template_wire in tpl.wires.values() {
            if template_wire.port_id > 0 {
                positional_ports.insert(
                    IdString::new(format!("${}", template_wire.port_id)),
                    template_wire.name.clone(),
                );
            }
            let mut wire = template_wire.clone();
            wire.name = apply_prefix(prefix, &template_wire.name);
            wire.port_id = 0;
            wire.port_input = false;
            wire.port_output = false;
            if template_wire.get_bool_attribute(&special_attr()) {
                wire.attributes.clear();
            }
            added_members.push(wire.name.clone());
            module.add_wire(wire)?;
        }

        // Reconcile the cell's connections against the template ports.
        // Instead of emitting a connection per port, record a rewrite that
        // merges the cloned internal wires with the external signals.
        let mut port_signal_map = SigMap::new();
        for (portname, external) in &cell.connections {
            let resolved = positional_ports.get(portname).unwrap_or(portname);
            let Some(port_wire) = tpl.wire(resolved).filter(|w| w.port_id > 0) else {
                if resolved.is_autogen() {
                    return Err(PassError::PositionalPortMismatch {
                        port: portname.clone(),
                        cell: cell.name.clone(),
                        template: tpl.name.clone(),
                    });
                }
                continue;
            };
            let mut internal = port_wire.sig();
            apply_prefix_sig(prefix, &mut internal, module)?;
            let (first, mut second) = if port_wire.port_output {
                (external.clone(), internal)
            } else {
                (internal, external.clone())
            };
            if second.width() > first.width() {
                let excess = second.width() - first.width();
                second.remove(first.width(), excess);
            }
            if second.width() < first.width() {
                let shortfall = first.width() - second.width();
                second.append(SigSpec::from(Const::repeat(State::S0, shortfall)));
            }
            if port_wire.port_output {
                port_signal_map.add(&second, &first);
            } else {
                port_signal_map.add(&first, &second);
            }
        }

        // Clone the template cells, rewriting their connections through
        // the port map. Outside flatten mode, an escaped auto-type on a
        // template cell unescapes into the real auto-type.
        for template_cell in tpl.cells.values() {
            let mut cell_clone = template_cell.clone();
            cell_clone.name = apply_prefix(prefix, &template_cell.name);
            if !self.flatten_mode && cell_clone.ty.as_str().starts_with("\\$") {
                cell_clone.ty = IdString::new(cell_clone.ty.as_str()[1..].to_string());
            }
            for sig in cell_clone.connections.values_mut() {
                apply_prefix_sig(prefix, sig, module)?;
                port_signal_map.apply(sig);
            }
            added_members.push(cell_clone.name.clone());
            module.add_cell(cell_clone)?;
        }

        // Clone the template's top-level connections.
        for (lhs, rhs) in &tpl.connections {
            let mut lhs = lhs.clone();
            let mut rhs = rhs.clone();
            apply_prefix_sig(prefix, &mut lhs, module)?;
            apply_prefix_sig(prefix, &mut rhs, module)?;
            port_signal_map.apply(&mut lhs);
            port_signal_map.apply(&mut rhs);
            module.connections.push((lhs, rhs));
        }

        let _ = module.remove_cell(cell_name);

        for member in added_members {
            design.select_member(module_name, &member);
        }
        Ok(())
    }

    /// Map one module: walk its cells, match candidates against the
    /// celltype index, and expand the first usable template per cell.
    /// Returns whether anything changed.
    fn map_module(
        &mut self,
        design: &mut Design,
        map: &mut MapLibrary,
        module_name: &IdString,
        handled_cells: &mut HashSet<(IdString, IdString)>,
        celltype_index: &IndexMap<IdString, Vec<IdString>>,
    ) -> Result<bool> {
        if !design.selected_module(module_name) {
            return Ok(false);
        }

        let mut did_something = false;

        // The cell set mutates during iteration; walk a name snapshot.
        let cell_names: Vec<IdString> = design
            .module(module_name)
            .map(|m| m.cells.keys().cloned().collect())
            .unwrap_or_default();

        for cell_name in cell_names {
            let Some(cell) = design.module(module_name).and_then(|m| m.cell(&cell_name)) else {
                continue;
            };
            if !design.selected_member(module_name, &cell_name) {
                continue;
            }
            if handled_cells.contains(&(module_name.clone(), cell_name.clone())) {
                continue;
            }
            let Some(candidates) = celltype_index.get(&cell.ty) else {
                continue;
            };
            let cell = cell.clone();

            'templates: for tpl_name in candidates {
                // Bind the cell's parameters, folding in constant-driven
                // non-port connections as parameter values.
                let mut parameters = cell.parameters.clone();
                if !self.flatten_mode {
                    let tpl = map
                        .get(design, tpl_name)
                        .ok_or_else(|| NetlistError::ModuleNotFound(tpl_name.clone()))?;
                    for (conn_name, conn_sig) in &cell.connections {
                        if conn_name.is_autogen() {
                            continue;
                        }
                        if tpl.wire(conn_name).map(|w| w.port_id > 0).unwrap_or(false) {
                            continue;
                        }
                        match conn_sig.as_const() {
                            Some(value) if !parameters.contains_key(conn_name) => {
                                parameters.insert(conn_name.clone(), value);
                            }
                            _ => continue 'templates,
                        }
                    }
                }

                // Specialize through the cache. The key is canonical: the
                // binding is sorted, so parameter order cannot split it.
                let key = (
                    tpl_name.clone(),
                    parameters
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<BTreeMap<_, _>>(),
                );
                let derived_name = match self.cache.get(&key).cloned() {
                    Some(name) => name,
                    None => {
                        let derived = if !self.flatten_mode && !parameters.is_empty() {
                            match map {
                                MapLibrary::External(m) => {
                                    m.derive(tpl_name, &parameters, &cell.signed_parameters)?
                                }
                                MapLibrary::Inline => tpl_name.clone(),
                            }
                        } else {
                            tpl_name.clone()
                        };
                        self.cache.insert(key, derived.clone());
                        derived
                    }
                };

                if self.flatten_mode {
                    self.do_cache.insert(derived_name.clone(), true);
                }
                let usable = match self.do_cache.get(&derived_name).copied() {
                    Some(usable) => usable,
                    None => match map {
                        MapLibrary::External(m) => self.elaborate(m, &derived_name)?,
                        MapLibrary::Inline => true,
                    },
                };
                if !usable {
                    continue 'templates;
                }

                let tpl = map
                    .get(design, &derived_name)
                    .ok_or_else(|| NetlistError::ModuleNotFound(derived_name.clone()))?
                    .clone();
                self.module_worker(design, module_name, &cell_name, &tpl)?;
                did_something = true;
                break;
            }

            // Considered for every template: never reconsidered, mapped or
            // not.
            handled_cells.insert((module_name.clone(), cell_name.clone()));
        }

        Ok(did_something)
    }
}

/// `techmap [-map FILE]... [selection]`
pub struct TechmapPass;

impl Pass for TechmapPass {
    fn name(&self) -> &'static str {
        "techmap"
    }

    fn help(&self) -> &'static str {
        "map cells to implementations from a map library"
    }

    fn execute(
        &self,
        args: &[String],
        design: &mut Design,
        registry: &PassRegistry,
    ) -> Result<()> {
        info!("Executing TECHMAP pass (map to technology primitives).");

        let mut map_files: Vec<String> = Vec::new();
        let mut selection_args: Vec<String> = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "-map" || arg == "-m" {
                match iter.next() {
                    Some(file) => map_files.push(file.clone()),
                    None => {
                        return Err(PassError::Usage("expected file name after -map".to_string()))
                    }
                }
            } else {
                selection_args.push(arg.clone());
            }
        }

        // Load the map library; the built-in library maps unit-width RTL
        // cells onto gate primitives.
        let mut map = Design::new();
        if map_files.is_empty() {
            frontend_call(&mut map, BUILTIN_LIBRARY, "<stdcells.il>", Dialect::Ilang)?;
        } else {
            for file in &map_files {
                let text = std::fs::read_to_string(file).map_err(|source| {
                    PassError::MapFile { path: file.clone(), source }
                })?;
                frontend_call(&mut map, &text, file, Dialect::from_filename(file))?;
            }
        }

        // Map modules named with an escaped auto-type (`\$and`) shadow the
        // real auto-type (`$and`).
        let escaped: Vec<IdString> = map
            .modules
            .keys()
            .filter(|name| name.as_str().starts_with("\\$"))
            .cloned()
            .collect();
        for name in escaped {
            if let Some(mut module) = map.remove_module(&name) {
                module.name = IdString::new(name.as_str()[1..].to_string());
                map.add_module(module)?;
            }
        }

        let celltype_index = build_celltype_index(&map);

        let selection = parse_selection(design, &selection_args)?;
        design.selection_stack.push(selection);
        let outcome = run_fixpoint(
            design,
            &mut MapLibrary::External(map),
            registry,
            &celltype_index,
            false,
            None,
        );
        design.selection_stack.pop();
        outcome?;

        info!("No more expansions possible.");
        Ok(())
    }
}

/// `flatten [selection]`
pub struct FlattenPass;

impl Pass for FlattenPass {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn help(&self) -> &'static str {
        "flatten the design by inlining module instances"
    }

    fn execute(
        &self,
        args: &[String],
        design: &mut Design,
        registry: &PassRegistry,
    ) -> Result<()> {
        info!("Executing FLATTEN pass (flatten design).");

        let selection = parse_selection(design, args)?;
        design.selection_stack.push(selection);

        // Every module is its own template.
        let mut celltype_index: IndexMap<IdString, Vec<IdString>> = IndexMap::new();
        for name in design.modules.keys() {
            celltype_index.entry(name.clone()).or_default().push(name.clone());
        }

        // With a full selection and a unique `top` module, only that
        // module is flattened and the rest of the hierarchy is deleted.
        let top_module = if design.full_selection() {
            design
                .modules
                .values()
                .find(|m| m.get_bool_attribute(&top_attr()))
                .map(|m| m.name.clone())
        } else {
            None
        };

        let outcome = run_fixpoint(
            design,
            &mut MapLibrary::Inline,
            registry,
            &celltype_index,
            true,
            top_module.as_ref(),
        );
        design.selection_stack.pop();
        outcome?;

        info!("No more expansions possible.");

        if let Some(top_name) = top_module {
            let others: Vec<IdString> = design
                .modules
                .keys()
                .filter(|name| **name != top_name)
                .cloned()
                .collect();
            for name in others {
                info!("Deleting now unused module {}.", name);
                let _ = design.remove_module(&name);
            }
        }
        Ok(())
    }
}

/// The driver loop shared by both commands: map modules until a whole
/// round changes nothing. Each changed round re-validates the design.
fn run_fixpoint(
    design: &mut Design,
    map: &mut MapLibrary,
    registry: &PassRegistry,
    celltype_index: &IndexMap<IdString, Vec<IdString>>,
    flatten_mode: bool,
    top_module: Option<&IdString>,
) -> Result<()> {
    let mut state = TechmapState::new(registry, flatten_mode);
    let mut handled_cells: HashSet<(IdString, IdString)> = HashSet::new();
    let mut did_something = true;
    while did_something {
        did_something = false;
        let module_names: Vec<IdString> = match top_module {
            Some(top) => vec![top.clone()],
            None => design.modules.keys().cloned().collect(),
        };
        for module_name in module_names {
            if state.map_module(design, map, &module_name, &mut handled_cells, celltype_index)? {
                did_something = true;
            }
        }
        if did_something && !flatten_mode {
            design.check()?;
        }
    }
    Ok(())
}

/// Build the celltype index of a map library: a template handles the cell
/// type named by its `techmap_celltype` attribute, or its own name.
fn build_celltype_index(map: &Design) -> IndexMap<IdString, Vec<IdString>> {
    let mut index: IndexMap<IdString, Vec<IdString>> = IndexMap::new();
    for (name, module) in &map.modules {
        match module.get_string_attribute(&celltype_attr()) {
            Some(celltype) if !celltype.is_empty() => {
                index.entry(IdString::escape(&celltype)).or_default().push(name.clone());
            }
            _ => {
                index.entry(name.clone()).or_default().push(name.clone());
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rules() {
        let prefix = IdString::new("\\u0");
        assert_eq!(apply_prefix(&prefix, &IdString::new("\\y")).as_str(), "\\u0.y");
        assert_eq!(
            apply_prefix(&prefix, &IdString::new("$tmp")).as_str(),
            "$techmap\\u0.$tmp"
        );
    }

    #[test]
    fn special_tag_classification() {
        assert_eq!(
            special_wire_tag(&IdString::new("\\_TECHMAP_FAIL_")),
            Some("_TECHMAP_FAIL_")
        );
        assert_eq!(
            special_wire_tag(&IdString::new("\\a.b._TECHMAP_DO_00")),
            Some("_TECHMAP_DO_00")
        );
        assert_eq!(special_wire_tag(&IdString::new("\\plain")), None);
        assert_eq!(special_wire_tag(&IdString::new("$_TECHMAP_FAIL_")), None);
        assert_eq!(special_wire_tag(&IdString::new("\\x._not_special")), None);
    }

    #[test]
    fn done_rename_keeps_dotted_prefix() {
        assert_eq!(
            rename_done(&IdString::new("\\_TECHMAP_DO_00")),
            "\\_TECHMAP_DONE_00"
        );
        assert_eq!(
            rename_done(&IdString::new("\\inner._TECHMAP_DO_proc")),
            "\\inner._TECHMAP_DONE_proc"
        );
    }

    #[test]
    fn scanner_reports_drivers_and_marks_wires() {
        let mut design = Design::new();
        rtlmap_frontend::ilang::parse(
            &mut design,
            "module \\t\n  wire \\_TECHMAP_FAIL_\n  wire \\other\n  connect \\_TECHMAP_FAIL_ 1'1\nend\n",
            "<test>",
        )
        .unwrap();
        let module = design.module_mut(&IdString::new("\\t")).unwrap();
        let special = find_special_wires(module);
        assert_eq!(special.len(), 1);
        let records = &special["_TECHMAP_FAIL_"];
        assert_eq!(records.len(), 1);
        // The reported value is the driver, not the wire.
        assert_eq!(records[0].value.as_const(), Some(Const::from_u64(1, 1)));
        let wire = module.wire(&IdString::new("\\_TECHMAP_FAIL_")).unwrap();
        assert!(wire.get_bool_attribute(&keep_attr()));
        assert!(wire.get_bool_attribute(&special_attr()));
        let other = module.wire(&IdString::new("\\other")).unwrap();
        assert!(!other.get_bool_attribute(&keep_attr()));
    }

    #[test]
    fn celltype_index_prefers_attribute() {
        let mut map = Design::new();
        rtlmap_frontend::ilang::parse(
            &mut map,
            "attribute \\techmap_celltype \"$add\"\nmodule \\my_adder\nend\nmodule \\direct\nend\n",
            "<test>",
        )
        .unwrap();
        let index = build_celltype_index(&map);
        assert_eq!(
            index.get(&IdString::new("$add")),
            Some(&vec![IdString::new("\\my_adder")])
        );
        assert_eq!(
            index.get(&IdString::new("\\direct")),
            Some(&vec![IdString::new("\\direct")])
        );
    }
}

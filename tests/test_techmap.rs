//! End-to-end technology mapping tests

use rtlmap_frontend::{frontend_call, Dialect};
use rtlmap_netlist::{Design, IdString, SigSpec};
use rtlmap_passes::{PassError, PassRegistry};
use std::io::Write;
use tempfile::NamedTempFile;

fn parse_il(text: &str) -> Design {
    let mut design = Design::new();
    frontend_call(&mut design, text, "<test>", Dialect::Ilang).unwrap();
    design
}

/// Write a map library to a temp file with the given suffix and return the
/// file (the path must stay alive while techmap reads it).
fn map_file(text: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn techmap(design: &mut Design, maps: &[&NamedTempFile]) -> Result<(), PassError> {
    let registry = PassRegistry::builtin();
    let mut args: Vec<String> = Vec::new();
    for map in maps {
        args.push("-map".to_string());
        args.push(map.path().display().to_string());
    }
    registry
        .get("techmap")
        .unwrap()
        .execute(&args, design, &registry)
}

fn id(name: &str) -> IdString {
    IdString::new(name)
}

#[test]
fn basic_map_replaces_cell_with_template_body() {
    // S1: a Verilog map library implementing M as Y = A & B.
    let map = map_file(
        "module M(input A, input B, output Y);\n  assign Y = A & B;\nendmodule\n",
        ".v",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire input 2 \\b\n  wire output 3 \\y\n  cell \\M \\u0\n    connect \\A \\a\n    connect \\B \\b\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cell(&id("\\u0")).is_none());
    assert!(top.cells.values().all(|c| c.ty != id("\\M")));

    // The template body arrived as a single $and driven by the host nets.
    let and_cells: Vec<_> = top.cells.values().filter(|c| c.ty == id("$and")).collect();
    assert_eq!(and_cells.len(), 1);
    let and_cell = and_cells[0];
    assert_eq!(and_cell.connections.get(&id("\\A")), Some(&SigSpec::wire(id("\\a"), 1)));
    assert_eq!(and_cell.connections.get(&id("\\B")), Some(&SigSpec::wire(id("\\b"), 1)));

    // Hygiene: every introduced wire is prefixed, nothing collides.
    for wire in top.wires.values() {
        let name = wire.name.as_str();
        assert!(
            name == "\\a"
                || name == "\\b"
                || name == "\\y"
                || name.starts_with("\\u0.")
                || name.starts_with("$techmap\\u0."),
            "unexpected wire {}",
            name
        );
    }

    // The output reaches \y through a cloned connection.
    assert!(top
        .connections
        .iter()
        .any(|(lhs, _)| *lhs == SigSpec::wire(id("\\y"), 1)));

    design.check().unwrap();
}

#[test]
fn fail_marker_vetoes_template_and_next_candidate_wins() {
    // S2: two templates handle type T; the first vetoes itself.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t_bad\n  wire input 1 \\A\n  wire output 2 \\Y\n  wire \\_TECHMAP_FAIL_\n  connect \\_TECHMAP_FAIL_ 1'1\nend\nattribute \\techmap_celltype \"T\"\nmodule \\t_good\n  wire input 1 \\A\n  wire output 2 \\Y\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cell(&id("\\u0")).is_none());
    // t_good's body is a bare connection Y = A, so the expansion reduces
    // to \y = \a.
    assert!(top
        .connections
        .iter()
        .any(|c| *c == (SigSpec::wire(id("\\y"), 1), SigSpec::wire(id("\\a"), 1))));
}

#[test]
fn do_directive_runs_proc_on_template() {
    // S3: the template is written behaviourally and asks for `proc`.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire input 1 \\A\n  wire output 2 \\Y\n  wire width 32 \\_TECHMAP_DO_00\n  connect \\_TECHMAP_DO_00 \"proc\"\n  process $p\n    assign \\Y \\A\n  end\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cell(&id("\\u0")).is_none());
    // The directive wire was retired to _TECHMAP_DONE_ before cloning.
    assert!(top.wire(&id("\\u0._TECHMAP_DONE_00")).is_some());
    assert!(top.wire(&id("\\u0._TECHMAP_DO_00")).is_none());
    // The lowered process became the Y = A connection.
    assert!(top
        .connections
        .iter()
        .any(|c| *c == (SigSpec::wire(id("\\y"), 1), SigSpec::wire(id("\\a"), 1))));
}

#[test]
fn constant_port_binds_template_parameter() {
    // S4: \WIDTH is a parameter of the template, not a port; the cell
    // drives it with a constant.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  parameter \\WIDTH\n  wire input 1 \\A\n  wire output 2 \\Y\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n    connect \\WIDTH 8'00001000\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cell(&id("\\u0")).is_none());
    assert!(top
        .connections
        .iter()
        .any(|c| *c == (SigSpec::wire(id("\\y"), 1), SigSpec::wire(id("\\a"), 1))));
}

#[test]
fn non_constant_port_rejects_template() {
    // The same shape as S4, but the would-be parameter is driven by a
    // wire: the template is rejected and the cell stays.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  parameter \\WIDTH\n  wire input 1 \\A\n  wire output 2 \\Y\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  wire width 8 \\cfg\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n    connect \\WIDTH \\cfg\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cell(&id("\\u0")).is_some());
}

#[test]
fn non_constant_directive_is_fatal() {
    // S6: a directive wire driven by a non-constant net.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire input 1 \\A\n  wire output 2 \\Y\n  wire width 32 \\cfg\n  wire width 32 \\_TECHMAP_DO_X\n  connect \\_TECHMAP_DO_X \\cfg\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    let err = techmap(&mut design, &[&map]).unwrap_err();
    match err {
        PassError::NonConstSpecialWire { wire, value } => {
            assert_eq!(wire, id("\\_TECHMAP_DO_X"));
            assert!(value.contains("cfg"));
        }
        other => panic!("expected NonConstSpecialWire, got {other}"),
    }
}

#[test]
fn unknown_special_wire_is_fatal() {
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire input 1 \\A\n  wire output 2 \\Y\n  wire \\_TECHMAP_FROB_\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    assert!(matches!(
        techmap(&mut design, &[&map]).unwrap_err(),
        PassError::UnknownSpecialWire(tag) if tag == "_TECHMAP_FROB_"
    ));
}

#[test]
fn positional_connections_resolve_by_port_index() {
    let map = map_file(
        "module \\buf_cell\n  wire input 1 \\A\n  wire output 2 \\Y\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\buf_cell \\u0\n    connect $1 \\a\n    connect $2 \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();
    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cell(&id("\\u0")).is_none());
    assert!(top
        .connections
        .iter()
        .any(|c| *c == (SigSpec::wire(id("\\y"), 1), SigSpec::wire(id("\\a"), 1))));
}

#[test]
fn unresolvable_positional_connection_is_fatal() {
    let map = map_file(
        "module \\buf_cell\n  wire input 1 \\A\n  wire output 2 \\Y\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\buf_cell \\u0\n    connect $1 \\a\n    connect $2 \\y\n    connect $3 \\a\n  end\nend\n",
    );
    assert!(matches!(
        techmap(&mut design, &[&map]).unwrap_err(),
        PassError::PositionalPortMismatch { .. }
    ));
}

#[test]
fn port_widths_reconcile_by_truncation_and_extension() {
    // Template port \A is 4 bits; the cell feeds 2 bits into it and takes
    // 2 bits of the 4-bit output.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire width 4 input 1 \\A\n  wire width 4 output 2 \\Y\n  cell $id $g\n    connect \\A \\A\n    connect \\Y \\Y\n  end\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire width 2 \\a\n  wire width 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    let inner = top.cell(&id("$techmap\\u0.$g")).unwrap();
    // Input: the 2 external bits, zero-extended to the port width.
    let a = inner.connections.get(&id("\\A")).unwrap();
    assert_eq!(a.width(), 4);
    let bits = a.bits();
    assert_eq!(bits[0], rtlmap_netlist::SigBit::Wire { name: id("\\a"), offset: 0 });
    assert_eq!(bits[1], rtlmap_netlist::SigBit::Wire { name: id("\\a"), offset: 1 });
    assert!(matches!(bits[2], rtlmap_netlist::SigBit::Const(rtlmap_netlist::State::S0)));
    // Output: the external signal replaces the low two internal bits; the
    // upper bits stay on the cloned wire.
    let y = inner.connections.get(&id("\\Y")).unwrap();
    assert_eq!(y.width(), 4);
    let bits = y.bits();
    assert_eq!(bits[0], rtlmap_netlist::SigBit::Wire { name: id("\\y"), offset: 0 });
    assert_eq!(bits[1], rtlmap_netlist::SigBit::Wire { name: id("\\y"), offset: 1 });
    assert_eq!(bits[2], rtlmap_netlist::SigBit::Wire { name: id("\\u0.Y"), offset: 2 });
}

#[test]
fn memoized_expansions_are_structurally_equal_up_to_prefix() {
    // Two cells with the same template and parameters expand to the same
    // shape under their own prefixes.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  parameter \\WIDTH\n  wire input 1 \\A\n  wire output 2 \\Y\n  cell $_NOT_ $g\n    connect \\A \\A\n    connect \\Y \\Y\n  end\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  wire \\t\n  cell \\T \\u0\n    parameter \\WIDTH 8'00001000\n    connect \\A \\a\n    connect \\Y \\t\n  end\n  cell \\T \\u1\n    parameter \\WIDTH 8'00001000\n    connect \\A \\t\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    let g0 = top.cell(&id("$techmap\\u0.$g")).unwrap();
    let g1 = top.cell(&id("$techmap\\u1.$g")).unwrap();
    assert_eq!(g0.ty, id("$_NOT_"));
    assert_eq!(g1.ty, id("$_NOT_"));
    assert_eq!(g0.parameters, g1.parameters);
    assert_eq!(g0.connections.keys().collect::<Vec<_>>(), g1.connections.keys().collect::<Vec<_>>());
}

#[test]
fn escaped_auto_type_module_shadows_auto_type() {
    // A map module named \$and (escaped) handles cells of type $and, and
    // the builtin-style body maps onto the gate primitive.
    let map = map_file(
        "module \\$and\n  wire input 1 \\A\n  wire input 2 \\B\n  wire output 3 \\Y\n  cell $_AND_ $g\n    connect \\A \\A\n    connect \\B \\B\n    connect \\Y \\Y\n  end\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire input 2 \\b\n  wire output 3 \\y\n  cell $and $u0\n    connect \\A \\a\n    connect \\B \\b\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();
    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cells.values().all(|c| c.ty != id("$and")));
    assert_eq!(top.cells.values().filter(|c| c.ty == id("$_AND_")).count(), 1);
}

#[test]
fn escaped_auto_type_on_template_cell_unescapes() {
    // A template may shadow an auto-type cell by instantiating it under
    // an escaped name; outside flatten mode the clone gets the real
    // auto-type back.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire input 1 \\A\n  wire input 2 \\B\n  wire output 3 \\Y\n  cell \\$_AND_ $g\n    connect \\A \\A\n    connect \\B \\B\n    connect \\Y \\Y\n  end\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire input 2 \\b\n  wire output 3 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\B \\b\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[&map]).unwrap();

    let top = design.module(&id("\\top")).unwrap();
    let gate = top.cell(&id("$techmap\\u0.$g")).unwrap();
    assert_eq!(gate.ty, id("$_AND_"));
    assert!(top.cells.values().all(|c| c.ty != id("\\$_AND_")));
}

#[test]
fn template_with_memory_is_fatal() {
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire input 1 \\A\n  wire output 2 \\Y\n  memory width 8 size 16 \\mem\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    assert!(matches!(
        techmap(&mut design, &[&map]).unwrap_err(),
        PassError::TemplateMemories(name) if name == id("\\t")
    ));
}

#[test]
fn template_with_unlowered_process_is_fatal() {
    // The process was never run through `proc` (no directive asked for
    // it), so the template cannot be expanded.
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire input 1 \\A\n  wire output 2 \\Y\n  process $p\n    assign \\Y \\A\n  end\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    assert!(matches!(
        techmap(&mut design, &[&map]).unwrap_err(),
        PassError::TemplateProcesses(name) if name == id("\\t")
    ));
}

#[test]
fn builtin_library_maps_unit_width_rtl_cells() {
    let mut design = parse_il(
        "module \\top\n  wire input 1 \\a\n  wire input 2 \\b\n  wire output 3 \\y\n  cell $and $u0\n    connect \\A \\a\n    connect \\B \\b\n    connect \\Y \\y\n  end\nend\n",
    );
    techmap(&mut design, &[]).unwrap();
    let top = design.module(&id("\\top")).unwrap();
    assert_eq!(top.cells.values().filter(|c| c.ty == id("$_AND_")).count(), 1);
    assert!(top.cells.values().all(|c| c.ty != id("$and")));
}

#[test]
fn selection_restricts_mapping() {
    let map = map_file(
        "attribute \\techmap_celltype \"T\"\nmodule \\t\n  wire input 1 \\A\n  wire output 2 \\Y\n  connect \\Y \\A\nend\n",
        ".il",
    );
    let mut design = parse_il(
        "module \\m1\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\nmodule \\m2\n  wire input 1 \\a\n  wire output 2 \\y\n  cell \\T \\u0\n    connect \\A \\a\n    connect \\Y \\y\n  end\nend\n",
    );
    let registry = PassRegistry::builtin();
    let args = vec![
        "-map".to_string(),
        map.path().display().to_string(),
        "m1".to_string(),
    ];
    registry.get("techmap").unwrap().execute(&args, &mut design, &registry).unwrap();

    assert!(design.module(&id("\\m1")).unwrap().cells.is_empty());
    assert!(design.module(&id("\\m2")).unwrap().cell(&id("\\u0")).is_some());
}

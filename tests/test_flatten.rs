//! End-to-end flattening tests

use rtlmap_frontend::{frontend_call, Dialect};
use rtlmap_netlist::{Design, IdString, SigSpec};
use rtlmap_passes::PassRegistry;

fn parse_il(text: &str) -> Design {
    let mut design = Design::new();
    frontend_call(&mut design, text, "<test>", Dialect::Ilang).unwrap();
    design
}

fn flatten(design: &mut Design, selection: &[&str]) {
    let registry = PassRegistry::builtin();
    let args: Vec<String> = selection.iter().map(|s| s.to_string()).collect();
    registry.get("flatten").unwrap().execute(&args, design, &registry).unwrap();
}

fn id(name: &str) -> IdString {
    IdString::new(name)
}

const HIERARCHY: &str = "\
attribute \\top 1'1
module \\top
  wire input 1 \\a
  wire output 2 \\y
  wire \\t
  cell \\sub1 \\u1
    connect \\A \\a
    connect \\Y \\t
  end
  cell \\sub2 \\u2
    connect \\A \\t
    connect \\Y \\y
  end
end
module \\sub1
  wire input 1 \\A
  wire output 2 \\Y
  cell $_NOT_ $g
    connect \\A \\A
    connect \\Y \\Y
  end
end
module \\sub2
  wire input 1 \\A
  wire output 2 \\Y
  connect \\Y \\A
end
";

#[test]
fn flatten_with_top_keeps_only_top() {
    // S5: full selection, unique `top` attribute.
    let mut design = parse_il(HIERARCHY);
    flatten(&mut design, &[]);

    assert_eq!(design.modules.len(), 1);
    let top = design.module(&id("\\top")).unwrap();

    // The hierarchy is fully inlined: one gate from sub1, a connection
    // from sub2, and no module-typed cells left.
    assert_eq!(top.cells.len(), 1);
    let gate = top.cell(&id("$techmap\\u1.$g")).unwrap();
    assert_eq!(gate.ty, id("$_NOT_"));
    assert_eq!(gate.connections.get(&id("\\A")), Some(&SigSpec::wire(id("\\a"), 1)));
    assert_eq!(gate.connections.get(&id("\\Y")), Some(&SigSpec::wire(id("\\t"), 1)));
    assert!(top
        .connections
        .iter()
        .any(|c| *c == (SigSpec::wire(id("\\y"), 1), SigSpec::wire(id("\\t"), 1))));

    design.check().unwrap();
}

#[test]
fn flatten_without_top_attribute_keeps_all_modules() {
    let mut design = parse_il(&HIERARCHY.replace("attribute \\top 1'1\n", ""));
    flatten(&mut design, &[]);

    // Every module got flattened, none were deleted.
    assert_eq!(design.modules.len(), 3);
    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cells.values().all(|c| c.ty == id("$_NOT_")));
}

#[test]
fn flatten_with_selection_leaves_top_handling_off() {
    // A partial selection disables the top-module special case even when
    // the attribute is present.
    let mut design = parse_il(HIERARCHY);
    flatten(&mut design, &["top"]);

    assert_eq!(design.modules.len(), 3);
    let top = design.module(&id("\\top")).unwrap();
    assert!(top.cells.values().all(|c| c.ty == id("$_NOT_")));
}

#[test]
fn nested_hierarchy_flattens_to_fixpoint() {
    // outer instantiates mid, mid instantiates leaf; two rounds needed.
    let mut design = parse_il(
        "attribute \\top 1'1
module \\outer
  wire input 1 \\x
  wire output 2 \\z
  cell \\mid \\m
    connect \\A \\x
    connect \\Y \\z
  end
end
module \\mid
  wire input 1 \\A
  wire output 2 \\Y
  cell \\leaf \\l
    connect \\A \\A
    connect \\Y \\Y
  end
end
module \\leaf
  wire input 1 \\A
  wire output 2 \\Y
  cell $_NOT_ $g
    connect \\A \\A
    connect \\Y \\Y
  end
end
",
    );
    flatten(&mut design, &[]);

    assert_eq!(design.modules.len(), 1);
    let outer = design.module(&id("\\outer")).unwrap();
    assert_eq!(outer.cells.len(), 1);
    let gate = outer.cell(&id("$techmap\\m.l.$g")).unwrap();
    assert_eq!(gate.ty, id("$_NOT_"));
    assert_eq!(gate.connections.get(&id("\\A")), Some(&SigSpec::wire(id("\\x"), 1)));
    assert_eq!(gate.connections.get(&id("\\Y")), Some(&SigSpec::wire(id("\\z"), 1)));
}

#[test]
fn flatten_keeps_escaped_auto_types() {
    // Inlining never unescapes `\$`-typed cells; that rewrite belongs to
    // technology mapping only.
    let mut design = parse_il(
        "attribute \\top 1'1
module \\top
  wire input 1 \\a
  wire input 2 \\b
  wire output 3 \\y
  cell \\sub \\u
    connect \\A \\a
    connect \\B \\b
    connect \\Y \\y
  end
end
module \\sub
  wire input 1 \\A
  wire input 2 \\B
  wire output 3 \\Y
  cell \\$_AND_ $g
    connect \\A \\A
    connect \\B \\B
    connect \\Y \\Y
  end
end
",
    );
    flatten(&mut design, &[]);

    assert_eq!(design.modules.len(), 1);
    let top = design.module(&id("\\top")).unwrap();
    let gate = top.cell(&id("$techmap\\u.$g")).unwrap();
    assert_eq!(gate.ty, id("\\$_AND_"));
}

#[test]
fn flatten_is_deterministic_across_runs() {
    let mut first = parse_il(HIERARCHY);
    let mut second = parse_il(HIERARCHY);
    flatten(&mut first, &[]);
    flatten(&mut second, &[]);
    assert_eq!(
        rtlmap_frontend::write_design(&first),
        rtlmap_frontend::write_design(&second)
    );
}

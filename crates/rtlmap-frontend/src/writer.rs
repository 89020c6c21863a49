//! Writer for the native netlist dialect
//!
//! Serializes a design into the exact form [`crate::ilang`] parses, so
//! designs round-trip through text.

use rtlmap_netlist::{Attributes, Const, Design, Module, SigChunk, SigSpec, SyncEdge};
use std::fmt::Write;

/// Serialize a whole design.
pub fn write_design(design: &Design) -> String {
    let mut out = String::new();
    for module in design.modules.values() {
        write_module(&mut out, module);
    }
    out
}

fn write_attributes(out: &mut String, indent: &str, attributes: &Attributes) {
    for (name, value) in attributes {
        let _ = writeln!(out, "{}attribute {} {}", indent, name, format_const(value));
    }
}

fn write_module(out: &mut String, module: &Module) {
    write_attributes(out, "", &module.attributes);
    let _ = writeln!(out, "module {}", module.name);
    for (name, value) in &module.parameter_defaults {
        if value.width() == 0 {
            let _ = writeln!(out, "  parameter {}", name);
        } else {
            let _ = writeln!(out, "  parameter {} {}", name, format_const(value));
        }
    }
    for wire in module.wires.values() {
        write_attributes(out, "  ", &wire.attributes);
        let mut decl = String::from("  wire");
        if wire.width != 1 {
            let _ = write!(decl, " width {}", wire.width);
        }
        if wire.port_id > 0 {
            let keyword = match (wire.port_input, wire.port_output) {
                (true, true) => "inout",
                (false, true) => "output",
                _ => "input",
            };
            let _ = write!(decl, " {} {}", keyword, wire.port_id);
        }
        let _ = writeln!(out, "{} {}", decl, wire.name);
    }
    for memory in module.memories.values() {
        write_attributes(out, "  ", &memory.attributes);
        let _ = writeln!(
            out,
            "  memory width {} size {} {}",
            memory.width, memory.size, memory.name
        );
    }
    for cell in module.cells.values() {
        write_attributes(out, "  ", &cell.attributes);
        let _ = writeln!(out, "  cell {} {}", cell.ty, cell.name);
        for (name, value) in &cell.parameters {
            if cell.signed_parameters.contains(name) {
                let _ = writeln!(out, "    parameter signed {} {}", name, format_const(value));
            } else {
                let _ = writeln!(out, "    parameter {} {}", name, format_const(value));
            }
        }
        for (port, sig) in &cell.connections {
            let _ = writeln!(out, "    connect {} {}", port, format_sig(module, sig));
        }
        let _ = writeln!(out, "  end");
    }
    for process in module.processes.values() {
        write_attributes(out, "  ", &process.attributes);
        let _ = writeln!(out, "  process {}", process.name);
        for (lhs, rhs) in &process.assigns {
            let _ = writeln!(
                out,
                "    assign {} {}",
                format_sig(module, lhs),
                format_sig(module, rhs)
            );
        }
        for sync in &process.syncs {
            let edge = match sync.edge {
                SyncEdge::Posedge => "posedge",
                SyncEdge::Negedge => "negedge",
            };
            let _ = writeln!(out, "    sync {} {}", edge, format_sig(module, &sync.signal));
            for (lhs, rhs) in &sync.updates {
                let _ = writeln!(
                    out,
                    "      update {} {}",
                    format_sig(module, lhs),
                    format_sig(module, rhs)
                );
            }
        }
        let _ = writeln!(out, "  end");
    }
    for (lhs, rhs) in &module.connections {
        let _ = writeln!(
            out,
            "  connect {} {}",
            format_sig(module, lhs),
            format_sig(module, rhs)
        );
    }
    let _ = writeln!(out, "end");
}

fn format_const(value: &Const) -> String {
    if value.is_string() {
        format!("\"{}\"", value.decode_string())
    } else {
        let mut text = format!("{}'", value.width());
        for bit in value.bits.iter().rev() {
            text.push(bit.to_char());
        }
        text
    }
}

/// Format a signal. A chunk that covers its whole wire prints as the bare
/// wire name; anything else prints with an explicit bit range.
fn format_sig(module: &Module, sig: &SigSpec) -> String {
    let chunks = sig.chunks();
    if chunks.len() == 1 {
        return format_chunk(module, &chunks[0]);
    }
    let mut text = String::from("{");
    for chunk in chunks.iter().rev() {
        text.push(' ');
        text.push_str(&format_chunk(module, chunk));
    }
    text.push_str(" }");
    text
}

fn format_chunk(module: &Module, chunk: &SigChunk) -> String {
    match chunk {
        SigChunk::Const(value) => format_const(value),
        SigChunk::Wire { name, offset, width } => {
            let covers_whole = module
                .wire(name)
                .map(|w| *offset == 0 && *width == w.width)
                .unwrap_or(false);
            if covers_whole {
                name.to_string()
            } else if *width == 1 {
                format!("{} [{}]", name, offset)
            } else {
                format!("{} [{}:{}]", name, offset + width - 1, offset)
            }
        }
    }
}

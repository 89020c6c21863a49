//! RTLMAP pass framework
//!
//! This crate handles:
//! - The [`Pass`] trait and the [`PassRegistry`] command dispatcher
//! - Technology mapping and hierarchy flattening (`techmap`, `flatten`)
//! - Process lowering (`proc`)
//! - Unused-wire removal (`clean`)
//! - Design statistics and integrity checking (`stat`, `check`)

pub mod check;
pub mod clean;
pub mod error;
pub mod proc_lower;
pub mod stat;
pub mod techmap;

pub use error::{PassError, Result};
pub use techmap::{FlattenPass, TechmapPass};

use indexmap::IndexMap;
use rtlmap_netlist::{Design, Selection};
use tracing::{debug, warn};

/// A named transformation over a design.
///
/// Passes receive the registry so that they can dispatch nested commands;
/// the mapper uses this to execute template directives.
pub trait Pass {
    /// The command name this pass registers under.
    fn name(&self) -> &'static str;

    /// One-line description for command listings.
    fn help(&self) -> &'static str;

    /// Run the pass. `args` excludes the pass name itself.
    fn execute(&self, args: &[String], design: &mut Design, registry: &PassRegistry)
        -> Result<()>;
}

/// The pass dispatch table.
#[derive(Default)]
pub struct PassRegistry {
    passes: IndexMap<&'static str, Box<dyn Pass>>,
}

impl PassRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PassRegistry::default()
    }

    /// A registry with all built-in passes registered.
    pub fn builtin() -> Self {
        let mut registry = PassRegistry::new();
        registry.register(Box::new(techmap::TechmapPass));
        registry.register(Box::new(techmap::FlattenPass));
        registry.register(Box::new(proc_lower::ProcPass));
        registry.register(Box::new(clean::CleanPass));
        registry.register(Box::new(stat::StatPass));
        registry.register(Box::new(check::CheckPass));
        registry
    }

    /// Register a pass under its own name.
    pub fn register(&mut self, pass: Box<dyn Pass>) {
        self.passes.insert(pass.name(), pass);
    }

    /// Look up a pass by name.
    pub fn get(&self, name: &str) -> Option<&dyn Pass> {
        self.passes.get(name).map(|p| p.as_ref())
    }

    /// The registered passes, in registration order.
    pub fn passes(&self) -> impl Iterator<Item = &dyn Pass> {
        self.passes.values().map(|p| p.as_ref())
    }

    /// Execute a command string: `;`-separated commands, each a pass name
    /// followed by whitespace-separated arguments.
    pub fn call(&self, design: &mut Design, command: &str) -> Result<()> {
        for part in command.split(';') {
            let tokens: Vec<String> = part.split_whitespace().map(str::to_string).collect();
            let Some((name, args)) = tokens.split_first() else {
                continue;
            };
            let pass = self
                .get(name)
                .ok_or_else(|| PassError::UnknownPass(name.clone()))?;
            debug!("Dispatching `{}' pass.", name);
            pass.execute(args, design, self)?;
        }
        Ok(())
    }
}

/// Parse trailing selection arguments into a [`Selection`].
///
/// No arguments inherits the design's current selection (the whole design
/// when none is installed), so passes dispatched under a scoped selection
/// stay scoped. Each argument is a module name pattern (`*` and `?`
/// wildcards); names match with or without their scope sigil. Patterns
/// matching nothing are reported and skipped.
pub fn parse_selection(design: &Design, args: &[String]) -> Result<Selection> {
    if args.is_empty() {
        return Ok(design.selection().cloned().unwrap_or_else(Selection::full));
    }
    let mut selection = Selection::empty();
    for pattern in args {
        let mut matched = false;
        for name in design.modules.keys() {
            if glob_match(pattern, name.as_str()) || glob_match(pattern, name.tail()) {
                selection.select_module(name.clone());
                matched = true;
            }
        }
        if !matched {
            warn!("Selection pattern `{}' matches no module.", pattern);
        }
    }
    Ok(selection)
}

/// Minimal glob matching: `*` matches any run, `?` a single character.
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    glob_match_at(&pattern, &name)
}

fn glob_match_at(pattern: &[char], name: &[char]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some(('*', rest)) => {
            (0..=name.len()).any(|skip| glob_match_at(rest, &name[skip..]))
        }
        Some(('?', rest)) => match name.split_first() {
            Some((_, name_rest)) => glob_match_at(rest, name_rest),
            None => false,
        },
        Some((c, rest)) => match name.split_first() {
            Some((n, name_rest)) if n == c => glob_match_at(rest, name_rest),
            _ => false,
        },
    }
}

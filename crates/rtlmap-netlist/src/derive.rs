//! Parameter specialization
//!
//! [`Design::derive`] produces a parameter-specialized clone of a module,
//! in the spirit of monomorphization: each unique binding of parameter
//! names to constants yields one specialized module, reused on repeat
//! requests. The specialization name encodes the canonically-ordered
//! binding, so callers may memoize by name.
//!
//! At netlist level the binding itself carries the specialization: the
//! clone's declared parameter defaults are overridden by the bound values.
//! Structural rewriting driven by those values is left to passes run over
//! the clone.

use crate::constant::Const;
use crate::error::{NetlistError, Result};
use crate::ident::IdString;
use crate::netlist::Design;
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeMap;
use tracing::debug;

impl Design {
    /// Derive a specialization of `template` for the given parameter
    /// binding. Returns the name of the specialized module; with an empty
    /// binding this is the template's own name. Parameters listed in
    /// `signed_parameters` render as signed values in the name.
    pub fn derive(
        &mut self,
        template: &IdString,
        parameters: &IndexMap<IdString, Const>,
        signed_parameters: &IndexSet<IdString>,
    ) -> Result<IdString> {
        if parameters.is_empty() {
            if self.module(template).is_none() {
                return Err(NetlistError::ModuleNotFound(template.clone()));
            }
            return Ok(template.clone());
        }

        let derived_name = specialization_name(template, parameters, signed_parameters);
        if self.module(&derived_name).is_some() {
            return Ok(derived_name);
        }

        let mut derived = self
            .module(template)
            .ok_or_else(|| NetlistError::ModuleNotFound(template.clone()))?
            .clone();
        derived.name = derived_name.clone();
        for (param, value) in parameters {
            derived.parameter_defaults.insert(param.clone(), value.clone());
        }
        debug!("Derived `{}' from `{}'.", derived_name, template);
        self.add_module(derived)?;
        Ok(derived_name)
    }
}

/// The canonical name of a specialization: the parameter binding in sorted
/// order appended to the template name.
fn specialization_name(
    template: &IdString,
    parameters: &IndexMap<IdString, Const>,
    signed_parameters: &IndexSet<IdString>,
) -> IdString {
    let sorted: BTreeMap<&IdString, &Const> = parameters.iter().collect();
    let mut name = format!("$paramod{}", template);
    for (param, value) in sorted {
        name.push_str(&format!("\\{}=", param.tail()));
        let rendered = if signed_parameters.contains(param) {
            value.as_i64().map(|v| v.to_string())
        } else {
            value.as_u64().map(|v| v.to_string())
        };
        match rendered {
            Some(text) => name.push_str(&text),
            None => {
                // Fall back to the bit form for wide or undefined values.
                for bit in value.bits.iter().rev() {
                    name.push(bit.to_char());
                }
            }
        }
    }
    IdString::new(name)
}

//! Bit-level signal substitution
//!
//! A [`SigMap`] records `from -> to` rewrites per bit and applies them to
//! signals. It backs two jobs in the mapper: reporting the driver of a
//! special wire (built from a module's connection list), and folding the
//! port equalities of an expanded cell into the cloned body instead of
//! emitting redundant top-level connections.

use crate::netlist::Module;
use crate::sigspec::{SigBit, SigSpec};
use std::collections::HashMap;

/// A signal substitution table.
///
/// Later additions win over earlier ones for the same bit; chains of
/// rewrites are followed when applying.
#[derive(Debug, Clone, Default)]
pub struct SigMap {
    map: HashMap<SigBit, SigBit>,
}

impl SigMap {
    /// An empty substitution table.
    pub fn new() -> Self {
        SigMap::default()
    }

    /// A table seeded with the module's top-level connections, rewriting
    /// each left-hand side to its driver.
    pub fn from_module(module: &Module) -> Self {
        let mut map = SigMap::new();
        for (lhs, rhs) in &module.connections {
            map.add(lhs, rhs);
        }
        map
    }

    /// Record that `from` is to be replaced by `to`, bit by bit. Excess
    /// bits on either side are ignored.
    pub fn add(&mut self, from: &SigSpec, to: &SigSpec) {
        for (f, t) in from.bits().into_iter().zip(to.bits()) {
            if f != t {
                self.map.insert(f, t);
            }
        }
    }

    /// Rewrite a signal in place.
    pub fn apply(&self, sig: &mut SigSpec) {
        let bits = sig.bits().into_iter().map(|bit| self.resolve(bit));
        *sig = SigSpec::from_bits(bits.collect::<Vec<_>>());
    }

    fn resolve(&self, mut bit: SigBit) -> SigBit {
        // Follow chains, guarding against accidental cycles.
        let mut hops = 0;
        while let Some(next) = self.map.get(&bit) {
            bit = next.clone();
            hops += 1;
            if hops > self.map.len() {
                break;
            }
        }
        bit
    }
}

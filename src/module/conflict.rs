//! Conflict resolution policy
//!
//! Pure computation of which enabled modules a target displaces. The
//! incompatibility relation is honored from whichever side it is declared:
//! a peer is displaced if the target names it, or if it names the target.

use std::collections::HashMap;

use crate::module::traits::DynamicModule;

/// Currently-enabled modules that must be disabled before `target` may be
/// enabled.
///
/// `declared` is the target's own `incompatible_with` list; `order` is the
/// registry's discovery-order name list. The result is deterministic for a
/// given snapshot: target-side declarations first, in declaration order,
/// then other-side declarers in discovery order. The target never displaces
/// itself, and declared names without a registry entry are ignored.
pub(crate) fn displaced_modules(
    target: &str,
    declared: &[String],
    modules: &HashMap<String, Box<dyn DynamicModule>>,
    order: &[String],
) -> Vec<String> {
    let mut displaced: Vec<String> = Vec::new();

    for name in declared {
        if name == target || displaced.contains(name) {
            continue;
        }
        if let Some(module) = modules.get(name) {
            if module.is_enabled() {
                displaced.push(name.clone());
            }
        }
    }

    for name in order {
        if name == target || displaced.contains(name) {
            continue;
        }
        if let Some(module) = modules.get(name) {
            if module.is_enabled() && module.incompatible_with().iter().any(|n| n == target) {
                displaced.push(name.clone());
            }
        }
    }

    displaced
}

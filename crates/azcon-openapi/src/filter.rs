//! Operation filtering and family deduplication.
//!
//! Connector schemas accumulate `SendMessageV2`, `SendMessageV3`, ... over
//! time; only the newest user-facing revision of each family should surface
//! as a tool.

use std::collections::HashMap;

use tracing::debug;

use crate::types::ParsedOperation;

/// Drops internal, trigger, and webhook-management operations, then keeps
/// only the highest revision per operation family. Survivor order matches
/// input order.
pub fn filter_operations(operations: Vec<ParsedOperation>) -> Vec<ParsedOperation> {
    let visible: Vec<ParsedOperation> = operations
        .into_iter()
        .filter(|op| {
            op.visibility != crate::types::Visibility::Internal
                && !op.is_trigger
                && !op.path.contains("$subscriptions")
        })
        .collect();

    // Winner per family: maximum revision, first seen wins ties.
    let mut winners: HashMap<String, (usize, i64)> = HashMap::new();
    for (index, op) in visible.iter().enumerate() {
        if let Some(family) = op.family() {
            let revision = op.revision();
            match winners.get(family) {
                Some((_, best)) if *best >= revision => {}
                _ => {
                    winners.insert(family.to_string(), (index, revision));
                }
            }
        }
    }

    let survivors: Vec<ParsedOperation> = visible
        .into_iter()
        .enumerate()
        .filter(|(index, op)| match op.family() {
            Some(family) => winners.get(family).is_some_and(|(i, _)| i == index),
            None => !op.deprecated,
        })
        .map(|(_, op)| op)
        .collect();

    debug!(count = survivors.len(), "operations after filtering");
    survivors
}

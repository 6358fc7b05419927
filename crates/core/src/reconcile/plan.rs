//! The reconciliation diff.

/// Per-backend actions bringing stored data in line with a new target set.
///
/// Built from two immutable snapshots — the resolved target set T and the
/// previously persisted set P — so the diff step is independently
/// testable: `to_add = T − P`, `to_remove = P − T`, `to_update = T ∩ P`.
/// Backends in `to_update` are only written when the payload or filename
/// actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Backends gaining a copy this cycle.
    pub to_add: Vec<String>,
    /// Backends keeping their copy (written only on payload change,
    /// moved only on rename).
    pub to_update: Vec<String>,
    /// Backends losing their copy this cycle.
    pub to_remove: Vec<String>,
}

impl ReconcilePlan {
    /// Diff a target set against a previous set.
    ///
    /// Order follows the target for add/update and the previous set for
    /// remove, so phases run in declaration order.
    #[must_use]
    pub fn diff(target: &[String], previous: &[String]) -> Self {
        let mut plan = Self::default();
        for name in target {
            if previous.contains(name) {
                plan.to_update.push(name.clone());
            } else {
                plan.to_add.push(name.clone());
            }
        }
        for name in previous {
            if !target.contains(name) {
                plan.to_remove.push(name.clone());
            }
        }
        plan
    }

    /// Whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

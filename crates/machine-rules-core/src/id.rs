use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Identifies one placed machine instance in the [`InstanceRegistry`](crate::instance::InstanceRegistry).
    pub struct InstanceKey;
}

/// Type prefix used when an item id is given without one.
pub const DEFAULT_ITEM_TYPE: &str = "(O)";

/// Qualify an item id with the object type prefix if it has none.
///
/// `"348"` becomes `"(O)348"`; `"(BC)12"` is returned unchanged.
pub fn qualify_item_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with('(') && raw.contains(')') {
        raw.to_string()
    } else {
        format!("{DEFAULT_ITEM_TYPE}{raw}")
    }
}

/// Identifies a machine type by its qualified item id, e.g. `(BC)12`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub String);

impl MachineId {
    pub fn new(raw: &str) -> Self {
        Self(qualify_item_id(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Stable identity of one trigger-to-output-rule pairing on a machine.
///
/// The persistence key for enable/disable state. `trigger_index` is the
/// trigger's position in its rule, which breaks ties when ids collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleIdent {
    pub machine: MachineId,
    pub rule: String,
    pub trigger: String,
    pub trigger_index: usize,
}

impl RuleIdent {
    pub fn new(
        machine: MachineId,
        rule: impl Into<String>,
        trigger: impl Into<String>,
        trigger_index: usize,
    ) -> Self {
        Self {
            machine,
            rule: rule.into(),
            trigger: trigger.into(),
            trigger_index,
        }
    }
}

impl fmt::Display for RuleIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}#{}",
            self.machine, self.rule, self.trigger, self.trigger_index
        )
    }
}

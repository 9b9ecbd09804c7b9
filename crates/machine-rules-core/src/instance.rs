//! Placed machine instances and their per-instance panel state.
//!
//! The host registers an instance when a machine is placed and removes it
//! when the machine is picked up. Keys are generational, so a key kept by a
//! closed panel never aliases a later instance.

use crate::id::{InstanceKey, MachineId};
use slotmap::SlotMap;

/// Panel state remembered per placed machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelSession {
    /// Page the panel was showing when last closed. Kept within the entry
    /// list each time the panel opens.
    pub page: usize,
    /// Number of entries the last open produced.
    pub last_entry_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInstance {
    pub machine: MachineId,
    pub session: PanelSession,
}

#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: SlotMap<InstanceKey, MachineInstance>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, machine: MachineId) -> InstanceKey {
        self.instances.insert(MachineInstance {
            machine,
            session: PanelSession::default(),
        })
    }

    pub fn remove(&mut self, key: InstanceKey) -> Option<MachineInstance> {
        self.instances.remove(key)
    }

    pub fn get(&self, key: InstanceKey) -> Option<&MachineInstance> {
        self.instances.get(key)
    }

    pub fn machine(&self, key: InstanceKey) -> Option<&MachineId> {
        self.instances.get(key).map(|instance| &instance.machine)
    }

    pub fn session_mut(&mut self, key: InstanceKey) -> Option<&mut PanelSession> {
        self.instances.get_mut(key).map(|instance| &mut instance.session)
    }

    /// Forget every instance of a machine type that no longer exists.
    /// Returns the number removed.
    pub fn retain_machines(&mut self, mut keep: impl FnMut(&MachineId) -> bool) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, instance| keep(&instance.machine));
        before - self.instances.len()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

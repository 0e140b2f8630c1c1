//! NPC registry.
//!
//! Holds every registered NPC keyed by id. Registration happens while a scene
//! loads, before any dialogue can start. Each NPC sits behind its own lock so
//! the dialogue controller can mutate one NPC without touching the map.

use std::sync::Arc;

use babel_domain::{Npc, NpcId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::RwLock;

/// Shared handle to a registered NPC.
pub type SharedNpc = Arc<RwLock<Npc>>;

/// Registry misuse. Both variants indicate a programming error in the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("NPC id {0} is already registered")]
    DuplicateId(NpcId),
    #[error("NPC not found: {0}")]
    NotFound(NpcId),
}

/// In-memory collection of NPCs keyed by id.
#[derive(Debug, Default)]
pub struct NpcRegistry {
    npcs: DashMap<NpcId, SharedNpc>,
}

impl NpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an NPC. Fails if the id is taken; the existing NPC is untouched.
    pub fn register(&self, npc: Npc) -> Result<SharedNpc, RegistryError> {
        let id = npc.id();
        match self.npcs.entry(id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateId(id)),
            Entry::Vacant(slot) => {
                tracing::debug!(npc_id = %id, name = npc.name(), job = npc.job(), "Registered NPC");
                let shared = Arc::new(RwLock::new(npc));
                slot.insert(Arc::clone(&shared));
                Ok(shared)
            }
        }
    }

    pub fn find(&self, id: NpcId) -> Result<SharedNpc, RegistryError> {
        self.npcs
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn contains(&self, id: NpcId) -> bool {
        self.npcs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    /// Snapshot of every registered NPC, ordered by id.
    ///
    /// The returned iterator is detached from the map, so registering while
    /// iterating is safe and not observed. Clone it to iterate again.
    pub fn all(&self) -> impl Iterator<Item = SharedNpc> + Clone {
        let mut snapshot: Vec<(NpcId, SharedNpc)> = self
            .npcs
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);
        snapshot.into_iter().map(|(_, npc)| npc)
    }

    /// Ids of NPCs currently flagged as in dialogue.
    pub async fn in_dialogue(&self) -> Vec<NpcId> {
        let mut talking = Vec::new();
        for npc in self.all() {
            let npc = npc.read().await;
            if npc.in_dialogue() {
                talking.push(npc.id());
            }
        }
        talking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc(id: u32, name: &str) -> Npc {
        Npc::new(NpcId::new(id), name, "Villager").expect("valid npc")
    }

    #[test]
    fn register_then_find() {
        let registry = NpcRegistry::new();
        registry.register(npc(8, "Teddy")).expect("first registration");

        let found = registry.find(NpcId::new(8)).expect("registered");
        assert_eq!(found.try_read().expect("uncontended").name(), "Teddy");
        assert!(registry.contains(NpcId::new(8)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected_and_first_kept() {
        let registry = NpcRegistry::new();
        registry.register(npc(8, "Teddy")).expect("first registration");

        let err = registry.register(npc(8, "Impostor")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId(NpcId::new(8)));

        let kept = registry.find(NpcId::new(8)).expect("still registered");
        assert_eq!(kept.try_read().expect("uncontended").name(), "Teddy");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry = NpcRegistry::new();
        assert_eq!(
            registry.find(NpcId::new(99)).unwrap_err(),
            RegistryError::NotFound(NpcId::new(99))
        );
    }

    #[test]
    fn all_is_a_restartable_snapshot() {
        let registry = NpcRegistry::new();
        registry.register(npc(11, "Esmeralda")).expect("register");
        registry.register(npc(8, "Teddy")).expect("register");

        let snapshot = registry.all();
        registry.register(npc(3, "Ronny")).expect("register while holding snapshot");

        let names = |iter: &mut dyn Iterator<Item = SharedNpc>| -> Vec<String> {
            iter.map(|n| n.try_read().expect("uncontended").name().to_string())
                .collect()
        };

        assert_eq!(names(&mut snapshot.clone()), vec!["Teddy", "Esmeralda"]);
        assert_eq!(names(&mut snapshot.clone()), vec!["Teddy", "Esmeralda"]);
        assert_eq!(registry.all().count(), 3);
    }

    #[tokio::test]
    async fn in_dialogue_lists_flagged_npcs() {
        let registry = NpcRegistry::new();
        let teddy = registry.register(npc(8, "Teddy")).expect("register");
        registry.register(npc(11, "Esmeralda")).expect("register");

        assert!(registry.in_dialogue().await.is_empty());
        teddy.write().await.begin_dialogue();
        assert_eq!(registry.in_dialogue().await, vec![NpcId::new(8)]);
    }
}

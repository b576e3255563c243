use crate::api::types::EntityId;
use crate::components::entity::Entity;

/// Entity storage using a flat Vec in document order.
/// Designed for small-to-medium entity counts (hundreds, not millions).
pub struct Scene {
    entities: Vec<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            entities: Vec::with_capacity(256),
        }
    }

    /// Create a scene with a specific entity capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
        }
    }

    /// Add an entity at the end of the scene.
    pub fn spawn(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Add an entity right before `sibling`, or at the end if the sibling is unknown.
    pub fn insert_before(&mut self, entity: Entity, sibling: EntityId) {
        match self.position(sibling) {
            Some(idx) => self.entities.insert(idx, entity),
            None => self.entities.push(entity),
        }
    }

    /// Move an existing entity to the end. Returns false if it is not in the scene.
    pub fn move_to_end(&mut self, id: EntityId) -> bool {
        match self.position(id) {
            Some(idx) => {
                let entity = self.entities.remove(idx);
                self.entities.push(entity);
                true
            }
            None => false,
        }
    }

    /// Move an existing entity right before `sibling`.
    pub fn move_before(&mut self, id: EntityId, sibling: EntityId) -> bool {
        if id == sibling {
            return self.position(id).is_some();
        }
        match self.position(id) {
            Some(idx) => {
                let entity = self.entities.remove(idx);
                self.insert_before(entity, sibling);
                true
            }
            None => false,
        }
    }

    /// Remove an entity by ID, keeping the order of the others.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.position(id).map(|idx| self.entities.remove(idx))
    }

    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id == id)
    }

    /// Get a reference to an entity by ID.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Entity at a scene position. Callers hold a position from `position`.
    pub(crate) fn at(&self, index: usize) -> &Entity {
        &self.entities[index]
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut Entity {
        &mut self.entities[index]
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Iterate over all entities in order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterate over all entities mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// IDs in scene order. A snapshot, so the scene can be mutated while walking it.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }

    /// Find the first entity with the given tag.
    pub fn find_by_tag(&self, tag: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.tag == tag)
    }

    /// Find all entities with the given tag.
    pub fn find_all_by_tag(&self, tag: &str) -> Vec<&Entity> {
        self.entities.iter().filter(|e| e.tag == tag).collect()
    }

    /// Number of entities in the scene.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Remove all entities, returning them in order.
    pub fn drain(&mut self) -> Vec<Entity> {
        self.entities.drain(..).collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ViewportId;

    fn entity(id: u32) -> Entity {
        Entity::new(EntityId(id), ViewportId(0))
    }

    #[test]
    fn spawn_and_get() {
        let mut scene = Scene::new();
        scene.spawn(entity(1).with_tag("hero"));
        let e = scene.get(EntityId(1)).unwrap();
        assert_eq!(e.tag, "hero");
    }

    #[test]
    fn despawn_keeps_order() {
        let mut scene = Scene::new();
        for id in 1..=4 {
            scene.spawn(entity(id));
        }
        scene.despawn(EntityId(2));
        assert_eq!(scene.ids(), vec![EntityId(1), EntityId(3), EntityId(4)]);
    }

    #[test]
    fn insert_before_sibling() {
        let mut scene = Scene::new();
        scene.spawn(entity(1));
        scene.spawn(entity(2));
        scene.insert_before(entity(3), EntityId(2));
        scene.insert_before(entity(4), EntityId(99));
        assert_eq!(scene.ids(), vec![EntityId(1), EntityId(3), EntityId(2), EntityId(4)]);
    }

    #[test]
    fn move_entities_around() {
        let mut scene = Scene::new();
        for id in 1..=3 {
            scene.spawn(entity(id));
        }
        assert!(scene.move_to_end(EntityId(1)));
        assert_eq!(scene.ids(), vec![EntityId(2), EntityId(3), EntityId(1)]);
        assert!(scene.move_before(EntityId(1), EntityId(2)));
        assert_eq!(scene.ids(), vec![EntityId(1), EntityId(2), EntityId(3)]);
        assert!(!scene.move_to_end(EntityId(9)));
    }

    #[test]
    fn find_by_tag() {
        let mut scene = Scene::new();
        scene.spawn(entity(1).with_tag("hero"));
        scene.spawn(entity(2).with_tag("enemy"));
        let hero = scene.find_by_tag("hero").unwrap();
        assert_eq!(hero.id, EntityId(1));
        assert_eq!(scene.find_all_by_tag("enemy").len(), 1);
    }
}

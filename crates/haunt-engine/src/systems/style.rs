use serde::Serialize;

use crate::api::types::Axis;
use crate::components::entity::Entity;

/// What the page needs to render one entity: both channel transforms with their
/// transition declarations, size and content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStyle {
    pub id: u32,
    pub tag: String,
    pub transform_x: String,
    pub transition_x: String,
    pub transform_y: String,
    pub transition_y: String,
    pub width: f32,
    pub height: f32,
    pub sticky: bool,
    pub content: String,
}

impl EntityStyle {
    pub fn from_entity(entity: &Entity) -> Self {
        let x = entity.channel(Axis::X);
        let y = entity.channel(Axis::Y);
        Self {
            id: entity.id.0,
            tag: entity.tag.clone(),
            transform_x: x.transform_css(),
            transition_x: x.transition_css(),
            transform_y: y.transform_css(),
            transition_y: y.transition_css(),
            width: entity.width,
            height: entity.height,
            sticky: entity.sticky,
            content: entity.content(),
        }
    }
}

/// Build the style snapshot from a set of entities, skipping those not yet ready.
pub fn build_style_snapshot<'a>(entities: impl Iterator<Item = &'a Entity>, snapshot: &mut Vec<EntityStyle>) {
    snapshot.clear();
    snapshot.extend(entities.filter(|e| e.is_ready()).map(EntityStyle::from_entity));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::game::GameConfig;
    use crate::core::viewport::{ElementSpec, Viewport};

    #[test]
    fn snapshot_skips_entities_that_are_not_ready() {
        let mut vp = Viewport::new(&GameConfig::default());
        vp.create_element(ElementSpec::default().with_attribute("x", 5)).unwrap();
        let mut snapshot = Vec::new();
        build_style_snapshot(vp.entities(), &mut snapshot);
        assert!(snapshot.is_empty());

        vp.tick(16.0).unwrap();
        build_style_snapshot(vp.entities(), &mut snapshot);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].transform_x, "translateX(5px)");
        assert_eq!(snapshot[0].transition_y, "transform 0s linear");
        assert_eq!(snapshot[0].width, 16.0);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut vp = Viewport::new(&GameConfig::default());
        vp.create_element(ElementSpec::default()).unwrap();
        vp.tick(16.0).unwrap();
        let mut snapshot = Vec::new();
        build_style_snapshot(vp.entities(), &mut snapshot);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"transform_x\":\"translateX(0px)\""));
    }
}

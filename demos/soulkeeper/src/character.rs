use std::rc::Rc;

use haunt_engine::{Animatable, EngineError, EntityMut, MoveOptions, Positionable, TimerId, Viewport};

use crate::board::TILE_SIZE;

/// Extension name of walking visitors.
pub const EXTENSION: &str = "Character";

/// Characters walk slightly above the path row so their feet sit on it.
const OFFSET_Y: f32 = -6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterKind {
    Boy,
    Adult,
    Soldier,
}

impl CharacterKind {
    pub const ALL: [CharacterKind; 3] = [CharacterKind::Boy, CharacterKind::Adult, CharacterKind::Soldier];

    pub fn name(self) -> &'static str {
        match self {
            CharacterKind::Boy => "boy",
            CharacterKind::Adult => "adult",
            CharacterKind::Soldier => "soldier",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// (base speed, base courage, soulstone reward)
    fn base(self) -> (u32, u32, u32) {
        match self {
            CharacterKind::Boy => (14, 500, 5),
            CharacterKind::Adult => (18, 1000, 10),
            CharacterKind::Soldier => (20, 1500, 20),
        }
    }
}

/// Per-spawn numbers. Later spawns are braver and faster, up to a cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterStats {
    pub max_courage: f32,
    pub speed: f32,
    pub reward: u32,
}

impl CharacterStats {
    /// `created` counts this character too.
    pub fn for_spawn(kind: CharacterKind, created: u32) -> Self {
        let (base_speed, base_courage, reward) = kind.base();
        let max_courage = ((base_courage + 100) * 20).min(base_courage * (created / 10 + 1));
        let speed = ((base_speed + 5) * 5).min(base_speed + created / 8);
        Self {
            max_courage: max_courage as f32,
            speed: speed as f32,
            reward,
        }
    }
}

/// Which end of the path a character walks toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    LeftToRight,
    RightToLeft,
}

impl Heading {
    pub fn name(self) -> &'static str {
        match self {
            Heading::LeftToRight => "right",
            Heading::RightToLeft => "left",
        }
    }

    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("left") => Heading::RightToLeft,
            _ => Heading::LeftToRight,
        }
    }

    fn step(self) -> isize {
        match self {
            Heading::LeftToRight => 1,
            Heading::RightToLeft => -1,
        }
    }

    fn start_index(self, waypoints: usize) -> isize {
        match self {
            Heading::LeftToRight => 0,
            Heading::RightToLeft => waypoints as isize - 1,
        }
    }
}

fn waypoint_position(waypoint: (i32, i32)) -> (f32, f32) {
    (waypoint.0 as f32 * TILE_SIZE, waypoint.1 as f32 * TILE_SIZE + OFFSET_Y)
}

/// Register the `Character` extension.
///
/// The hook reads `character-type`, `created` and `heading`, places the entity one
/// tile outside its entry waypoint and renders the courage meter.
pub fn define(viewport: &mut Viewport, waypoints: Rc<[(i32, i32)]>) {
    viewport.define(EXTENSION, move |entity: &mut EntityMut<'_>| {
        let attrs = entity.attributes();
        let raw_kind = attrs.get("character-type").unwrap_or_default();
        let kind = CharacterKind::parse(raw_kind).ok_or_else(|| EngineError::MalformedAttribute {
            name: "character-type".to_string(),
            value: raw_kind.to_string(),
        })?;
        let created = attrs.get_int("created", 1.0)? as u32;
        let heading = Heading::parse(attrs.get("heading"));
        let stats = CharacterStats::for_spawn(kind, created);

        let start = heading.start_index(waypoints.len());
        let Some(&entry) = usize::try_from(start).ok().and_then(|i| waypoints.get(i)) else {
            return Ok(None);
        };
        let (x, y) = waypoint_position(entry);
        let outside = match heading {
            Heading::LeftToRight => -TILE_SIZE,
            Heading::RightToLeft => TILE_SIZE,
        };
        entity.set_x(x + outside);
        entity.set_y(y);

        let max = stats.max_courage;
        let facing = if heading == Heading::RightToLeft { " left" } else { "" };
        Ok(Some(format!(
            r#"<span class="tile anim {kind}{facing}"></span><meter min="0" max="{max}" low="{low}" high="{high}" optimum="{max}" value="{max}"></meter>"#,
            kind = kind.name(),
            low = max * 0.35,
            high = max * 0.65,
        )))
    });
}

/// Whether a character is still on the path after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Walking,
    /// Ran past the last waypoint. The caller removes the entity.
    Arrived,
}

/// Game-side state of one character.
#[derive(Debug, Clone)]
pub struct Walker {
    pub kind: CharacterKind,
    pub heading: Heading,
    pub stats: CharacterStats,
    pub courage: f32,
    pub speed: f32,
    pub fleeing: bool,
    /// Courage interval while walking, removal timeout once fleeing.
    pub clock: Option<TimerId>,
    index: isize,
}

impl Walker {
    pub fn new(kind: CharacterKind, created: u32, heading: Heading, waypoints: usize) -> Self {
        let stats = CharacterStats::for_spawn(kind, created);
        Self {
            kind,
            heading,
            stats,
            courage: stats.max_courage,
            speed: stats.speed,
            fleeing: false,
            clock: None,
            index: heading.start_index(waypoints),
        }
    }

    #[cfg(test)]
    pub fn index(&self) -> isize {
        self.index
    }

    /// Target the next waypoint in the current heading.
    pub fn advance(&mut self, entity: &mut EntityMut<'_>, waypoints: &[(i32, i32)]) -> Result<Step, EngineError> {
        self.index += self.heading.step();
        self.walk(entity, waypoints)
    }

    /// (Re)issue the move toward the current waypoint at the current speed.
    pub fn walk(&self, entity: &mut EntityMut<'_>, waypoints: &[(i32, i32)]) -> Result<Step, EngineError> {
        let Some(&next) = usize::try_from(self.index).ok().and_then(|i| waypoints.get(i)) else {
            return Ok(Step::Arrived);
        };
        let (x, y) = waypoint_position(next);
        let options = MoveOptions::speed(self.speed);
        entity.move_x(x, options)?;
        entity.move_y(y, options)?;
        Ok(Step::Walking)
    }

    /// Apply one second of fear. Returns true when courage ran out.
    pub fn update_courage(&mut self, crowd_bonus: i32, scaryometer: i32) -> bool {
        self.courage += (crowd_bonus - scaryometer) as f32;
        self.courage <= 0.0
    }

    /// Run toward the nearer edge at five times the speed.
    pub fn flee(
        &mut self,
        entity: &mut EntityMut<'_>,
        waypoints: &[(i32, i32)],
        board_width: f32,
    ) -> Result<Step, EngineError> {
        self.fleeing = true;
        self.speed *= 5.0;

        let previous = self.heading;
        self.heading = if entity.x() < board_width / 2.0 {
            Heading::RightToLeft
        } else {
            Heading::LeftToRight
        };
        log::debug!("{:?} {} flees {:?}", entity.id(), self.kind.name(), self.heading);

        if previous == self.heading {
            self.walk(entity, waypoints)
        } else {
            self.advance(entity, waypoints)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haunt_engine::{ElementSpec, EntityId, EventKind, GameConfig};

    const PATH: [(i32, i32); 4] = [(-1, 2), (2, 2), (2, 5), (4, 5)];

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(&GameConfig::default());
        define(&mut vp, Rc::from(PATH.as_slice()));
        vp
    }

    fn spawn(vp: &mut Viewport, kind: &str, heading: Heading) -> Result<EntityId, EngineError> {
        let id = vp.create_element(
            ElementSpec::new(EXTENSION)
                .with_attribute("character-type", kind)
                .with_attribute("created", 1)
                .with_attribute("heading", heading.name()),
        )?;
        vp.tick(0.0)?;
        Ok(id)
    }

    #[test]
    fn stats_grow_with_spawn_count() {
        assert_eq!(
            CharacterStats::for_spawn(CharacterKind::Boy, 1),
            CharacterStats { max_courage: 500.0, speed: 14.0, reward: 5 }
        );
        let late = CharacterStats::for_spawn(CharacterKind::Adult, 40);
        assert_eq!(late.max_courage, 5000.0);
        assert_eq!(late.speed, 23.0);
        // Caps.
        let capped = CharacterStats::for_spawn(CharacterKind::Soldier, 10_000);
        assert_eq!(capped.max_courage, 32_000.0);
        assert_eq!(capped.speed, 125.0);
    }

    #[test]
    fn hook_places_character_outside_the_entry() {
        let mut vp = viewport();
        let ltr = spawn(&mut vp, "boy", Heading::LeftToRight).unwrap();
        let rtl = spawn(&mut vp, "soldier", Heading::RightToLeft).unwrap();

        let mut e = vp.handle(ltr).unwrap();
        assert_eq!((e.x(), e.y()), (-32.0, 26.0));
        assert!(e.entity().content().contains(r#"max="500""#));

        let mut e = vp.handle(rtl).unwrap();
        assert_eq!((e.x(), e.y()), (80.0, 74.0));
        assert!(e.entity().content().contains("soldier left"));
    }

    #[test]
    fn unknown_character_type_fails_ready() {
        let mut vp = viewport();
        let err = spawn(&mut vp, "ogre", Heading::LeftToRight).unwrap_err();
        assert!(matches!(err, EngineError::MalformedAttribute { name, .. } if name == "character-type"));
    }

    #[test]
    fn walker_follows_waypoints_to_the_end() {
        let mut vp = viewport();
        let id = spawn(&mut vp, "boy", Heading::LeftToRight).unwrap();
        vp.drain_events();
        let mut walker = Walker::new(CharacterKind::Boy, 1, Heading::LeftToRight, PATH.len());
        walker.advance(&mut vp.handle(id).unwrap(), &PATH).unwrap();

        let mut arrived = false;
        let mut legs = 1;
        for _ in 0..200 {
            vp.tick(100.0).unwrap();
            let moves = vp
                .drain_events()
                .into_iter()
                .filter(|e| matches!(e.kind, EventKind::AfterMoveX | EventKind::AfterMoveY))
                .count();
            for _ in 0..moves {
                if walker.advance(&mut vp.handle(id).unwrap(), &PATH).unwrap() == Step::Arrived {
                    arrived = true;
                } else {
                    legs += 1;
                }
            }
            if arrived {
                break;
            }
        }
        assert!(arrived);
        assert_eq!(legs, 3);
        assert_eq!(vp.handle(id).unwrap().x(), 64.0);
    }

    #[test]
    fn courage_runs_out_and_walker_turns_back() {
        let mut vp = viewport();
        let id = spawn(&mut vp, "boy", Heading::LeftToRight).unwrap();
        let mut walker = Walker::new(CharacterKind::Boy, 1, Heading::LeftToRight, PATH.len());
        walker.advance(&mut vp.handle(id).unwrap(), &PATH).unwrap();

        assert!(!walker.update_courage(0, 100));
        assert!(walker.update_courage(2, 402));

        // Still left of center: turn around toward the entry.
        let step = walker.flee(&mut vp.handle(id).unwrap(), &PATH, 480.0).unwrap();
        assert_eq!(step, Step::Walking);
        assert!(walker.fleeing);
        assert_eq!(walker.heading, Heading::RightToLeft);
        assert_eq!(walker.index(), 0);
        assert_eq!(walker.speed, 70.0);
        assert!((vp.handle(id).unwrap().hspeed().abs() - 70.0).abs() < 1e-3);
    }
}

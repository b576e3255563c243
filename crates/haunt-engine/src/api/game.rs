use serde::{Deserialize, Serialize};

use crate::api::error::EngineError;
use crate::api::types::{GameEvent, ScrollBounds, SoundEvent};
use crate::components::attributes::Attributes;
use crate::core::viewport::Viewport;
use crate::input::queue::InputQueue;

/// Configuration for the engine, provided by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Visible width of the viewport in unzoomed pixels (default: 800).
    pub width: f32,
    /// Visible height of the viewport in unzoomed pixels (default: 600).
    pub height: f32,
    /// Frame rate of the follow loop and of geometry cache invalidation (default: 60).
    pub fps: f32,
    /// Viewport scale factor (default: 1).
    pub zoom: f32,
    /// Optional scroll limits (min_x, min_y, max_x, max_y). Default: [0, ∞) on both axes.
    pub scroll_bounds: Option<[f32; 4]>,
    /// Left/top border widths of the viewport element.
    pub border: [f32; 2],
    /// Top-left corner of the viewport element on the page.
    pub page_origin: [f32; 2],
    /// Maximum number of sound events per frame (default: 32).
    pub max_sounds: usize,
    /// Maximum number of game events per frame (default: 32).
    pub max_events: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            fps: 60.0,
            zoom: 1.0,
            scroll_bounds: None,
            border: [0.0, 0.0],
            page_origin: [0.0, 0.0],
            max_sounds: 32,
            max_events: 32,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read `width`, `height`, `fps` and `zoom` from element attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, EngineError> {
        let defaults = Self::default();
        Ok(Self {
            width: attributes.get_int("width", defaults.width)?,
            height: attributes.get_int("height", defaults.height)?,
            fps: attributes.get_int("fps", defaults.fps)?,
            zoom: attributes.get_int("zoom", defaults.zoom)?,
            ..defaults
        })
    }

    /// Fixed timestep in seconds.
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.fps.max(1.0)
    }

    pub fn scroll_bounds(&self) -> ScrollBounds {
        match self.scroll_bounds {
            Some([min_x, min_y, max_x, max_y]) => ScrollBounds::new(min_x, max_x, min_y, max_y),
            None => ScrollBounds::default(),
        }
    }
}

/// The core contract every game must fulfill.
pub trait Game {
    /// Return engine configuration. Called once before init.
    fn config(&self) -> GameConfig {
        GameConfig::default()
    }

    /// Register extensions, create the initial entities.
    fn init(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError>;

    /// The game loop tick. Runs after the viewport has advanced; drain its events here.
    fn update(&mut self, ctx: &mut EngineContext, input: &InputQueue) -> Result<(), EngineError>;
}

/// Mutable access to engine state, passed to Game::init and Game::update.
pub struct EngineContext {
    pub viewport: Viewport,
    pub sounds: Vec<SoundEvent>,
    pub events: Vec<GameEvent>,
}

impl EngineContext {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            viewport: Viewport::new(config),
            sounds: Vec::with_capacity(config.max_sounds),
            events: Vec::with_capacity(config.max_events),
        }
    }

    /// Emit a sound event to be forwarded to the host page.
    pub fn emit_sound(&mut self, event: SoundEvent) {
        self.sounds.push(event);
    }

    /// Emit a game event to be forwarded to the host page.
    pub fn emit_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Clear per-frame transient data (sounds, events).
    pub fn clear_frame_data(&mut self) {
        self.sounds.clear();
        self.events.clear();
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_json_keeps_defaults() {
        let config = GameConfig::from_json(r#"{ "width": 480, "zoom": 2 }"#).unwrap();
        assert_eq!(config.width, 480.0);
        assert_eq!(config.zoom, 2.0);
        assert_eq!(config.height, 600.0);
        assert_eq!(config.fps, 60.0);
    }

    #[test]
    fn config_from_bad_json_is_an_error() {
        assert!(matches!(
            GameConfig::from_json("{ width: }"),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn config_from_attributes() {
        let attrs = Attributes::new().with("width", "480").with("fps", "30");
        let config = GameConfig::from_attributes(&attrs).unwrap();
        assert_eq!(config.width, 480.0);
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.zoom, 1.0);
        assert!((config.fixed_dt() - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn scroll_bounds_default_to_non_negative() {
        let bounds = GameConfig::default().scroll_bounds();
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.max_x, f32::INFINITY);

        let config = GameConfig {
            scroll_bounds: Some([0.0, 0.0, 320.0, 0.0]),
            ..GameConfig::default()
        };
        assert_eq!(config.scroll_bounds().max_x, 320.0);
        assert_eq!(config.scroll_bounds().max_y, 0.0);
    }

    #[test]
    fn context_collects_frame_data() {
        let mut ctx = EngineContext::default();
        ctx.emit_sound(SoundEvent(2));
        ctx.emit_event(GameEvent::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(ctx.sounds.len(), 1);
        ctx.clear_frame_data();
        assert!(ctx.sounds.is_empty());
        assert!(ctx.events.is_empty());
    }
}

use haunt_engine::{
    build_style_snapshot, EngineContext, EngineError, EntityStyle, FixedTimestep, Game, GameConfig,
    InputEvent, InputQueue, Scrollable,
};
use glam::Vec2;

/// Generic game runner that wires the viewport clock to the page.
///
/// Each concrete game creates a `thread_local!` GameRunner and exports free
/// functions via `#[wasm_bindgen]`, because wasm-bindgen cannot export
/// generic structs directly.
pub struct GameRunner<G: Game> {
    game: G,
    ctx: EngineContext,
    input: InputQueue,
    timestep: FixedTimestep,
    config: GameConfig,
    initialized: bool,
    /// Set once an engine error reached the runner. The game stays frozen.
    halted: bool,
    /// Flat buffer of sound event IDs for the page to read.
    sound_buffer: Vec<u8>,
    styles: Vec<EntityStyle>,
    snapshot_json: String,
}

impl<G: Game> GameRunner<G> {
    pub fn new(game: G) -> Self {
        let config = game.config();
        let timestep = FixedTimestep::from_fps(config.fps);
        let sound_buffer = Vec::with_capacity(config.max_sounds);

        Self {
            game,
            ctx: EngineContext::new(&config),
            input: InputQueue::new(),
            timestep,
            config,
            initialized: false,
            halted: false,
            sound_buffer,
            styles: Vec::new(),
            snapshot_json: String::from("[]"),
        }
    }

    /// Initialize the game. Call once after construction.
    pub fn init(&mut self) {
        let result = self.game.init(&mut self.ctx);
        self.initialized = true;
        self.check(result);
        self.rebuild_snapshot();
    }

    fn check(&mut self, result: Result<(), EngineError>) {
        if let Err(err) = result {
            log::error!("game halted: {err}");
            self.halted = true;
        }
    }

    /// Push an input event. Pointer positions arrive in page coordinates and are
    /// queued in world pixels.
    pub fn push_input(&mut self, event: InputEvent) {
        let event = match event.position() {
            Some(page) => {
                self.ctx.viewport.on_pointer_move(page);
                let world = self.ctx.viewport.mouse() + self.ctx.viewport.scroll();
                event.with_position(world)
            }
            None => event,
        };
        self.input.push(event);
    }

    /// Run one frame: advance the viewport clock in fixed steps, update the game,
    /// then publish styles and sounds.
    ///
    /// Queued input is seen by the first step only. A frame too short for a step keeps
    /// it for the next frame.
    pub fn tick(&mut self, dt: f32) {
        if !self.initialized || self.halted {
            return;
        }

        self.ctx.clear_frame_data();

        let steps = self.timestep.accumulate(dt);
        let step_ms = self.timestep.dt_ms();
        for _ in 0..steps {
            let result = self.step(step_ms);
            self.input.drain();
            self.check(result);
            if self.halted {
                break;
            }
        }

        self.rebuild_snapshot();

        self.sound_buffer.clear();
        for sound in self.ctx.sounds.iter().take(self.config.max_sounds) {
            self.sound_buffer.push(sound.0 as u8);
        }
    }

    fn step(&mut self, step_ms: f64) -> Result<(), EngineError> {
        self.ctx.viewport.tick(step_ms)?;
        self.game.update(&mut self.ctx, &self.input)
    }

    fn rebuild_snapshot(&mut self) {
        build_style_snapshot(self.ctx.viewport.entities(), &mut self.styles);
        match serde_json::to_string(&self.styles) {
            Ok(json) => self.snapshot_json = json,
            Err(err) => log::warn!("style snapshot not serializable: {err}"),
        }
    }

    /// The page element was resized or its layout changed.
    pub fn host_resize(&mut self) {
        self.ctx.viewport.on_host_resize();
    }

    /// The page scrolled; `origin` is the element's new top-left corner.
    pub fn host_scroll(&mut self, x: f32, y: f32) {
        self.ctx.viewport.on_host_scroll(Vec2::new(x, y));
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    // ---- Accessors for the page ----

    pub fn style_snapshot(&self) -> &str {
        &self.snapshot_json
    }

    pub fn sound_events_ptr(&self) -> *const u8 {
        self.sound_buffer.as_ptr()
    }

    pub fn sound_events_len(&self) -> u32 {
        self.sound_buffer.len() as u32
    }

    pub fn game_events_ptr(&self) -> *const f32 {
        self.ctx.events.as_ptr() as *const f32
    }

    pub fn game_events_len(&self) -> u32 {
        self.ctx.events.len().min(self.config.max_events) as u32
    }

    pub fn viewport_width(&self) -> f32 {
        self.config.width
    }

    pub fn viewport_height(&self) -> f32 {
        self.config.height
    }

    pub fn scroll_x(&self) -> f32 {
        self.ctx.viewport.scroll().x
    }

    pub fn scroll_y(&self) -> f32 {
        self.ctx.viewport.scroll().y
    }

    pub fn max_sounds(&self) -> u32 {
        self.config.max_sounds as u32
    }

    pub fn max_events(&self) -> u32 {
        self.config.max_events as u32
    }
}

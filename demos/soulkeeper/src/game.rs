use std::collections::HashMap;
use std::rc::Rc;

use haunt_engine::*;

use crate::board::{Board, Level, TileKind, COLUMNS, TILE_SIZE};
use crate::character::{self, CharacterKind, Heading, Step, Walker};
use crate::shop::{self, Purse, ShopItem, BATS_UNLOCK_AT, GHOSTS_UNLOCK_AT, REMOVE_COST};
use crate::tutorial::{Outcome, Tutorial, LAST_STEP, STEP_TIMEOUT_MS};

const WORLD_WIDTH: f32 = COLUMNS as f32 * TILE_SIZE;
const WORLD_HEIGHT: f32 = 320.0;
const SEED: u64 = 0x50_11_4E_E9;
const LIVES: u32 = 3;

// Timings (milliseconds)
const SCARYOMETER_CACHE_MS: f64 = 5000.0;
const SOULSTONE_AWARD_MS: f64 = 4000.0;
const FLOWER_GROWTH_MS: f64 = 10_000.0;
const COURAGE_TICK_MS: f64 = 1000.0;
const FLED_REMOVAL_MS: f64 = 10_000.0;
const FIRST_SPAWN_INTERVAL_MS: f64 = 5000.0;
const MIN_SPAWN_INTERVAL_MS: f64 = 1000.0;
const SPAWN_INTERVAL_STEP_MS: f64 = 10.0;
const EXTRA_SPAWN_DELAY_MS: f64 = 1000.0;
const FIRST_CHARACTER_DELAY_MS: f64 = 300.0;

// Sounds (Rust → page)
pub const SOUND_GHOST: SoundEvent = SoundEvent(1);
pub const SOUND_REMOVE: SoundEvent = SoundEvent(2);
pub const SOUND_BUTTON: SoundEvent = SoundEvent(3);
pub const SOUND_FORBIDDEN: SoundEvent = SoundEvent(4);
pub const SOUND_LIFE_LOST: SoundEvent = SoundEvent(5);

// Game event kinds (Rust → page)
pub const EVENT_TILE: f32 = 1.0; // a = index, b = kind code, c = level + 10 if upgradable
pub const EVENT_SOULSTONES: f32 = 2.0;
pub const EVENT_SCARYOMETER: f32 = 3.0;
pub const EVENT_LIVES: f32 = 4.0;
pub const EVENT_TUTORIAL: f32 = 5.0; // a = step (0 = finished), b = outcome
pub const EVENT_MODE: f32 = 6.0;
pub const EVENT_LOCKS: f32 = 7.0; // a = graves missing, b = trees missing
pub const EVENT_COURAGE: f32 = 8.0; // a = entity, b = courage, c = max
pub const EVENT_FLEE: f32 = 9.0;
pub const EVENT_PREVIEW: f32 = 10.0; // a = index (-1 = none), b = allowed, c = endangered index
pub const EVENT_GAME_OVER: f32 = 11.0;
pub const EVENT_RESTART: f32 = 12.0;

// Custom event kinds (page → Rust)
pub const CUSTOM_SHOP: u32 = 1; // a = shop item code
pub const CUSTOM_TUTORIAL: u32 = 2; // a = next step, 0 resumes play

/// What a click on the board does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tutorial,
    Build,
    Remove,
}

impl Mode {
    fn code(self) -> f32 {
        match self {
            Mode::Tutorial => 0.0,
            Mode::Build => 1.0,
            Mode::Remove => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GameTask {
    AwardSoulstones,
    GrowFlower,
    Spawn,
    ExtraSpawn(CharacterKind),
    FirstCharacter,
    Courage(EntityId),
    RemoveFled(EntityId),
    Upgradable(usize),
    TutorialTimeout(u8, Outcome),
}

pub struct Soulkeeper {
    rng: Rng,
    board: Board,
    waypoints: Rc<[(i32, i32)]>,
    purse: Purse,
    lives: u32,
    mode: Mode,
    selected: Option<ShopItem>,
    tutorial: Tutorial,
    tutorial_clock: Option<TimerId>,
    tutorial_character: Option<EntityId>,
    first_character_sent: bool,
    walkers: HashMap<EntityId, Walker>,
    created: u32,
    spawn_interval: f64,
    timers: TimerQueue<GameTask>,
    /// Soulstone award and flower growth intervals, once started.
    economy: Option<(TimerId, TimerId)>,
    spawn_clock: Option<TimerId>,
    /// Last computed scaryometer and when.
    scaryometer: Option<(i32, f64)>,
    hovered: Option<usize>,
    over: bool,
}

impl Soulkeeper {
    pub fn new() -> Self {
        Self::with_seed(SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut rng = Rng::new(seed);
        let board = Board::generate(&mut rng);
        let waypoints = Rc::from(board.waypoints());
        Self {
            rng,
            board,
            waypoints,
            purse: Purse::default(),
            lives: LIVES,
            mode: Mode::Tutorial,
            selected: None,
            tutorial: Tutorial::new(),
            tutorial_clock: None,
            tutorial_character: None,
            first_character_sent: false,
            walkers: HashMap::new(),
            created: 0,
            spawn_interval: FIRST_SPAWN_INTERVAL_MS,
            timers: TimerQueue::new(),
            economy: None,
            spawn_clock: None,
            scaryometer: None,
            hovered: None,
            over: false,
        }
    }

    // ---- Page events ----

    fn emit_tile(&self, ctx: &mut EngineContext, index: usize) {
        if let Some(tile) = self.board.tile(index) {
            let level = tile.kind.level().map_or(0.0, |l| l as u8 as f32);
            let flags = if tile.upgradable { 10.0 } else { 0.0 };
            ctx.emit_event(GameEvent::new(EVENT_TILE, index as f32, tile.kind.code() as f32, level + flags));
        }
    }

    fn emit_soulstones(&self, ctx: &mut EngineContext) {
        ctx.emit_event(GameEvent::new(EVENT_SOULSTONES, self.purse.balance() as f32, 0.0, 0.0));
    }

    fn emit_locks(&self, ctx: &mut EngineContext) {
        let graves_missing = GHOSTS_UNLOCK_AT.saturating_sub(self.board.grave_count());
        let trees_missing = BATS_UNLOCK_AT.saturating_sub(self.board.tree_count());
        ctx.emit_event(GameEvent::new(EVENT_LOCKS, graves_missing as f32, trees_missing as f32, 0.0));
    }

    fn ghosts_unlocked(&self) -> bool {
        self.board.grave_count() >= GHOSTS_UNLOCK_AT
    }

    fn bats_unlocked(&self) -> bool {
        self.board.tree_count() >= BATS_UNLOCK_AT
    }

    // ---- Scaryometer ----

    /// Scaryometer value, recomputed at most every five seconds unless forced.
    fn scaryometer(&mut self, now: f64, force: bool) -> i32 {
        if let Some((value, at)) = self.scaryometer {
            if !force && now - at < SCARYOMETER_CACHE_MS {
                return value;
            }
        }
        let value = self.board.scaryometer();
        self.scaryometer = Some((value, now));
        value
    }

    fn render_scaryometer(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        let value = self.scaryometer(ctx.viewport.now_ms(), true);
        ctx.emit_event(GameEvent::new(EVENT_SCARYOMETER, value as f32, 0.0, 0.0));
        if let Some(outcome) = self.tutorial.on_scaryometer(value) {
            self.go_to_tutorial(ctx, 6, outcome)?;
        }
        Ok(())
    }

    // ---- Modes and tutorial ----

    fn change_mode(&mut self, ctx: &mut EngineContext, mode: Mode) -> Result<(), EngineError> {
        self.mode = mode;
        ctx.emit_event(GameEvent::new(EVENT_MODE, mode.code(), 0.0, 0.0));

        if !self.first_character_sent && self.tutorial.awaits_first_character() {
            self.first_character_sent = true;
            let now = ctx.viewport.now_ms();
            for index in 0..self.board.len() {
                if matches!(self.board.kind(index), Some(TileKind::Tombstone(_))) {
                    let delay = self.rng.random(20_000, 40_000) as f64;
                    self.prepare_upgradable(now, index, delay);
                }
            }
            self.timers.schedule(now, FIRST_CHARACTER_DELAY_MS, GameTask::FirstCharacter);
        } else if self.tutorial.is_at(LAST_STEP) {
            self.tutorial.finish();
            ctx.emit_event(GameEvent::new(EVENT_TUTORIAL, 0.0, 0.0, 0.0));
            log::info!("tutorial finished, visitors incoming");
            self.spawn(ctx)?;
        }
        Ok(())
    }

    fn go_to_tutorial(&mut self, ctx: &mut EngineContext, step: u8, outcome: Outcome) -> Result<(), EngineError> {
        if let Some(clock) = self.tutorial_clock.take() {
            self.timers.cancel(clock);
        }
        self.change_mode(ctx, Mode::Tutorial)?;
        self.tutorial.go_to(step, outcome);
        ctx.emit_event(GameEvent::new(EVENT_TUTORIAL, step as f32, outcome.code(), 0.0));
        log::debug!("tutorial step {step} ({outcome:?})");
        Ok(())
    }

    fn tutorial_button(&mut self, ctx: &mut EngineContext, next: u32) -> Result<(), EngineError> {
        ctx.emit_sound(SOUND_BUTTON);
        if self.over {
            ctx.emit_event(GameEvent::new(EVENT_RESTART, 0.0, 0.0, 0.0));
            return Ok(());
        }
        match u8::try_from(next) {
            Ok(0) => {
                let mode = match self.selected {
                    Some(ShopItem::Remove) => Mode::Remove,
                    _ => Mode::Build,
                };
                self.change_mode(ctx, mode)
            }
            Ok(step) => self.go_to_tutorial(ctx, step, Outcome::Plain),
            Err(_) => Ok(()),
        }
    }

    fn select(&mut self, ctx: &mut EngineContext, code: u32) -> Result<(), EngineError> {
        let Some(item) = ShopItem::from_code(code) else {
            return Ok(());
        };
        let locked = match item {
            ShopItem::Ghost => !self.ghosts_unlocked(),
            ShopItem::Bat => !self.bats_unlocked(),
            _ => false,
        };
        if locked {
            return Ok(());
        }
        self.selected = Some(item);
        let mode = if item == ShopItem::Remove { Mode::Remove } else { Mode::Build };
        self.change_mode(ctx, mode)?;
        ctx.emit_sound(SOUND_BUTTON);
        Ok(())
    }

    // ---- Board interaction ----

    fn prepare_upgradable(&mut self, now: f64, index: usize, delay: f64) {
        let timer = self.timers.schedule(now, delay, GameTask::Upgradable(index));
        if let Some(tile) = self.board.tile_mut(index) {
            if let Some(previous) = tile.upgrade_timer.replace(timer) {
                self.timers.cancel(previous);
            }
        }
    }

    /// Clear a tile and cancel its pending upgrade.
    fn clear_tile(&mut self, ctx: &mut EngineContext, index: usize) {
        if let Some(timer) = self.board.set_kind(index, TileKind::Empty) {
            self.timers.cancel(timer);
        }
        self.emit_tile(ctx, index);
    }

    fn click(&mut self, ctx: &mut EngineContext, index: usize) -> Result<(), EngineError> {
        let Some(tile) = self.board.tile(index) else {
            return Ok(());
        };
        if tile.upgradable {
            self.upgrade(ctx, index)
        } else if self.mode == Mode::Remove {
            self.remove_tile(ctx, index)
        } else if self.mode == Mode::Build {
            self.build(ctx, index)
        } else {
            Ok(())
        }
    }

    fn remove_tile(&mut self, ctx: &mut EngineContext, index: usize) -> Result<(), EngineError> {
        if !self.board.kind(index).is_some_and(TileKind::is_built) {
            return Ok(());
        }
        if !self.purse.spend(REMOVE_COST) {
            ctx.emit_sound(SOUND_FORBIDDEN);
            return Ok(());
        }

        let dependents = self.board.dependents(index);
        self.clear_tile(ctx, index);
        for dependent in dependents {
            self.clear_tile(ctx, dependent);
        }
        ctx.emit_sound(SOUND_REMOVE);
        self.emit_soulstones(ctx);
        self.emit_locks(ctx);
        self.render_scaryometer(ctx)?;

        if let Some(next) = self.tutorial.on_removal(self.board.flower_count()) {
            self.go_to_tutorial(ctx, next, Outcome::Plain)?;
            self.start_economy(ctx.viewport.now_ms());
            self.tutorial_clock = Some(self.timers.schedule(
                ctx.viewport.now_ms(),
                STEP_TIMEOUT_MS,
                GameTask::TutorialTimeout(4, Outcome::Plain),
            ));
        }
        Ok(())
    }

    fn build(&mut self, ctx: &mut EngineContext, index: usize) -> Result<(), EngineError> {
        let Some(kind) = self.selected.and_then(ShopItem::builds) else {
            return Ok(());
        };
        if self.board.kind(index) != Some(TileKind::Empty) {
            return Ok(());
        }
        if !self.board.can_place(index, kind) {
            ctx.emit_sound(SOUND_FORBIDDEN);
            return Ok(());
        }
        if !self.tutorial.accepts_build(kind) {
            return Ok(());
        }
        self.purchase(ctx, index, kind)
    }

    fn upgrade(&mut self, ctx: &mut EngineContext, index: usize) -> Result<(), EngineError> {
        let upgraded = match self.board.kind(index) {
            Some(TileKind::Tombstone(level)) => level.next().map(TileKind::Tombstone),
            Some(TileKind::Grave(level)) => level.next().map(TileKind::Grave),
            _ => None,
        };
        let Some(upgraded) = upgraded else {
            return Ok(());
        };
        if !self.tutorial.accepts_build(upgraded) {
            return Ok(());
        }
        self.purchase(ctx, index, upgraded)
    }

    /// Pay for and place `kind` on `index`, then run the follow-up rules.
    fn purchase(&mut self, ctx: &mut EngineContext, index: usize, kind: TileKind) -> Result<(), EngineError> {
        let upgrade = self.board.kind(index) != Some(TileKind::Empty);
        let price = shop::cost(kind).unwrap_or(0);
        if !self.purse.spend(price) {
            ctx.emit_sound(SOUND_FORBIDDEN);
            return Ok(());
        }

        if let Some(timer) = self.board.set_kind(index, kind) {
            self.timers.cancel(timer);
        }
        self.emit_tile(ctx, index);
        self.emit_soulstones(ctx);
        ctx.emit_sound(SOUND_GHOST);

        let now = ctx.viewport.now_ms();
        if upgrade {
            if let TileKind::Tombstone(_) = kind {
                if let Some(grave) = self.board.below(index) {
                    let pending = self.board.tile(grave).is_some_and(|t| t.upgradable);
                    if !pending {
                        self.check_grave_upgradable(now, grave, index);
                    }
                }
            }
        } else if matches!(kind, TileKind::Grave(_) | TileKind::Tree) {
            self.emit_locks(ctx);
        }

        if let Some(next) = self.tutorial.on_build() {
            self.go_to_tutorial(ctx, next, Outcome::Plain)?;
            if next == 5 {
                self.tutorial_clock = Some(self.timers.schedule(
                    now,
                    STEP_TIMEOUT_MS,
                    GameTask::TutorialTimeout(6, Outcome::Failure),
                ));
            }
        }

        self.render_scaryometer(ctx)?;

        match kind {
            TileKind::Tombstone(level) if level != Level::Three && !self.tutorial.is_at(5) => {
                let delay = if level == Level::One { 100_000.0 } else { 120_000.0 };
                self.prepare_upgradable(now, index, delay);
            }
            TileKind::Grave(level) if level != Level::Three => {
                if let Some(tombstone) = self.board.above(index) {
                    self.check_grave_upgradable(now, index, tombstone);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// A grave may level up while the tombstone above it is ahead of it.
    fn check_grave_upgradable(&mut self, now: f64, grave: usize, tombstone: usize) {
        let Some(TileKind::Grave(grave_level)) = self.board.kind(grave) else {
            return;
        };
        let Some(TileKind::Tombstone(tombstone_level)) = self.board.kind(tombstone) else {
            return;
        };
        let allowed = tombstone_level == Level::Three
            || (tombstone_level == Level::Two && grave_level == Level::One);
        if allowed {
            let delay = if grave_level == Level::One { 40_000.0 } else { 60_000.0 };
            self.prepare_upgradable(now, grave, delay);
        }
    }

    /// Hover feedback: whether a click would do something, and what else it would take.
    fn preview(&self, index: usize) -> Option<(bool, Option<usize>)> {
        let tile = self.board.tile(index)?;
        if tile.upgradable {
            let next = match tile.kind {
                TileKind::Tombstone(level) => level.next().map(TileKind::Tombstone),
                TileKind::Grave(level) => level.next().map(TileKind::Grave),
                _ => None,
            }?;
            let affordable = shop::cost(next).is_some_and(|c| c <= self.purse.balance());
            return Some((affordable, None));
        }
        match self.mode {
            Mode::Remove if tile.kind.is_built() => {
                Some((true, self.board.dependents(index).into_iter().next()))
            }
            Mode::Build if tile.kind == TileKind::Empty => {
                let kind = self.selected.and_then(ShopItem::builds)?;
                Some((self.board.can_place(index, kind), None))
            }
            _ => None,
        }
    }

    fn hover(&mut self, ctx: &mut EngineContext, index: Option<usize>) {
        if index == self.hovered {
            return;
        }
        self.hovered = index;
        let event = match index.and_then(|i| self.preview(i).map(|p| (i, p))) {
            Some((i, (allowed, endangered))) => GameEvent::new(
                EVENT_PREVIEW,
                i as f32,
                if allowed { 1.0 } else { 0.0 },
                endangered.map_or(-1.0, |e| e as f32),
            ),
            None => GameEvent::new(EVENT_PREVIEW, -1.0, 0.0, -1.0),
        };
        ctx.emit_event(event);
    }

    // ---- Economy ----

    fn start_economy(&mut self, now: f64) {
        if self.economy.is_some() {
            return;
        }
        let award = self.timers.schedule_repeating(now, SOULSTONE_AWARD_MS, GameTask::AwardSoulstones);
        let growth = self.timers.schedule_repeating(now, FLOWER_GROWTH_MS, GameTask::GrowFlower);
        self.economy = Some((award, growth));
    }

    fn grow_flower(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        let empty = self.board.empty_tiles();
        if empty.is_empty() {
            return Ok(());
        }
        let pick = empty[self.rng.next_int(empty.len() as u32) as usize];
        let kind = if self.board.soulflower_count() == 0 || self.rng.random(0, 100) <= 33 {
            TileKind::Soulflower
        } else {
            TileKind::Flower
        };
        self.board.set_kind(pick, kind);
        self.emit_tile(ctx, pick);
        self.render_scaryometer(ctx)
    }

    // ---- Characters ----

    fn create_character(&mut self, ctx: &mut EngineContext, kind: CharacterKind) -> Result<EntityId, EngineError> {
        self.created += 1;
        let heading = if self.rng.random(0, 1) == 1 {
            Heading::RightToLeft
        } else {
            Heading::LeftToRight
        };
        let id = ctx.viewport.create_element(
            ElementSpec::new(character::EXTENSION)
                .with_attribute("width", TILE_SIZE)
                .with_attribute("height", TILE_SIZE)
                .with_attribute("character-type", kind.name())
                .with_attribute("created", self.created)
                .with_attribute("heading", heading.name())
                .detached(),
        )?;
        ctx.viewport.append(id)?;
        self.walkers
            .insert(id, Walker::new(kind, self.created, heading, self.waypoints.len()));
        log::debug!("{:?}: {} #{} enters", id, kind.name(), self.created);
        Ok(id)
    }

    /// One round of the spawn loop. Reschedules itself a little sooner each time.
    fn spawn(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        let kind = if self.created < 10 {
            CharacterKind::Boy
        } else if self.created < 30 {
            CharacterKind::ALL[self.rng.random(0, 1) as usize]
        } else {
            CharacterKind::ALL[self.rng.random(0, 2) as usize]
        };
        self.create_character(ctx, kind)?;

        let now = ctx.viewport.now_ms();
        if self.created >= 3 && self.rng.random(1, 3) == 3 {
            self.timers.schedule(now, EXTRA_SPAWN_DELAY_MS, GameTask::ExtraSpawn(kind));
        }
        if self.spawn_interval > MIN_SPAWN_INTERVAL_MS {
            self.spawn_interval -= SPAWN_INTERVAL_STEP_MS;
        }
        self.spawn_clock = Some(self.timers.schedule(now, self.spawn_interval, GameTask::Spawn));
        Ok(())
    }

    /// Issue the next move of a walker. Removes the entity once it walked off the path.
    fn step_walker(&mut self, ctx: &mut EngineContext, id: EntityId, advance: bool) -> Result<(), EngineError> {
        if !ctx.viewport.contains(id) {
            return Ok(());
        }
        let Some(walker) = self.walkers.get_mut(&id) else {
            return Ok(());
        };
        let step = {
            let mut entity = ctx.viewport.handle(id)?;
            if advance {
                walker.advance(&mut entity, &self.waypoints)?
            } else {
                walker.walk(&mut entity, &self.waypoints)?
            }
        };
        if step == Step::Arrived {
            ctx.viewport.remove(id);
        }
        Ok(())
    }

    fn on_ready(&mut self, ctx: &mut EngineContext, id: EntityId) -> Result<(), EngineError> {
        let now = ctx.viewport.now_ms();
        if let Some(walker) = self.walkers.get_mut(&id) {
            walker.clock = Some(self.timers.schedule_repeating(now, COURAGE_TICK_MS, GameTask::Courage(id)));
        }
        self.step_walker(ctx, id, true)
    }

    fn on_destroy(&mut self, ctx: &mut EngineContext, id: EntityId) -> Result<(), EngineError> {
        let Some(walker) = self.walkers.remove(&id) else {
            return Ok(());
        };
        if let Some(clock) = walker.clock {
            self.timers.cancel(clock);
        }
        if self.over {
            return Ok(());
        }
        if self.tutorial_character == Some(id) {
            self.tutorial_character = None;
            let outcome = if walker.fleeing { Outcome::Success } else { Outcome::Failure };
            self.go_to_tutorial(ctx, 7, outcome)?;
        }
        if !walker.fleeing {
            self.lose_life(ctx);
        }
        Ok(())
    }

    fn courage_tick(&mut self, ctx: &mut EngineContext, id: EntityId) -> Result<(), EngineError> {
        let brave = self.walkers.values().filter(|w| !w.fleeing).count() as i32;
        let scaryometer = self.scaryometer(ctx.viewport.now_ms(), false);
        let Some(walker) = self.walkers.get_mut(&id) else {
            return Ok(());
        };
        if walker.fleeing {
            return Ok(());
        }
        let spent = walker.update_courage((brave - 1) * 2, scaryometer);
        ctx.emit_event(GameEvent::new(EVENT_COURAGE, id.0 as f32, walker.courage, walker.stats.max_courage));
        if spent {
            self.flee(ctx, id)?;
        }
        Ok(())
    }

    fn flee(&mut self, ctx: &mut EngineContext, id: EntityId) -> Result<(), EngineError> {
        if !ctx.viewport.contains(id) {
            return Ok(());
        }
        let now = ctx.viewport.now_ms();
        let Some(walker) = self.walkers.get_mut(&id) else {
            return Ok(());
        };
        self.purse.earn(walker.stats.reward);
        if let Some(clock) = walker.clock.take() {
            self.timers.cancel(clock);
        }
        walker.clock = Some(self.timers.schedule(now, FLED_REMOVAL_MS, GameTask::RemoveFled(id)));

        let step = {
            let mut entity = ctx.viewport.handle(id)?;
            walker.flee(&mut entity, &self.waypoints, WORLD_WIDTH)?
        };
        ctx.emit_event(GameEvent::new(EVENT_FLEE, id.0 as f32, 0.0, 0.0));
        self.emit_soulstones(ctx);
        if step == Step::Arrived {
            ctx.viewport.remove(id);
        }
        Ok(())
    }

    fn lose_life(&mut self, ctx: &mut EngineContext) {
        if !self.tutorial.is_finished() || self.lives == 0 {
            return;
        }
        self.lives -= 1;
        ctx.emit_sound(SOUND_LIFE_LOST);
        ctx.emit_event(GameEvent::new(EVENT_LIVES, self.lives as f32, 0.0, 0.0));
        if self.lives == 0 {
            self.game_over(ctx);
        }
    }

    fn game_over(&mut self, ctx: &mut EngineContext) {
        self.over = true;
        let ids: Vec<EntityId> = self.walkers.keys().copied().collect();
        for id in ids {
            ctx.viewport.remove(id);
        }
        if let Some((award, growth)) = self.economy.take() {
            self.timers.cancel(award);
            self.timers.cancel(growth);
        }
        if let Some(spawn) = self.spawn_clock.take() {
            self.timers.cancel(spawn);
        }
        let value = self.scaryometer(ctx.viewport.now_ms(), true);
        ctx.emit_event(GameEvent::new(EVENT_GAME_OVER, value as f32, self.created as f32, 0.0));
        log::info!("game over after {} visitors", self.created);
    }

    // ---- Timers ----

    fn run_task(&mut self, ctx: &mut EngineContext, task: GameTask) -> Result<(), EngineError> {
        match task {
            GameTask::AwardSoulstones => {
                if self.mode != Mode::Tutorial {
                    self.purse.earn(self.board.soulflower_count() as u32);
                    self.emit_soulstones(ctx);
                }
            }
            GameTask::GrowFlower => {
                if self.mode != Mode::Tutorial {
                    self.grow_flower(ctx)?;
                }
            }
            GameTask::Spawn => {
                if !self.over {
                    self.spawn(ctx)?;
                }
            }
            GameTask::ExtraSpawn(kind) => {
                if !self.over {
                    self.create_character(ctx, kind)?;
                }
            }
            GameTask::FirstCharacter => {
                let id = self.create_character(ctx, CharacterKind::Boy)?;
                self.tutorial_character = Some(id);
            }
            GameTask::Courage(id) => self.courage_tick(ctx, id)?,
            GameTask::RemoveFled(id) => {
                if ctx.viewport.contains(id) {
                    ctx.viewport.remove(id);
                }
            }
            GameTask::Upgradable(index) => {
                if let Some(tile) = self.board.tile_mut(index) {
                    tile.upgradable = true;
                    tile.upgrade_timer = None;
                }
                self.emit_tile(ctx, index);
            }
            GameTask::TutorialTimeout(step, outcome) => {
                self.tutorial_clock = None;
                self.go_to_tutorial(ctx, step, outcome)?;
            }
        }
        Ok(())
    }
}

impl Default for Soulkeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Soulkeeper {
    fn config(&self) -> GameConfig {
        GameConfig {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            zoom: 2.0,
            max_events: 1024,
            ..GameConfig::default()
        }
    }

    fn init(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        character::define(&mut ctx.viewport, Rc::clone(&self.waypoints));

        for index in 0..self.board.len() {
            self.emit_tile(ctx, index);
        }
        self.emit_soulstones(ctx);
        self.emit_locks(ctx);
        ctx.emit_event(GameEvent::new(EVENT_LIVES, self.lives as f32, 0.0, 0.0));
        self.render_scaryometer(ctx)?;
        self.go_to_tutorial(ctx, 1, Outcome::Plain)?;
        log::info!("soulkeeper: board ready, {} waypoints", self.waypoints.len());
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext, input: &InputQueue) -> Result<(), EngineError> {
        for event in input.iter() {
            match *event {
                InputEvent::Custom { kind: CUSTOM_SHOP, a, .. } => self.select(ctx, a as u32)?,
                InputEvent::Custom { kind: CUSTOM_TUTORIAL, a, .. } => self.tutorial_button(ctx, a as u32)?,
                InputEvent::PointerDown { x, y } if !self.over => {
                    if let Some(index) = self.board.index_at(x, y) {
                        self.click(ctx, index)?;
                    }
                }
                InputEvent::PointerMove { x, y } | InputEvent::PointerOver { x, y } => {
                    let index = self.board.index_at(x, y);
                    self.hover(ctx, index);
                }
                InputEvent::PointerOut { .. } => self.hover(ctx, None),
                _ => {}
            }
        }

        for event in ctx.viewport.drain_events() {
            let Some(id) = event.entity() else {
                continue;
            };
            match event.kind {
                EventKind::Ready => self.on_ready(ctx, id)?,
                EventKind::AfterMoveX | EventKind::AfterMoveY => self.step_walker(ctx, id, true)?,
                EventKind::Destroy => self.on_destroy(ctx, id)?,
                EventKind::TransformationEnd(_) => {}
            }
        }

        let now = ctx.viewport.now_ms();
        while let Some((_, task)) = self.timers.pop_due(now) {
            self.run_task(ctx, task)?;
        }
        Ok(())
    }
}

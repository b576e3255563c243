use crate::board::TileKind;

/// Last tutorial step. Resuming play from it finishes the tutorial.
pub const LAST_STEP: u8 = 8;
/// Idle timeout of the timed steps, in milliseconds.
pub const STEP_TIMEOUT_MS: f64 = 60_000.0;

const REMOVALS_TO_PASS: u32 = 3;
const SOULFLOWERS_TO_PASS: u32 = 5;
const TREES_TO_PASS: u32 = 3;

/// Variant of a step that can end two ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Plain,
    Success,
    Failure,
}

impl Outcome {
    pub fn code(self) -> f32 {
        match self {
            Outcome::Plain => 0.0,
            Outcome::Success => 1.0,
            Outcome::Failure => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Step(u8, Outcome),
    Finished,
}

/// Step counter of the onboarding flow.
///
/// 1. intro, 2. remove flowers, 3. plant soulflowers, 4. plant trees,
/// 5. balance the scaryometer, 6. success or failure, 7. first visitor scared
/// away or not, 8. outro.
#[derive(Debug, Clone)]
pub struct Tutorial {
    phase: Phase,
    counter: u32,
}

impl Tutorial {
    pub fn new() -> Self {
        Self {
            phase: Phase::Step(1, Outcome::Plain),
            counter: 0,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn step(&self) -> Option<u8> {
        match self.phase {
            Phase::Step(step, _) => Some(step),
            Phase::Finished => None,
        }
    }

    pub fn is_at(&self, step: u8) -> bool {
        self.step() == Some(step)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    #[cfg(test)]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn go_to(&mut self, step: u8, outcome: Outcome) {
        self.phase = Phase::Step(step, outcome);
        self.counter = 0;
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.counter = 0;
    }

    /// Step 6 ended, one way or the other: time for the first visitor.
    pub fn awaits_first_character(&self) -> bool {
        matches!(self.phase, Phase::Step(6, Outcome::Success | Outcome::Failure))
    }

    /// Steps 3 and 4 only let the player plant what they teach.
    pub fn accepts_build(&self, kind: TileKind) -> bool {
        match self.step() {
            Some(3) => kind == TileKind::Soulflower,
            Some(4) => kind == TileKind::Tree,
            _ => true,
        }
    }

    /// A tile was cleared. Returns the next step when step 2 is done.
    pub fn on_removal(&mut self, flowers_left: usize) -> Option<u8> {
        if !self.is_at(2) {
            return None;
        }
        self.counter += 1;
        (self.counter >= REMOVALS_TO_PASS || flowers_left == 0).then_some(3)
    }

    /// Something was planted. Returns the next step when steps 3 or 4 are done.
    pub fn on_build(&mut self) -> Option<u8> {
        let (needed, next) = match self.step() {
            Some(3) => (SOULFLOWERS_TO_PASS, 4),
            Some(4) => (TREES_TO_PASS, 5),
            _ => return None,
        };
        self.counter += 1;
        (self.counter >= needed).then_some(next)
    }

    /// The scaryometer changed. Step 5 resolves once it is balanced or hopeless.
    pub fn on_scaryometer(&self, value: i32) -> Option<Outcome> {
        if !self.is_at(5) {
            return None;
        }
        if value >= 0 {
            Some(Outcome::Success)
        } else if value <= -30 {
            Some(Outcome::Failure)
        } else {
            None
        }
    }
}

impl Default for Tutorial {
    fn default() -> Self {
        Self::new()
    }
}

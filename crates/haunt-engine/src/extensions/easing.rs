// extensions/easing.rs
//
// CSS timing functions for channel transitions.
// Pure math: parse the keyword or `cubic-bezier(...)` form, evaluate progress.

use std::fmt;
use std::str::FromStr;

use crate::api::error::EngineError;

/// Transition timing function.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    /// Constant velocity. Default for every move.
    #[default]
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Jump to the end immediately.
    StepStart,
    /// Hold the start value until the end.
    StepEnd,
    /// Custom curve with control points (x1, y1, x2, y2).
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Apply the timing function to a normalized time value `t` in [0, 1].
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::StepStart => 1.0,
            Easing::StepEnd => {
                if t >= 1.0 { 1.0 } else { 0.0 }
            }
            _ => {
                let (x1, y1, x2, y2) = self.control_points();
                cubic_bezier(x1, y1, x2, y2, t)
            }
        }
    }

    fn control_points(self) -> (f32, f32, f32, f32) {
        match self {
            Easing::Ease => (0.25, 0.1, 0.25, 1.0),
            Easing::EaseIn => (0.42, 0.0, 1.0, 1.0),
            Easing::EaseOut => (0.0, 0.0, 0.58, 1.0),
            Easing::EaseInOut => (0.42, 0.0, 0.58, 1.0),
            Easing::CubicBezier(x1, y1, x2, y2) => (x1, y1, x2, y2),
            Easing::Linear | Easing::StepStart | Easing::StepEnd => (0.0, 0.0, 1.0, 1.0),
        }
    }
}

fn bezier_component(a: f32, b: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * t * a + 3.0 * u * t * t * b + t * t * t
}

fn bezier_slope(a: f32, b: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * a + 6.0 * u * t * (b - a) + 3.0 * t * t * (1.0 - b)
}

/// Evaluate a CSS cubic-bezier at progress `x`: solve for the curve parameter
/// with Newton steps, falling back to bisection where the slope is flat.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    if x <= 0.0 || x >= 1.0 {
        return x;
    }

    let mut t = x;
    for _ in 0..8 {
        let err = bezier_component(x1, x2, t) - x;
        if err.abs() < 1e-5 {
            return bezier_component(y1, y2, t);
        }
        let slope = bezier_slope(x1, x2, t);
        if slope.abs() < 1e-6 {
            break;
        }
        t -= err / slope;
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    t = x;
    for _ in 0..32 {
        let value = bezier_component(x1, x2, t);
        if (value - x).abs() < 1e-5 {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.0;
    }
    bezier_component(y1, y2, t)
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("linear"),
            Easing::Ease => f.write_str("ease"),
            Easing::EaseIn => f.write_str("ease-in"),
            Easing::EaseOut => f.write_str("ease-out"),
            Easing::EaseInOut => f.write_str("ease-in-out"),
            Easing::StepStart => f.write_str("step-start"),
            Easing::StepEnd => f.write_str("step-end"),
            Easing::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
        }
    }
}

impl FromStr for Easing {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let easing = match trimmed {
            "linear" => Easing::Linear,
            "ease" => Easing::Ease,
            "ease-in" => Easing::EaseIn,
            "ease-out" => Easing::EaseOut,
            "ease-in-out" => Easing::EaseInOut,
            "step-start" => Easing::StepStart,
            "step-end" => Easing::StepEnd,
            _ => {
                let args = trimmed
                    .strip_prefix("cubic-bezier(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(|| EngineError::MalformedEasing(s.to_string()))?;
                let points = args
                    .split(',')
                    .map(|p| p.trim().parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| EngineError::MalformedEasing(s.to_string()))?;
                match points.as_slice() {
                    &[x1, y1, x2, y2] if (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2) => {
                        Easing::CubicBezier(x1, y1, x2, y2)
                    }
                    _ => return Err(EngineError::MalformedEasing(s.to_string())),
                }
            }
        };
        Ok(easing)
    }
}

// ── Interpolation helpers ────────────────────────────────────────────────

/// Linearly interpolate between two values.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolate with easing.
#[inline]
pub fn ease(a: f32, b: f32, t: f32, easing: Easing) -> f32 {
    lerp(a, b, easing.apply(t))
}

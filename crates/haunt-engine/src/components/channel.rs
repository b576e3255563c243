use std::fmt;
use std::str::FromStr;

use crate::api::error::EngineError;
use crate::api::types::Axis;
use crate::extensions::easing::{ease, Easing};

/// The transform function a channel animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformProperty {
    TranslateX,
    TranslateY,
}

impl TransformProperty {
    pub fn for_axis(axis: Axis) -> Self {
        match axis {
            Axis::X => TransformProperty::TranslateX,
            Axis::Y => TransformProperty::TranslateY,
        }
    }
}

impl fmt::Display for TransformProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformProperty::TranslateX => f.write_str("translateX"),
            TransformProperty::TranslateY => f.write_str("translateY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Seconds,
    Millis,
}

/// Transition duration as written in a transition declaration: magnitude plus unit.
/// A bare number is in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationSpec {
    pub magnitude: f32,
    pub unit: DurationUnit,
}

impl DurationSpec {
    pub const ZERO: DurationSpec = DurationSpec {
        magnitude: 0.0,
        unit: DurationUnit::Seconds,
    };

    pub fn seconds(magnitude: f32) -> Self {
        Self { magnitude, unit: DurationUnit::Seconds }
    }

    pub fn millis(magnitude: f32) -> Self {
        Self { magnitude, unit: DurationUnit::Millis }
    }

    pub fn as_secs(&self) -> f32 {
        match self.unit {
            DurationUnit::Seconds => self.magnitude,
            DurationUnit::Millis => self.magnitude / 1000.0,
        }
    }

    pub fn as_millis(&self) -> f64 {
        self.as_secs() as f64 * 1000.0
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude == 0.0
    }
}

impl Default for DurationSpec {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            DurationUnit::Seconds => "s",
            DurationUnit::Millis => "ms",
        };
        write!(f, "{}{}", self.magnitude, unit)
    }
}

impl FromStr for DurationSpec {
    type Err = EngineError;

    /// Parses `"5"`, `"5s"`, `"250ms"`, `"0.5s"`. The unit is whatever follows the
    /// last digit; an empty unit means seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let malformed = || EngineError::MalformedDuration(s.to_string());

        let split = trimmed
            .char_indices()
            .filter(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(idx, c)| idx + c.len_utf8())
            .ok_or_else(malformed)?;
        let (number, unit) = trimmed.split_at(split);

        let magnitude: f32 = number.parse().map_err(|_| malformed())?;
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(malformed());
        }

        let unit = match unit.trim() {
            "" | "s" => DurationUnit::Seconds,
            "ms" => DurationUnit::Millis,
            _ => return Err(malformed()),
        };
        Ok(Self { magnitude, unit })
    }
}

/// Payload of a channel's transition-completion event.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformEnd {
    pub prev_value: i32,
    pub next_value: i32,
    pub full_prev_value: String,
    pub full_next_value: String,
}

fn px(value: f32) -> String {
    format!("{}px", value)
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: f32,
    to: f32,
    start_ms: f64,
    end_ms: f64,
    easing: Easing,
}

/// One animatable transform property (translateX or translateY).
///
/// Setting a value is two-step: `set_value` records it, `apply_transform` commits it
/// together with the current duration and easing. A committed change with a non-zero
/// duration starts a transition from the currently rendered value; the channel reports
/// its end through `finish_transition`.
#[derive(Debug, Clone)]
pub struct TransformChannel {
    property: TransformProperty,
    value: f32,
    prev_value: f32,
    duration: DurationSpec,
    easing: Easing,
    committed: f32,
    transition: Option<Transition>,
}

impl TransformChannel {
    pub fn new(property: TransformProperty) -> Self {
        Self {
            property,
            value: 0.0,
            prev_value: 0.0,
            duration: DurationSpec::ZERO,
            easing: Easing::Linear,
            committed: 0.0,
            transition: None,
        }
    }

    pub fn for_axis(axis: Axis) -> Self {
        Self::new(TransformProperty::for_axis(axis))
    }

    pub fn property(&self) -> TransformProperty {
        self.property
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn prev_value(&self) -> f32 {
        self.prev_value
    }

    /// Record a new value. No visual effect until `apply_transform`.
    pub fn set_value(&mut self, value: f32) {
        self.prev_value = self.value;
        self.value = value;
    }

    /// Record a new value reached from `from` rather than from the last target.
    /// Used for moves that start mid-transition, so `speed` reflects the distance
    /// actually travelled.
    pub fn set_value_from(&mut self, from: f32, value: f32) {
        self.prev_value = from;
        self.value = value;
    }

    pub fn duration(&self) -> DurationSpec {
        self.duration
    }

    pub fn set_duration(&mut self, duration: DurationSpec) {
        self.duration = duration;
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn set_easing(&mut self, easing: Easing) {
        self.easing = easing;
    }

    /// Pixels per second implied by the last value change and the current duration.
    pub fn speed(&self) -> f32 {
        let secs = self.duration.as_secs();
        if secs == 0.0 {
            return 0.0;
        }
        (self.value - self.prev_value) / secs
    }

    /// Commit value, duration and easing.
    /// An unchanged value leaves a running transition alone.
    pub fn apply_transform(&mut self, now_ms: f64) {
        if self.value == self.committed {
            return;
        }

        let from = self.rendered_value(now_ms);
        self.committed = self.value;

        let duration_ms = self.duration.as_millis();
        self.transition = if duration_ms <= 0.0 || from == self.value {
            None
        } else {
            Some(Transition {
                from,
                to: self.value,
                start_ms: now_ms,
                end_ms: now_ms + duration_ms,
                easing: self.easing,
            })
        };
    }

    /// The value currently on screen, mid-transition included.
    pub fn rendered_value(&self, now_ms: f64) -> f32 {
        match self.transition {
            Some(tr) => {
                let span = tr.end_ms - tr.start_ms;
                let progress = ((now_ms - tr.start_ms) / span).clamp(0.0, 1.0) as f32;
                ease(tr.from, tr.to, progress, tr.easing)
            }
            None => self.committed,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// When the running transition ends, if any.
    pub fn transition_end_ms(&self) -> Option<f64> {
        self.transition.map(|tr| tr.end_ms)
    }

    /// Complete the running transition if it is due at `now_ms`.
    pub fn finish_transition(&mut self, now_ms: f64) -> Option<TransformEnd> {
        let tr = self.transition?;
        if tr.end_ms > now_ms {
            return None;
        }
        self.transition = None;
        Some(TransformEnd {
            prev_value: self.prev_value.trunc() as i32,
            next_value: self.value.trunc() as i32,
            full_prev_value: px(self.prev_value),
            full_next_value: px(self.value),
        })
    }

    /// The committed transform, e.g. `translateX(50px)`.
    pub fn transform_css(&self) -> String {
        format!("{}({})", self.property, px(self.committed))
    }

    /// The transition declaration, e.g. `transform 5s linear`.
    pub fn transition_css(&self) -> String {
        format!("transform {} {}", self.duration, self.easing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving(duration: DurationSpec, to: f32) -> TransformChannel {
        let mut ch = TransformChannel::for_axis(Axis::X);
        ch.set_duration(duration);
        ch.set_value(to);
        ch.apply_transform(0.0);
        ch
    }

    #[test]
    fn parses_durations() {
        assert_eq!("5".parse::<DurationSpec>().unwrap(), DurationSpec::seconds(5.0));
        assert_eq!("5s".parse::<DurationSpec>().unwrap(), DurationSpec::seconds(5.0));
        assert_eq!("250ms".parse::<DurationSpec>().unwrap(), DurationSpec::millis(250.0));
        assert_eq!("0.5s".parse::<DurationSpec>().unwrap(), DurationSpec::seconds(0.5));
    }

    #[test]
    fn rejects_malformed_durations() {
        for bad in ["", "fast", "5min", "-3s", "ms"] {
            assert!(bad.parse::<DurationSpec>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn speed_from_seconds_and_millis() {
        let ch = moving(DurationSpec::seconds(2.0), 100.0);
        assert!((ch.speed() - 50.0).abs() < 1e-4);

        let ch = moving(DurationSpec::millis(500.0), -100.0);
        assert!((ch.speed() + 200.0).abs() < 1e-4);
    }

    #[test]
    fn zero_duration_means_zero_speed_and_jump() {
        let mut ch = moving(DurationSpec::ZERO, 80.0);
        assert_eq!(ch.speed(), 0.0);
        assert!(!ch.is_transitioning());
        assert_eq!(ch.rendered_value(0.0), 80.0);
        assert!(ch.finish_transition(1.0).is_none());
    }

    #[test]
    fn transition_interpolates_then_finishes() {
        let mut ch = moving(DurationSpec::seconds(1.0), 100.0);
        assert!((ch.rendered_value(500.0) - 50.0).abs() < 1e-3);
        assert!(ch.finish_transition(999.0).is_none());

        let end = ch.finish_transition(1000.0).unwrap();
        assert_eq!(end.prev_value, 0);
        assert_eq!(end.next_value, 100);
        assert_eq!(end.full_next_value, "100px");
        assert_eq!(ch.rendered_value(2000.0), 100.0);
    }

    #[test]
    fn retarget_starts_from_rendered_value() {
        let mut ch = moving(DurationSpec::seconds(1.0), 100.0);
        ch.set_value(0.0);
        ch.apply_transform(500.0);
        assert!((ch.rendered_value(500.0) - 50.0).abs() < 1e-3);
        assert_eq!(ch.transition_end_ms(), Some(1500.0));
    }

    #[test]
    fn unchanged_value_keeps_running_transition() {
        let mut ch = moving(DurationSpec::seconds(1.0), 100.0);
        ch.set_duration(DurationSpec::seconds(9.0));
        ch.set_value(100.0);
        ch.apply_transform(200.0);
        assert_eq!(ch.transition_end_ms(), Some(1000.0));
    }

    #[test]
    fn css_strings() {
        let ch = moving(DurationSpec::millis(250.0), 12.0);
        assert_eq!(ch.transform_css(), "translateX(12px)");
        assert_eq!(ch.transition_css(), "transform 250ms linear");
    }
}

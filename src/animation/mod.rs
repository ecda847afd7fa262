//! Declarative property transitions.
//!
//! A transition asks the backend to move one node property to a target
//! value over time. The scene graph only stages and activates them; the
//! visual progression belongs to the backend's native timing.

mod crossfade;
mod timing;

pub use crossfade::CrossFade;
pub use timing::TimingFunction;

use crate::dirty::Dirty;
use crate::geometry::{Point, Vec2};

/// A property that can be transitioned.
///
/// The declaration order is the activation priority when several
/// transitions are staged on the same node in the same frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransitionProperty {
    Position,
    Scale,
    Rotation,
    Opacity,
}

impl TransitionProperty {
    pub const ALL: [TransitionProperty; 4] = [
        TransitionProperty::Position,
        TransitionProperty::Scale,
        TransitionProperty::Rotation,
        TransitionProperty::Opacity,
    ];

    /// Backend attribute that carries this property.
    pub fn attribute(self) -> VisualAttribute {
        match self {
            TransitionProperty::Opacity => VisualAttribute::Opacity,
            _ => VisualAttribute::Transform,
        }
    }

    pub fn dirty_bit(self) -> Dirty {
        match self {
            TransitionProperty::Position => Dirty::POSITION,
            TransitionProperty::Scale => Dirty::SCALE,
            TransitionProperty::Rotation => Dirty::ROTATION,
            TransitionProperty::Opacity => Dirty::ALPHA,
        }
    }
}

/// The visual attribute a backend transitions natively. Position, scale
/// and rotation share one combined transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VisualAttribute {
    Transform,
    Opacity,
}

/// Target value of a transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionValue {
    Position(Point),
    Scale(Vec2),
    Rotation(f32),
    Opacity(f32),
}

impl TransitionValue {
    pub fn property(&self) -> TransitionProperty {
        match self {
            TransitionValue::Position(_) => TransitionProperty::Position,
            TransitionValue::Scale(_) => TransitionProperty::Scale,
            TransitionValue::Rotation(_) => TransitionProperty::Rotation,
            TransitionValue::Opacity(_) => TransitionProperty::Opacity,
        }
    }
}

/// How a property should progress toward its target.
#[derive(Clone, Debug)]
pub struct Transition {
    /// Duration of the animation in milliseconds
    pub duration_ms: f32,
    /// Timing function controlling the animation curve
    pub timing: TimingFunction,
    /// Delay before animation starts in milliseconds
    pub delay_ms: f32,
}

impl Transition {
    pub fn new(duration_ms: f32, timing: TimingFunction) -> Self {
        Self {
            duration_ms,
            timing,
            delay_ms: 0.0,
        }
    }

    pub fn delay(mut self, delay_ms: f32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn duration(mut self, duration_ms: f32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn timing(mut self, timing: TimingFunction) -> Self {
        self.timing = timing;
        self
    }

    /// Total time until the transition settles.
    pub fn total_ms(&self) -> f32 {
        self.delay_ms + self.duration_ms
    }

    /// Eased progress after `elapsed_ms`, clamped to the transition span.
    pub fn progress(&self, elapsed_ms: f32) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        let t = ((elapsed_ms - self.delay_ms) / self.duration_ms).clamp(0.0, 1.0);
        self.timing.evaluate(t)
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new(1000.0, TimingFunction::EaseInOut)
    }
}

/// A request to transition one or more properties of a node.
#[derive(Clone, Debug)]
pub enum Animation {
    To {
        target: TransitionValue,
        transition: Transition,
    },
    /// Several animations running together; stops when the last one does.
    Spawn(Vec<Animation>),
}

impl Animation {
    pub fn move_to(position: impl Into<Point>, transition: Transition) -> Self {
        Animation::To {
            target: TransitionValue::Position(position.into()),
            transition,
        }
    }

    pub fn scale_to(scale: impl Into<Vec2>, transition: Transition) -> Self {
        Animation::To {
            target: TransitionValue::Scale(scale.into()),
            transition,
        }
    }

    pub fn rotate_to(degrees: f32, transition: Transition) -> Self {
        Animation::To {
            target: TransitionValue::Rotation(degrees),
            transition,
        }
    }

    pub fn fade_to(opacity: f32, transition: Transition) -> Self {
        Animation::To {
            target: TransitionValue::Opacity(opacity),
            transition,
        }
    }

    pub fn spawn(animations: impl IntoIterator<Item = Animation>) -> Self {
        Animation::Spawn(animations.into_iter().collect())
    }

    /// Flattened per-property requests. A later request for the same
    /// property replaces an earlier one.
    pub fn targets(&self) -> Vec<(TransitionValue, Transition)> {
        let mut out: Vec<(TransitionValue, Transition)> = Vec::new();
        self.collect_targets(&mut out);
        out
    }

    fn collect_targets(&self, out: &mut Vec<(TransitionValue, Transition)>) {
        match self {
            Animation::To { target, transition } => {
                out.retain(|(t, _)| t.property() != target.property());
                out.push((*target, transition.clone()));
            }
            Animation::Spawn(animations) => {
                for animation in animations {
                    animation.collect_targets(out);
                }
            }
        }
    }
}

//! Per-node state stored in the scene graph arena.

use std::collections::{BTreeMap, BTreeSet};

use crate::animation::{Transition, TransitionProperty, TransitionValue};
use crate::backend::{DrawableUnit, RendererKind};
use crate::dirty::{AutoResize, Dirty};
use crate::event::{EventHandler, EventType, ListenerId};
use crate::geometry::{Frame, Point, Size, Vec2};
use crate::transform::{self, Placement};
use crate::tree::NodeId;

/// Identity of the director a subtree is mounted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirectorId(pub(crate) u32);

/// Last values handed to a backend, compared before starting transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawnState {
    pub position: Option<Point>,
    pub scale: Option<Vec2>,
    pub rotation: Option<f32>,
    pub opacity: Option<f32>,
}

/// Listener bookkeeping for one event type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerSlot {
    /// Whether the dispatcher currently knows about this node for the type
    pub registered: bool,
    pub count: usize,
}

pub(crate) struct Listener {
    pub id: ListenerId,
    pub event_type: EventType,
    pub handler: EventHandler,
}

#[derive(Clone, Debug)]
pub(crate) struct PendingTransition {
    pub value: TransitionValue,
    pub transition: Transition,
    /// Already checked against the drawn state
    pub checked: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct ActiveTransition {
    pub value: TransitionValue,
    pub transition: Transition,
    /// Drawn at least once since activation
    pub drawn: bool,
}

/// Staged, running and cancelled transitions, keyed in priority order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Transitions {
    pub pending: BTreeMap<TransitionProperty, PendingTransition>,
    pub active: BTreeMap<TransitionProperty, ActiveTransition>,
    pub clearing: BTreeSet<TransitionProperty>,
}

impl Transitions {
    pub fn is_staged(&self) -> bool {
        !self.pending.is_empty() || !self.clearing.is_empty()
    }
}

pub struct Node {
    pub(crate) position: Point,
    pub(crate) scale: Vec2,
    pub(crate) rotation: f32,
    pub(crate) anchor_point: Vec2,
    pub(crate) size: Size,
    pub(crate) quality: f32,
    pub(crate) relative_quality: f32,
    pub(crate) opacity: f32,
    pub(crate) hidden: bool,
    pub(crate) auto_hide: bool,
    pub(crate) auto_resize: AutoResize,

    pub(crate) renderer: RendererKind,
    pub(crate) supported_renderers: Vec<RendererKind>,
    pub(crate) mask: Option<NodeId>,
    /// Number of nodes using this one as their mask
    pub(crate) mask_users: usize,
    pub(crate) unit: Option<DrawableUnit>,

    pub(crate) dirty: Dirty,
    pub(crate) drawn: DrawnState,

    pub(crate) attached: bool,
    pub(crate) director: Option<DirectorId>,
    pub(crate) scene: Option<NodeId>,
    pub(crate) listener_slots: BTreeMap<EventType, ListenerSlot>,
    pub(crate) listeners: Vec<Listener>,

    pub(crate) transitions: Transitions,
}

impl Node {
    pub(crate) fn new(supported_renderers: Vec<RendererKind>) -> Self {
        let supported_renderers = if supported_renderers.is_empty() {
            vec![RendererKind::Element, RendererKind::Raster]
        } else {
            supported_renderers
        };
        Self {
            position: Point::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            anchor_point: Vec2::CENTER,
            size: Size::ZERO,
            quality: 1.0,
            relative_quality: 1.0,
            opacity: 1.0,
            hidden: false,
            auto_hide: false,
            auto_resize: AutoResize::NONE,
            renderer: supported_renderers[0],
            supported_renderers,
            mask: None,
            mask_users: 0,
            unit: None,
            dirty: Dirty::LAYOUT,
            drawn: DrawnState::default(),
            attached: false,
            director: None,
            scene: None,
            listener_slots: BTreeMap::new(),
            listeners: Vec::new(),
            transitions: Transitions::default(),
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Degrees in [0, 360).
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn anchor_point(&self) -> Vec2 {
        self.anchor_point
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn relative_quality(&self) -> f32 {
        self.relative_quality
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn auto_hide(&self) -> bool {
        self.auto_hide
    }

    pub fn auto_resize(&self) -> AutoResize {
        self.auto_resize
    }

    pub fn renderer(&self) -> RendererKind {
        self.renderer
    }

    pub fn supports(&self, renderer: RendererKind) -> bool {
        self.supported_renderers.contains(&renderer)
    }

    pub fn mask(&self) -> Option<NodeId> {
        self.mask
    }

    pub fn is_mask(&self) -> bool {
        self.mask_users > 0
    }

    pub fn unit(&self) -> Option<&DrawableUnit> {
        self.unit.as_ref()
    }

    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    pub fn drawn(&self) -> &DrawnState {
        &self.drawn
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn director(&self) -> Option<DirectorId> {
        self.director
    }

    pub fn scene(&self) -> Option<NodeId> {
        self.scene
    }

    pub fn listener_slot(&self, event_type: EventType) -> ListenerSlot {
        self.listener_slots
            .get(&event_type)
            .copied()
            .unwrap_or_default()
    }

    pub fn placement(&self) -> Placement {
        Placement::new(self.position, self.scale, self.rotation)
    }

    /// Local rectangle derived from size and anchor point.
    pub fn frame(&self) -> Frame {
        transform::frame(self.size, self.anchor_point)
    }

    pub fn has_pending_transition(&self, property: TransitionProperty) -> bool {
        self.transitions.pending.contains_key(&property)
    }

    pub fn has_active_transition(&self, property: TransitionProperty) -> bool {
        self.transitions.active.contains_key(&property)
    }

    /// Active and already drawn once since activation.
    pub fn transition_drawn(&self, property: TransitionProperty) -> bool {
        self.transitions
            .active
            .get(&property)
            .is_some_and(|t| t.drawn)
    }

    pub fn active_transition_target(&self, property: TransitionProperty) -> Option<TransitionValue> {
        self.transitions.active.get(&property).map(|t| t.value)
    }

    pub fn active_transition(&self, property: TransitionProperty) -> Option<&Transition> {
        self.transitions.active.get(&property).map(|t| &t.transition)
    }

    /// Whether the current value of `property` differs from what was
    /// last drawn. A node never drawn always differs.
    pub(crate) fn differs_from_drawn(&self, property: TransitionProperty) -> bool {
        match property {
            TransitionProperty::Position => self.drawn.position != Some(self.position),
            TransitionProperty::Scale => self.drawn.scale != Some(self.scale),
            TransitionProperty::Rotation => self.drawn.rotation != Some(self.rotation),
            TransitionProperty::Opacity => self.drawn.opacity != Some(self.opacity),
        }
    }

    pub(crate) fn snapshot_drawn(&mut self) {
        self.drawn = DrawnState {
            position: Some(self.position),
            scale: Some(self.scale),
            rotation: Some(self.rotation),
            opacity: Some(self.opacity),
        };
    }
}

/// Bring an angle into [0, 360).
pub(crate) fn normalize_rotation(degrees: f32) -> f32 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

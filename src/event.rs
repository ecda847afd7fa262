//! Pointer events and the dispatcher registry.
//!
//! Nodes do not register with the dispatcher directly. The scene graph
//! ref-counts listeners per event type and registers a node only while it
//! is attached and has at least one listener of that type.

use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::Point;
use crate::tree::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    MouseDown,
    MouseMove,
    MouseUp,
    TouchStart,
    TouchMove,
    TouchEnd,
}

impl EventType {
    pub fn is_mouse(self) -> bool {
        matches!(
            self,
            EventType::MouseDown | EventType::MouseMove | EventType::MouseUp
        )
    }
}

/// A pointer event travelling through the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pub event_type: EventType,
    /// Position in screen space
    pub screen_position: Point,
    /// Position in the receiving node's local space, set by hit testing
    pub position: Point,
    /// Node currently receiving the event
    pub target: Option<NodeId>,
}

impl PointerEvent {
    pub fn new(event_type: EventType, screen_position: impl Into<Point>) -> Self {
        let screen_position = screen_position.into();
        Self {
            event_type,
            screen_position,
            position: screen_position,
            target: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventResponse {
    Ignored,
    Handled,
}

/// Handle returned when a listener is added, used to remove it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

pub type EventHandler = Box<dyn FnMut(&PointerEvent) -> EventResponse>;

/// Which nodes currently want which event types.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    registrations: BTreeMap<EventType, BTreeSet<NodeId>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: NodeId, event_type: EventType) {
        log::trace!("register {:?} for {:?}", node, event_type);
        self.registrations.entry(event_type).or_default().insert(node);
    }

    pub fn release(&mut self, node: NodeId, event_type: EventType) {
        log::trace!("release {:?} for {:?}", node, event_type);
        if let Some(nodes) = self.registrations.get_mut(&event_type) {
            nodes.remove(&node);
            if nodes.is_empty() {
                self.registrations.remove(&event_type);
            }
        }
    }

    pub fn is_registered(&self, node: NodeId, event_type: EventType) -> bool {
        self.registrations
            .get(&event_type)
            .is_some_and(|nodes| nodes.contains(&node))
    }

    pub fn nodes_for(&self, event_type: EventType) -> Vec<NodeId> {
        self.registrations
            .get(&event_type)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Total number of (node, event type) registrations.
    pub fn registration_count(&self) -> usize {
        self.registrations.values().map(BTreeSet::len).sum()
    }
}

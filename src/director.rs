//! Frame driver: owns the scene graph and backends, drains the dirty
//! registry once per tick, runs animations and dispatches input.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::animation::{Animation, CrossFade, Transition, TransitionProperty};
use crate::backend::Backends;
use crate::dirty::{ELEMENT_PASS, RASTER_PASS};
use crate::error::{Result, SceneError};
use crate::event::{EventResponse, PointerEvent};
use crate::node::DirectorId;
use crate::scene::{SceneConfig, SceneGraph};
use crate::tree::NodeId;

static NEXT_DIRECTOR: AtomicU32 = AtomicU32::new(1);

#[derive(Clone, Debug)]
pub struct DirectorConfig {
    /// Viewport width in screen units
    pub width: f32,
    /// Viewport height in screen units
    pub height: f32,
    /// Touch devices ignore mouse listeners
    pub supports_touch: bool,
    /// Upper bound on registry drains per pass in one tick
    pub max_drain_rounds: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
            supports_touch: false,
            max_drain_rounds: 16,
        }
    }
}

impl DirectorConfig {
    pub fn width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn supports_touch(mut self, supports_touch: bool) -> Self {
        self.supports_touch = supports_touch;
        self
    }

    pub fn max_drain_rounds(mut self, rounds: usize) -> Self {
        self.max_drain_rounds = rounds.max(1);
        self
    }
}

/// Handle to an animation started with [`Director::run_action`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId(u64);

/// Called once when an action stops, with the scene to react on.
pub type StopListener = Box<dyn FnOnce(&mut SceneGraph)>;

struct RunningAction {
    remaining: BTreeSet<(NodeId, TransitionProperty)>,
    listeners: Vec<StopListener>,
}

pub struct Director {
    id: DirectorId,
    config: DirectorConfig,
    scene: SceneGraph,
    backends: Backends,
    current_scene: Option<NodeId>,
    actions: HashMap<ActionId, RunningAction>,
    /// Which action currently owns each (node, property) transition
    owners: HashMap<(NodeId, TransitionProperty), ActionId>,
    next_action: u64,
}

impl Director {
    pub fn new(config: DirectorConfig) -> Self {
        Self::with_backends(config, Backends::default())
    }

    pub fn with_backends(config: DirectorConfig, backends: Backends) -> Self {
        let scene = SceneGraph::with_config(SceneConfig::default().supports_touch(config.supports_touch));
        Self {
            id: DirectorId(NEXT_DIRECTOR.fetch_add(1, Ordering::Relaxed)),
            config,
            scene,
            backends,
            current_scene: None,
            actions: HashMap::new(),
            owners: HashMap::new(),
            next_action: 0,
        }
    }

    pub fn id(&self) -> DirectorId {
        self.id
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn backends_mut(&mut self) -> &mut Backends {
        &mut self.backends
    }

    /// The displayed scene root. A root that was destroyed or adopted by
    /// another node since it was mounted no longer counts.
    pub fn current_scene(&self) -> Option<NodeId> {
        self.current_scene.filter(|&root| {
            self.scene.parent(root).is_none()
                && self
                    .scene
                    .node(root)
                    .is_some_and(|n| n.director() == Some(self.id) && n.scene() == Some(root))
        })
    }

    /// Run one frame. `elapsed_ms` is the time since the previous tick and
    /// drives the backends' native transitions.
    pub fn tick(&mut self, elapsed_ms: f32) {
        self.scene.flush_released_units(&mut self.backends);
        self.backends.advance(elapsed_ms);
        self.settle_finished();

        self.drain(ELEMENT_PASS);
        self.drain(RASTER_PASS);
        self.scene.registry_mut().promote_next_frame();

        self.scene.flush_released_units(&mut self.backends);
        self.settle_finished();
    }

    /// Update every node queued for `pass`. Detached nodes are skipped and
    /// keep their dirty bits until they are attached again. Raster
    /// surfaces repaint in paint order.
    fn drain(&mut self, pass: u8) {
        for _ in 0..self.config.max_drain_rounds {
            let mut nodes = self.scene.registry_mut().take(pass);
            if nodes.is_empty() {
                return;
            }
            if pass == RASTER_PASS {
                nodes.sort_by(|a, b| self.scene.compare_nodes(*a, *b));
            }
            for id in nodes {
                if self.scene.node(id).is_some_and(|n| n.is_attached()) {
                    self.scene.update(id, pass, &mut self.backends);
                }
            }
        }
        log::warn!(
            "pass {} still has work after {} rounds",
            pass,
            self.config.max_drain_rounds
        );
    }

    fn settle_finished(&mut self) {
        let mut finished = Vec::new();
        for (id, attribute) in self.backends.finished_transitions() {
            let Some(node) = self.scene.node(id) else {
                continue;
            };
            finished.extend(
                TransitionProperty::ALL
                    .into_iter()
                    .filter(|p| p.attribute() == attribute && node.has_active_transition(*p))
                    .map(|p| (id, p)),
            );
        }
        for (id, property) in finished {
            self.transition_finished(id, property);
        }
        for (id, property) in self.scene.take_completed_transitions() {
            self.release_claim(id, property);
        }
    }

    /// Report that the transition of `property` on `id` reached its end.
    /// Backends report through [`crate::backend::RenderBackend::finished_transitions`];
    /// this is the entry point for completions observed elsewhere.
    pub fn transition_finished(&mut self, id: NodeId, property: TransitionProperty) {
        if self.scene.retire_transition(id, property) {
            self.release_claim(id, property);
        }
    }

    /// Start an animation on `node`. Each property it touches becomes
    /// owned by this action, replacing whichever action owned it before.
    pub fn run_action(&mut self, node: NodeId, animation: &Animation) -> ActionId {
        self.next_action += 1;
        let action = ActionId(self.next_action);
        if !self.scene.contains(node) {
            log::warn!("run_action on stale node {:?}", node);
            return action;
        }

        let mut remaining = BTreeSet::new();
        for (value, transition) in animation.targets() {
            let property = value.property();
            self.scene.add_transition(node, value, transition);
            if let Some(previous) = self.owners.insert((node, property), action) {
                self.drop_claim(previous, node, property);
            }
            remaining.insert((node, property));
        }
        if !remaining.is_empty() {
            self.actions.insert(
                action,
                RunningAction {
                    remaining,
                    listeners: Vec::new(),
                },
            );
        }
        action
    }

    pub fn is_action_running(&self, action: ActionId) -> bool {
        self.actions.contains_key(&action)
    }

    /// Call `listener` when `action` stops. Runs it right away if the
    /// action already stopped.
    pub fn on_action_stop<F>(&mut self, action: ActionId, listener: F)
    where
        F: FnOnce(&mut SceneGraph) + 'static,
    {
        match self.actions.get_mut(&action) {
            Some(running) => running.listeners.push(Box::new(listener)),
            None => listener(&mut self.scene),
        }
    }

    /// Cancel every transition of `action` and notify its listeners.
    pub fn stop_action(&mut self, action: ActionId) {
        let Some(running) = self.actions.remove(&action) else {
            return;
        };
        for (node, property) in &running.remaining {
            self.scene.clear_transition(*node, *property);
            self.owners.remove(&(*node, *property));
        }
        for listener in running.listeners {
            listener(&mut self.scene);
        }
    }

    fn release_claim(&mut self, node: NodeId, property: TransitionProperty) {
        if let Some(action) = self.owners.remove(&(node, property)) {
            self.drop_claim(action, node, property);
        }
    }

    fn drop_claim(&mut self, action: ActionId, node: NodeId, property: TransitionProperty) {
        let done = match self.actions.get_mut(&action) {
            Some(running) => {
                running.remaining.remove(&(node, property));
                running.remaining.is_empty()
            }
            None => false,
        };
        if !done {
            return;
        }
        if let Some(running) = self.actions.remove(&action) {
            for listener in running.listeners {
                listener(&mut self.scene);
            }
        }
    }

    /// Deliver a pointer event to the topmost visible registered node
    /// under it, falling through while listeners ignore it.
    pub fn dispatch(&mut self, event: PointerEvent) -> EventResponse {
        let p = event.screen_position;
        if p.x < 0.0 || p.y < 0.0 || p.x > self.config.width || p.y > self.config.height {
            return EventResponse::Ignored;
        }

        let mut candidates = self.scene.dispatcher().nodes_for(event.event_type);
        candidates.sort_by(|a, b| self.scene.compare_nodes(*b, *a));
        for id in candidates {
            if !self.scene.is_visible(id) {
                continue;
            }
            let mut event = event.clone();
            event.target = Some(id);
            if self.scene.hit_test(id, &mut event)
                && self.scene.deliver(id, &event) == EventResponse::Handled
            {
                return EventResponse::Handled;
            }
        }
        EventResponse::Ignored
    }

    /// Make `root` the displayed scene. With a transition the previous
    /// scene cross-fades out and is unmounted when the fade completes.
    pub fn replace_scene(&mut self, root: NodeId, transition: Option<Transition>) -> Result<()> {
        if !self.scene.contains(root) {
            return Err(SceneError::StaleNode(root));
        }
        let outgoing = self.current_scene();
        if outgoing == Some(root) {
            return Ok(());
        }
        self.scene.attach_root(root, self.id)?;
        self.current_scene = Some(root);
        log::info!("replacing scene {:?} with {:?}", outgoing, root);

        match (outgoing, transition) {
            (Some(old), None) => self.scene.detach_root(old)?,
            (None, None) => {}
            (outgoing, Some(transition)) => {
                let fade = CrossFade::new(outgoing, root, transition);
                if let Some(old) = outgoing {
                    fade.on_finish(move |scene| {
                        if let Err(err) = scene.detach_root(old) {
                            log::error!("failed to unmount {:?}: {}", old, err);
                        }
                    });
                }
                fade.start(self);
            }
        }
        Ok(())
    }
}

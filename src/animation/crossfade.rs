//! Cross-fade between two nodes.

use std::cell::RefCell;
use std::rc::Rc;

use crate::director::{Director, StopListener};
use crate::scene::SceneGraph;
use crate::tree::NodeId;

use super::{Animation, Transition};

#[derive(Default)]
struct FadeState {
    finished: bool,
    listeners: Vec<StopListener>,
}

/// Fades `incoming` in while `outgoing` fades out, and signals completion
/// once the incoming fade ends.
///
/// The orchestrator only listens to the stop notifications of the two
/// underlying opacity animations. The outgoing node gets its opacity back
/// to 1 after fading so it can be shown again later.
#[derive(Clone)]
pub struct CrossFade {
    outgoing: Option<NodeId>,
    incoming: NodeId,
    transition: Transition,
    state: Rc<RefCell<FadeState>>,
}

impl CrossFade {
    pub fn new(outgoing: Option<NodeId>, incoming: NodeId, transition: Transition) -> Self {
        Self {
            outgoing,
            incoming,
            transition,
            state: Rc::new(RefCell::new(FadeState::default())),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// Register a completion listener. Listeners added after completion
    /// are never called.
    pub fn on_finish<F>(&self, listener: F)
    where
        F: FnOnce(&mut SceneGraph) + 'static,
    {
        let mut state = self.state.borrow_mut();
        if state.finished {
            log::debug!("cross-fade to {:?} already finished", self.incoming);
            return;
        }
        state.listeners.push(Box::new(listener));
    }

    pub fn start(&self, director: &mut Director) {
        director.scene_mut().set_opacity(self.incoming, 0.0);

        if let Some(outgoing) = self.outgoing {
            let hide = director.run_action(
                outgoing,
                &Animation::fade_to(0.0, self.transition.clone()),
            );
            director.on_action_stop(hide, move |scene| scene.set_opacity(outgoing, 1.0));
        }

        let show = director.run_action(
            self.incoming,
            &Animation::fade_to(1.0, self.transition.clone()),
        );
        let state = Rc::clone(&self.state);
        director.on_action_stop(show, move |scene| {
            let listeners = {
                let mut state = state.borrow_mut();
                state.finished = true;
                std::mem::take(&mut state.listeners)
            };
            for listener in listeners {
                listener(scene);
            }
        });
    }
}

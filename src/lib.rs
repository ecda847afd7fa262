pub mod animation;
pub mod backend;
pub mod dirty;
pub mod director;
pub mod error;
pub mod event;
pub mod geometry;
pub mod node;
pub mod scene;
pub mod transform;

// Exposed for backends that keep their own per-node maps
pub mod tree;

pub use error::{Result, SceneError};

pub mod prelude {
    pub use crate::animation::{
        Animation, CrossFade, TimingFunction, Transition, TransitionProperty, TransitionValue,
    };
    pub use crate::backend::{Backends, RenderBackend, RendererKind};
    pub use crate::dirty::{AutoResize, Dirty};
    pub use crate::director::{ActionId, Director, DirectorConfig};
    pub use crate::event::{EventResponse, EventType, PointerEvent};
    pub use crate::geometry::{Frame, Point, Size, Vec2};
    pub use crate::scene::{Property, SceneConfig, SceneGraph};
    pub use crate::transform::{Placement, Transform};
    pub use crate::tree::NodeId;
    pub use crate::{Result, SceneError};
}

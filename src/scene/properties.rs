use std::str::FromStr;

use crate::animation::TransitionProperty;
use crate::backend::RendererKind;
use crate::dirty::{AutoResize, Dirty, ELEMENT_PASS};
use crate::error::{Result, SceneError};
use crate::geometry::{pair_from_args, scalar_from_args, Point, Size, Vec2};
use crate::node::normalize_rotation;
use crate::transform::bounding_box;
use crate::tree::NodeId;

use super::SceneGraph;

/// Node properties settable by name with an argument list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Property {
    Position,
    Scale,
    Rotation,
    Opacity,
    Size,
    AnchorPoint,
    Quality,
    Hidden,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::Position => "position",
            Property::Scale => "scale",
            Property::Rotation => "rotation",
            Property::Opacity => "opacity",
            Property::Size => "size",
            Property::AnchorPoint => "anchor_point",
            Property::Quality => "quality",
            Property::Hidden => "hidden",
        }
    }
}

impl FromStr for Property {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "position" => Ok(Property::Position),
            "scale" => Ok(Property::Scale),
            "rotation" => Ok(Property::Rotation),
            "opacity" => Ok(Property::Opacity),
            "size" => Ok(Property::Size),
            "anchor_point" | "anchorPoint" => Ok(Property::AnchorPoint),
            "quality" => Ok(Property::Quality),
            "hidden" => Ok(Property::Hidden),
            other => Err(SceneError::UnknownProperty(other.to_string())),
        }
    }
}

impl SceneGraph {
    /// OR `value` into the node's dirty bits and queue it for the element
    /// pass. Anything containing LAYOUT cascades LAYOUT to the subtree.
    pub fn mark_dirty(&mut self, id: NodeId, value: Dirty) {
        self.mark_dirty_for(id, value, ELEMENT_PASS, false);
    }

    pub(crate) fn mark_dirty_for(&mut self, id: NodeId, value: Dirty, pass: u8, next_frame: bool) {
        if value.is_empty() {
            return;
        }
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.dirty |= value;
        self.registry.mark_dirty(id, pass, next_frame);

        if value.contains(Dirty::LAYOUT) {
            let children = self.tree.children(id).to_vec();
            for child in children {
                self.mark_dirty_for(child, Dirty::LAYOUT, ELEMENT_PASS, false);
            }
        }
    }

    /// Store a property and dirty it unless an active transition owns it.
    fn set_owned(
        &mut self,
        id: NodeId,
        op: &str,
        property: TransitionProperty,
        apply: impl FnOnce(&mut crate::node::Node),
    ) {
        let Some(node) = self.node_mut_or_warn(id, op) else {
            return;
        };
        apply(node);
        if !node.has_active_transition(property) {
            self.mark_dirty(id, property.dirty_bit());
        }
    }

    pub fn set_position(&mut self, id: NodeId, position: impl Into<Point>) {
        let position = position.into();
        self.set_owned(id, "set_position", TransitionProperty::Position, |n| {
            n.position = position
        });
    }

    /// Accepts a uniform factor, a tuple or an array.
    pub fn set_scale(&mut self, id: NodeId, scale: impl Into<Vec2>) {
        let scale = scale.into();
        self.set_owned(id, "set_scale", TransitionProperty::Scale, |n| n.scale = scale);
    }

    /// Degrees; stored normalized to [0, 360).
    pub fn set_rotation(&mut self, id: NodeId, degrees: f32) {
        let rotation = normalize_rotation(degrees);
        self.set_owned(id, "set_rotation", TransitionProperty::Rotation, |n| {
            n.rotation = rotation
        });
    }

    /// Setting 0 hides the node automatically; leaving 0 shows it again
    /// when the hide was automatic.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) {
        let Some(node) = self.node_mut_or_warn(id, "set_opacity") else {
            return;
        };
        node.opacity = opacity;
        let auto_hide = opacity == 0.0 && !node.hidden;
        let auto_show = opacity != 0.0 && node.hidden && node.auto_hide;
        let owned = node.has_active_transition(TransitionProperty::Opacity);

        if auto_hide {
            self.set_auto_hidden(id);
        } else if auto_show {
            self.set_hidden(id, false);
        }
        if !owned {
            self.mark_dirty(id, Dirty::ALPHA);
        }
    }

    /// Explicit visibility. Always clears the automatic-hide flag.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        let Some(node) = self.node_mut_or_warn(id, "set_hidden") else {
            return;
        };
        node.hidden = hidden;
        node.auto_hide = false;
        self.mark_dirty(id, Dirty::VISIBILITY);
    }

    pub(crate) fn set_auto_hidden(&mut self, id: NodeId) {
        self.set_hidden(id, true);
        if let Some(node) = self.tree.get_mut(id) {
            node.auto_hide = true;
        }
    }

    pub fn set_anchor_point(&mut self, id: NodeId, anchor: impl Into<Vec2>) {
        let anchor = anchor.into();
        let Some(node) = self.node_mut_or_warn(id, "set_anchor_point") else {
            return;
        };
        node.anchor_point = anchor;
        self.mark_dirty(id, Dirty::POSITION);
    }

    /// Resize the node. Children with an auto-resize policy follow: their
    /// flexible edges absorb the size delta while the others stay put.
    pub fn set_size(&mut self, id: NodeId, size: impl Into<Size>) {
        let size = size.into();
        let Some(node) = self.node_mut_or_warn(id, "set_size") else {
            return;
        };
        let old = node.size;
        let parent_anchor = node.anchor_point;

        let children = self.tree.children(id).to_vec();
        for child in children {
            let Some(c) = self.tree.get(child) else {
                continue;
            };
            let policy = c.auto_resize;
            if policy.is_empty() {
                continue;
            }
            let b = bounding_box(&c.placement(), &c.frame());
            let anchor = c.anchor_point;

            let (left, width) = resize_axis(
                b.left,
                b.right,
                parent_anchor.x,
                old.width,
                size.width,
                [
                    policy.contains(AutoResize::LEFT),
                    policy.contains(AutoResize::WIDTH),
                    policy.contains(AutoResize::RIGHT),
                ],
            );
            let (top, height) = resize_axis(
                b.top,
                b.bottom,
                parent_anchor.y,
                old.height,
                size.height,
                [
                    policy.contains(AutoResize::TOP),
                    policy.contains(AutoResize::HEIGHT),
                    policy.contains(AutoResize::BOTTOM),
                ],
            );

            self.set_size(child, (width, height));
            self.set_position(
                child,
                (
                    left + anchor.x * width - parent_anchor.x * size.width,
                    top + anchor.y * height - parent_anchor.y * size.height,
                ),
            );
        }

        if let Some(node) = self.tree.get_mut(id) {
            node.size = size;
        }
        self.mark_dirty(id, Dirty::SCALE);
    }

    pub fn set_quality(&mut self, id: NodeId, quality: f32) {
        let Some(node) = self.node_mut_or_warn(id, "set_quality") else {
            return;
        };
        if node.quality == quality {
            return;
        }
        node.quality = quality;
        self.mark_dirty(id, Dirty::SCALE);
        self.recompute_relative_quality(id);
    }

    /// Refresh the cached product of qualities along the ancestor chain
    /// for `id` and, if it changed, for its whole subtree.
    pub(crate) fn recompute_relative_quality(&mut self, id: NodeId) {
        let parent_quality = self
            .tree
            .parent(id)
            .and_then(|p| self.tree.get(p))
            .map(|p| p.relative_quality);
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        let relative = match parent_quality {
            Some(pq) => node.quality * pq,
            None => node.quality,
        };
        if relative == node.relative_quality {
            return;
        }
        node.relative_quality = relative;
        self.mark_dirty(id, Dirty::SCALE);
        let children = self.tree.children(id).to_vec();
        for child in children {
            self.recompute_relative_quality(child);
        }
    }

    /// Use `mask` to clip this node's content. The mask node is not
    /// adopted as a child.
    pub fn set_mask(&mut self, id: NodeId, mask: Option<NodeId>) {
        let Some(node) = self.node_mut_or_warn(id, "set_mask") else {
            return;
        };
        if node.mask == mask {
            return;
        }
        let old = std::mem::replace(&mut node.mask, mask);
        if let Some(old_node) = old.and_then(|m| self.tree.get_mut(m)) {
            old_node.mask_users = old_node.mask_users.saturating_sub(1);
        }
        if let Some(new_node) = mask.and_then(|m| self.tree.get_mut(m)) {
            new_node.mask_users += 1;
        }
        self.mark_dirty(id, Dirty::CONTENT);
    }

    pub fn set_auto_resize(&mut self, id: NodeId, policy: AutoResize) {
        let Some(node) = self.node_mut_or_warn(id, "set_auto_resize") else {
            return;
        };
        node.auto_resize = policy;
        self.mark_dirty(id, Dirty::ALL);
    }

    /// Switch backends for this node and its subtree. Kinds the node does
    /// not support are ignored.
    pub fn set_renderer(&mut self, id: NodeId, renderer: RendererKind) {
        let Some(node) = self.node_mut_or_warn(id, "set_renderer") else {
            return;
        };
        if node.renderer == renderer {
            return;
        }
        if !node.supports(renderer) {
            log::debug!("{:?} does not support {:?}", id, renderer);
            return;
        }
        node.renderer = renderer;
        self.mark_dirty(id, Dirty::LAYOUT);
        let children = self.tree.children(id).to_vec();
        for child in children {
            self.set_renderer(child, renderer);
        }
    }

    /// Set a property from an argument list, as scripted callers do.
    /// Pair properties take one value (applied to both axes) or two.
    pub fn set_property(&mut self, id: NodeId, property: Property, args: &[f32]) -> Result<()> {
        if !self.contains(id) {
            return Err(SceneError::StaleNode(id));
        }
        let name = property.name();
        match property {
            Property::Position => self.set_position(id, pair_from_args(name, args)?),
            Property::Scale => self.set_scale(id, pair_from_args(name, args)?),
            Property::Size => self.set_size(id, pair_from_args(name, args)?),
            Property::AnchorPoint => self.set_anchor_point(id, pair_from_args(name, args)?),
            Property::Rotation => self.set_rotation(id, scalar_from_args(name, args)?),
            Property::Opacity => self.set_opacity(id, scalar_from_args(name, args)?),
            Property::Quality => self.set_quality(id, scalar_from_args(name, args)?),
            Property::Hidden => self.set_hidden(id, scalar_from_args(name, args)? != 0.0),
        }
        Ok(())
    }
}

/// Redistribute one axis of a child's box when its parent's extent
/// changes from `old_len` to `new_len`.
///
/// The child box `[start, end]` splits the parent extent into a leading
/// gap, the child span and a trailing gap. Flexible parts (`flex` =
/// leading, span, trailing) share the delta; fixed parts keep their size.
/// Returns the new leading gap and span.
fn resize_axis(
    start: f32,
    end: f32,
    parent_anchor: f32,
    old_len: f32,
    new_len: f32,
    flex: [bool; 3],
) -> (f32, f32) {
    let mut lead = start + parent_anchor * old_len;
    let mut span = end - start;
    let trail = old_len - end - parent_anchor * old_len;

    let mut fixed = old_len;
    if flex[0] {
        fixed -= lead;
    }
    if flex[1] {
        fixed -= span;
    }
    if flex[2] {
        fixed -= trail;
    }
    if fixed != old_len {
        let scale = (new_len - fixed) / (old_len - fixed);
        if flex[0] {
            lead *= scale;
        }
        if flex[1] {
            span *= scale;
        }
    }
    (lead, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_axis_flexible_width() {
        // child spans [10, 30] of a 100 wide parent anchored at its left edge
        let (lead, span) = resize_axis(10.0, 30.0, 0.0, 100.0, 200.0, [false, true, false]);
        assert_eq!(lead, 10.0);
        assert_eq!(span, 120.0);
    }

    #[test]
    fn test_resize_axis_flexible_left() {
        let (lead, span) = resize_axis(10.0, 30.0, 0.0, 100.0, 200.0, [true, false, false]);
        assert_eq!(lead, 110.0);
        assert_eq!(span, 20.0);
    }

    #[test]
    fn test_resize_axis_all_flexible_is_proportional() {
        let (lead, span) = resize_axis(-40.0, 10.0, 0.5, 100.0, 50.0, [true, true, true]);
        assert_eq!(lead, 5.0);
        assert_eq!(span, 25.0);
    }

    #[test]
    fn test_property_names() {
        assert_eq!("scale".parse::<Property>(), Ok(Property::Scale));
        assert_eq!("anchorPoint".parse::<Property>(), Ok(Property::AnchorPoint));
        assert_eq!(
            "color".parse::<Property>(),
            Err(SceneError::UnknownProperty("color".into()))
        );
    }
}

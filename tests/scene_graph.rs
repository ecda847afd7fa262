use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use sprig::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn director() -> Director {
    init_logger();
    Director::new(DirectorConfig::default())
}

fn close(a: Point, b: Point) -> bool {
    a.approx_eq(b, 1e-4)
}

#[test]
fn test_dirty_bits_accumulate_and_layout_cascades() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    let child = director.scene_mut().create_node();
    let grandchild = director.scene_mut().create_node();
    {
        let scene = director.scene_mut();
        scene.append_child(root, child).unwrap();
        scene.append_child(child, grandchild).unwrap();
    }
    director.replace_scene(root, None).unwrap();
    director.tick(16.0);

    let scene = director.scene_mut();
    for id in [root, child, grandchild] {
        assert_eq!(scene.node(id).unwrap().dirty(), Dirty::empty());
    }
    assert!(scene.registry().is_empty());

    scene.set_position(child, (1.0, 2.0));
    scene.set_opacity(child, 0.5);
    assert_eq!(
        scene.node(child).unwrap().dirty(),
        Dirty::POSITION | Dirty::ALPHA
    );
    assert_eq!(scene.node(grandchild).unwrap().dirty(), Dirty::empty());

    scene.mark_dirty(root, Dirty::LAYOUT);
    assert!(scene.node(grandchild).unwrap().dirty().contains(Dirty::LAYOUT));
    assert_eq!(
        scene.node(child).unwrap().dirty(),
        Dirty::POSITION | Dirty::ALPHA | Dirty::LAYOUT
    );

    director.tick(16.0);
    for id in [root, child, grandchild] {
        assert_eq!(director.scene().node(id).unwrap().dirty(), Dirty::empty());
    }
}

#[test]
fn test_detached_nodes_keep_their_dirty_bits() {
    let mut director = director();
    let loose = director.scene_mut().create_node();
    director.scene_mut().set_opacity(loose, 0.3);
    director.tick(16.0);

    let node = director.scene().node(loose).unwrap();
    assert!(node.dirty().contains(Dirty::LAYOUT | Dirty::ALPHA));
    assert!(node.unit().is_none());
}

#[test]
fn test_relative_quality_is_product_of_ancestors() {
    let mut scene = SceneGraph::new();
    let root = scene.create_node();
    let child = scene.create_node();
    let grandchild = scene.create_node();
    scene.set_quality(root, 0.5);
    scene.set_quality(child, 0.5);
    scene.append_child(root, child).unwrap();
    scene.append_child(child, grandchild).unwrap();

    assert_eq!(scene.node(grandchild).unwrap().relative_quality(), 0.25);

    scene.set_quality(root, 1.0);
    assert_eq!(scene.node(child).unwrap().relative_quality(), 0.5);
    assert_eq!(scene.node(grandchild).unwrap().relative_quality(), 0.5);

    scene.remove_child(root, child).unwrap();
    assert_eq!(scene.node(child).unwrap().relative_quality(), 0.5);
}

#[test]
fn test_local_parent_round_trip() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();
    scene.set_position(node, (10.0, 20.0));
    scene.set_scale(node, (2.0, 3.0));
    scene.set_rotation(node, 30.0);

    for p in [Point::new(0.0, 0.0), Point::new(5.0, -7.0), Point::new(-3.5, 12.0)] {
        let back = scene.parent_to_local(node, scene.local_to_parent(node, p));
        assert!(close(back, p), "{:?} came back as {:?}", p, back);
    }
}

#[test]
fn test_quarter_turn_maps_x_axis_to_y_axis() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();
    scene.set_rotation(node, 90.0);

    let p = scene.local_to_parent(node, (1.0, 0.0));
    assert!(close(p, Point::new(0.0, 1.0)), "got {:?}", p);
}

#[test]
fn test_rotation_is_normalized() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();
    scene.set_rotation(node, -90.0);
    assert_eq!(scene.node(node).unwrap().rotation(), 270.0);
    scene.set_rotation(node, 720.0);
    assert_eq!(scene.node(node).unwrap().rotation(), 0.0);
}

#[test]
fn test_screen_conversion_through_ancestors() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    let child = director.scene_mut().create_node();
    let scene = director.scene_mut();
    scene.append_child(root, child).unwrap();
    scene.set_position(root, (100.0, 50.0));
    scene.set_scale(root, 2.0);
    scene.set_position(child, (10.0, 10.0));

    // Detached: no ancestor to compose through
    assert_eq!(scene.local_to_screen(child, (1.0, 1.0)), Point::new(1.0, 1.0));

    director.replace_scene(root, None).unwrap();
    let scene = director.scene();
    let screen = scene.local_to_screen(child, (1.0, 1.0));
    assert!(close(screen, Point::new(122.0, 72.0)), "got {:?}", screen);
    assert!(close(scene.screen_to_local(child, screen), Point::new(1.0, 1.0)));
    assert!(close(
        scene.local_to_node(child, (1.0, 1.0), root),
        Point::new(11.0, 11.0)
    ));
}

#[test]
fn test_frame_from_size_and_anchor() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();
    scene.set_size(node, (100.0, 50.0));

    let frame = scene.frame(node);
    assert_eq!(frame, Frame::new(-25.0, 50.0, 25.0, -50.0));

    scene.set_position(node, (10.0, 10.0));
    scene.set_scale(node, 2.0);
    assert_eq!(scene.bounding_box(node), Frame::new(-40.0, 110.0, 60.0, -90.0));
}

#[test]
fn test_measure_contents_covers_children_but_not_masks() {
    let mut scene = SceneGraph::new();
    let root = scene.create_node();
    let child = scene.create_node();
    let mask = scene.create_node();
    scene.set_anchor_point(root, (0.0, 0.0));
    scene.set_size(root, (10.0, 10.0));
    scene.set_size(child, (4.0, 4.0));
    scene.set_position(child, (20.0, 5.0));
    scene.set_size(mask, (1000.0, 1000.0));
    scene.append_child(root, child).unwrap();
    scene.append_child(root, mask).unwrap();
    scene.set_mask(root, Some(mask));

    assert!(scene.node(mask).unwrap().is_mask());
    assert_eq!(scene.measure_contents(root), Frame::new(0.0, 22.0, 10.0, 0.0));
}

#[test]
fn test_opacity_auto_hide() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();

    scene.set_opacity(node, 0.0);
    let n = scene.node(node).unwrap();
    assert!(n.hidden());
    assert!(n.auto_hide());

    scene.set_opacity(node, 0.5);
    let n = scene.node(node).unwrap();
    assert!(!n.hidden());
    assert!(!n.auto_hide());

    // An explicit hide survives opacity changes
    scene.set_hidden(node, true);
    scene.set_opacity(node, 0.0);
    scene.set_opacity(node, 1.0);
    assert!(scene.node(node).unwrap().hidden());
}

#[test]
fn test_explicit_show_is_not_reverted_by_opacity() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();

    scene.set_opacity(node, 0.0);
    let n = scene.node(node).unwrap();
    assert!(n.hidden());
    assert!(n.auto_hide());

    scene.set_hidden(node, false);
    let n = scene.node(node).unwrap();
    assert!(!n.hidden());
    assert!(!n.auto_hide());

    scene.set_opacity(node, 0.6);
    let n = scene.node(node).unwrap();
    assert!(!n.hidden());
    assert!(!n.auto_hide());
    assert_eq!(n.opacity(), 0.6);
}

#[test]
fn test_auto_resize_flexible_width() {
    let mut scene = SceneGraph::new();
    let parent = scene.create_node();
    let child = scene.create_node();
    scene.set_anchor_point(parent, (0.0, 0.0));
    scene.set_size(parent, (100.0, 50.0));
    scene.set_anchor_point(child, (0.0, 0.0));
    scene.set_size(child, (20.0, 10.0));
    scene.set_position(child, (10.0, 5.0));
    scene.set_auto_resize(child, AutoResize::WIDTH);
    scene.append_child(parent, child).unwrap();

    scene.set_size(parent, (200.0, 50.0));

    let c = scene.node(child).unwrap();
    assert_eq!(c.size(), Size::new(120.0, 10.0));
    assert_eq!(c.position(), Point::new(10.0, 5.0));
}

#[test]
fn test_set_property_checks_arity() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();

    scene.set_property(node, Property::Position, &[3.0]).unwrap();
    assert_eq!(scene.node(node).unwrap().position(), Point::new(3.0, 3.0));

    scene
        .set_property(node, "anchorPoint".parse().unwrap(), &[0.0, 1.0])
        .unwrap();
    assert_eq!(scene.node(node).unwrap().anchor_point(), Vec2::new(0.0, 1.0));

    assert!(matches!(
        scene.set_property(node, Property::Scale, &[]),
        Err(SceneError::InvalidArity { got: 0, .. })
    ));
    assert!(matches!(
        scene.set_property(node, Property::Rotation, &[1.0, 2.0]),
        Err(SceneError::InvalidArity { got: 2, .. })
    ));
}

#[test]
fn test_tree_errors() {
    let mut scene = SceneGraph::new();
    let root = scene.create_node();
    let child = scene.create_node();
    let stranger = scene.create_node();
    scene.append_child(root, child).unwrap();

    assert_eq!(
        scene.append_child(child, root),
        Err(SceneError::WouldCycle {
            parent: child,
            child: root
        })
    );
    assert_eq!(
        scene.remove_child(root, stranger),
        Err(SceneError::NotAChild {
            parent: root,
            child: stranger
        })
    );

    scene.destroy_node(root).unwrap();
    assert!(!scene.contains(child));
    assert_eq!(scene.append_child(stranger, child), Err(SceneError::StaleNode(child)));
}

#[test]
fn test_reparenting_moves_child() {
    let mut scene = SceneGraph::new();
    let a = scene.create_node();
    let b = scene.create_node();
    let child = scene.create_node();
    scene.append_child(a, child).unwrap();
    scene.append_child(b, child).unwrap();

    assert!(scene.children(a).is_empty());
    assert_eq!(scene.children(b), &[child]);
    assert_eq!(scene.parent(child), Some(b));
}

#[test]
fn test_renderer_propagates_to_new_children() {
    let mut scene = SceneGraph::new();
    let raster = scene.create_node();
    scene.set_renderer(raster, RendererKind::Raster);
    let child = scene.create_node();
    let element_only = scene.create_node_with(vec![RendererKind::Element]);
    scene.append_child(raster, child).unwrap();
    scene.append_child(raster, element_only).unwrap();

    assert_eq!(scene.node(child).unwrap().renderer(), RendererKind::Raster);
    assert_eq!(
        scene.node(element_only).unwrap().renderer(),
        RendererKind::Element
    );
}

#[test]
fn test_compare_nodes_is_paint_order() {
    let mut scene = SceneGraph::new();
    let root = scene.create_node();
    let a = scene.create_node();
    let b = scene.create_node();
    let a1 = scene.create_node();
    let first = scene.create_node();
    scene.append_child(root, a).unwrap();
    scene.append_child(root, b).unwrap();
    scene.append_child(a, a1).unwrap();
    scene.insert_child(root, first, 0).unwrap();

    assert_eq!(scene.compare_nodes(root, a), Ordering::Less);
    assert_eq!(scene.compare_nodes(a, b), Ordering::Less);
    assert_eq!(scene.compare_nodes(a1, b), Ordering::Less);
    assert_eq!(scene.compare_nodes(b, a1), Ordering::Greater);
    assert_eq!(scene.compare_nodes(first, a), Ordering::Less);
    assert_eq!(scene.compare_nodes(a, a), Ordering::Equal);
}

#[test]
fn test_attach_detach_leaves_no_registrations() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    let child = director.scene_mut().create_node();
    let grandchild = director.scene_mut().create_node();
    {
        let scene = director.scene_mut();
        scene.append_child(root, child).unwrap();
        scene.append_child(child, grandchild).unwrap();
        scene.add_event_listener(child, EventType::MouseDown, |_| EventResponse::Handled);
        scene.add_event_listener(grandchild, EventType::TouchStart, |_| EventResponse::Ignored);
        scene.add_event_listener(grandchild, EventType::TouchStart, |_| EventResponse::Ignored);
        assert_eq!(scene.dispatcher().registration_count(), 0);
    }

    director.replace_scene(root, None).unwrap();
    let id = director.id();
    let scene = director.scene_mut();
    assert_eq!(scene.dispatcher().registration_count(), 2);
    assert_eq!(scene.node(grandchild).unwrap().director(), Some(id));
    assert_eq!(scene.node(grandchild).unwrap().scene(), Some(root));

    scene.detach_root(root).unwrap();
    assert_eq!(scene.dispatcher().registration_count(), 0);
    for node in [root, child, grandchild] {
        let n = scene.node(node).unwrap();
        assert!(!n.is_attached());
        assert_eq!(n.director(), None);
        assert_eq!(n.scene(), None);
    }
    let slot = scene.node(grandchild).unwrap().listener_slot(EventType::TouchStart);
    assert_eq!(slot.count, 2);
    assert!(!slot.registered);

    scene.attach_root(root, id).unwrap();
    assert_eq!(scene.dispatcher().registration_count(), 2);
}

#[test]
fn test_mounted_root_moved_under_detached_parent_is_unmounted() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    director.replace_scene(root, None).unwrap();
    director.tick(16.0);

    let scene = director.scene_mut();
    scene.add_event_listener(root, EventType::TouchStart, |_| EventResponse::Handled);
    assert_eq!(scene.dispatcher().registration_count(), 1);
    assert!(scene.node(root).unwrap().unit().is_some());

    let loose = scene.create_node();
    scene.append_child(loose, root).unwrap();
    let n = scene.node(root).unwrap();
    assert!(!n.is_attached());
    assert_eq!(n.scene(), None);
    assert!(n.unit().is_none());
    assert_eq!(scene.dispatcher().registration_count(), 0);

    scene.remove_child(loose, root).unwrap();
    let n = scene.node(root).unwrap();
    assert!(!n.is_attached());
    assert_eq!(n.director(), None);
    assert_eq!(scene.dispatcher().registration_count(), 0);
    assert_eq!(director.current_scene(), None);
}

#[test]
fn test_mounted_root_moved_under_mounted_parent_joins_its_scene() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    director.replace_scene(root, None).unwrap();
    let id = director.id();

    let scene = director.scene_mut();
    let other = scene.create_node();
    scene.attach_root(other, id).unwrap();
    scene.add_event_listener(other, EventType::TouchStart, |_| EventResponse::Handled);
    assert_eq!(scene.node(other).unwrap().scene(), Some(other));

    scene.append_child(root, other).unwrap();
    let n = scene.node(other).unwrap();
    assert!(n.is_attached());
    assert_eq!(n.scene(), Some(root));
    assert_eq!(scene.dispatcher().registration_count(), 1);
    assert_eq!(director.current_scene(), Some(root));
}

#[test]
fn test_nested_node_cannot_become_scene_root() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    let child = director.scene_mut().create_node();
    director.scene_mut().append_child(root, child).unwrap();
    director.replace_scene(root, None).unwrap();

    assert_eq!(
        director.replace_scene(child, None),
        Err(SceneError::NotARoot {
            node: child,
            parent: root
        })
    );
    assert_eq!(director.current_scene(), Some(root));
    let n = director.scene().node(child).unwrap();
    assert!(n.is_attached());
    assert_eq!(n.scene(), Some(root));
}

#[test]
fn test_destroy_node_drops_references_to_it() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    director.replace_scene(root, None).unwrap();

    let scene = director.scene_mut();
    let holder = scene.create_node();
    let mask = scene.create_node();
    let user = scene.create_node();
    scene.append_child(holder, mask).unwrap();
    scene.append_child(root, user).unwrap();
    scene.set_mask(user, Some(mask));
    assert!(scene.node(mask).unwrap().is_mask());

    scene.destroy_node(holder).unwrap();
    assert!(!scene.contains(mask));
    assert_eq!(scene.node(user).unwrap().mask(), None);

    scene.destroy_node(root).unwrap();
    assert!(!scene.contains(user));
    assert_eq!(director.current_scene(), None);

    let next = director.scene_mut().create_node();
    director.replace_scene(next, None).unwrap();
    assert_eq!(director.current_scene(), Some(next));
}

#[test]
fn test_detaching_without_director_fails() {
    let mut scene = SceneGraph::new();
    let node = scene.create_node();
    assert_eq!(
        scene.detach_root(node),
        Err(SceneError::MissingDirector(node))
    );
}

#[test]
fn test_removing_last_listener_releases_registration() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    director.replace_scene(root, None).unwrap();
    let scene = director.scene_mut();

    let first = scene
        .add_event_listener(root, EventType::MouseMove, |_| EventResponse::Ignored)
        .unwrap();
    let second = scene
        .add_event_listener(root, EventType::MouseMove, |_| EventResponse::Ignored)
        .unwrap();
    assert!(scene.dispatcher().is_registered(root, EventType::MouseMove));

    assert!(scene.remove_event_listener(root, first));
    assert!(scene.dispatcher().is_registered(root, EventType::MouseMove));
    assert!(scene.remove_event_listener(root, second));
    assert!(!scene.dispatcher().is_registered(root, EventType::MouseMove));
    assert!(!scene.remove_event_listener(root, second));
}

fn button(director: &mut Director, parent: NodeId, at: (f32, f32)) -> NodeId {
    let scene = director.scene_mut();
    let node = scene.create_node();
    scene.set_anchor_point(node, (0.0, 0.0));
    scene.set_size(node, (50.0, 50.0));
    scene.set_position(node, at);
    scene.append_child(parent, node).unwrap();
    node
}

#[test]
fn test_dispatch_hits_topmost_node_in_local_space() {
    let mut director = director();
    let root = director.scene_mut().create_node();
    director.replace_scene(root, None).unwrap();
    let below = button(&mut director, root, (100.0, 100.0));
    let above = button(&mut director, root, (120.0, 100.0));

    let hits = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&hits);
    director
        .scene_mut()
        .add_event_listener(below, EventType::MouseDown, move |event| {
            log.borrow_mut().push(("below", event.position));
            EventResponse::Handled
        });
    let log = Rc::clone(&hits);
    director
        .scene_mut()
        .add_event_listener(above, EventType::MouseDown, move |event| {
            log.borrow_mut().push(("above", event.position));
            EventResponse::Ignored
        });

    // Only the lower button is under this point
    let response = director.dispatch(PointerEvent::new(EventType::MouseDown, (110.0, 120.0)));
    assert_eq!(response, EventResponse::Handled);
    assert_eq!(hits.borrow().as_slice(), &[("below", Point::new(10.0, 20.0))]);

    // Both are hit; the upper one ignores and the event falls through
    hits.borrow_mut().clear();
    let response = director.dispatch(PointerEvent::new(EventType::MouseDown, (130.0, 110.0)));
    assert_eq!(response, EventResponse::Handled);
    assert_eq!(
        hits.borrow().as_slice(),
        &[
            ("above", Point::new(10.0, 10.0)),
            ("below", Point::new(30.0, 10.0))
        ]
    );

    hits.borrow_mut().clear();
    director.scene_mut().set_hidden(below, true);
    let response = director.dispatch(PointerEvent::new(EventType::MouseDown, (110.0, 120.0)));
    assert_eq!(response, EventResponse::Ignored);
    assert!(hits.borrow().is_empty());

    let response = director.dispatch(PointerEvent::new(EventType::MouseDown, (5000.0, 10.0)));
    assert_eq!(response, EventResponse::Ignored);
}

#[test]
fn test_touch_devices_ignore_mouse_listeners() {
    init_logger();
    let mut director = Director::new(DirectorConfig::default().supports_touch(true));
    let root = director.scene_mut().create_node();
    director.replace_scene(root, None).unwrap();
    let scene = director.scene_mut();

    assert!(scene
        .add_event_listener(root, EventType::MouseDown, |_| EventResponse::Handled)
        .is_none());
    assert!(scene
        .add_event_listener(root, EventType::TouchStart, |_| EventResponse::Handled)
        .is_some());
    assert_eq!(scene.dispatcher().registration_count(), 1);
}

#[test]
fn test_replace_scene_without_transition_unmounts_previous() {
    let mut director = director();
    let first = director.scene_mut().create_node();
    let second = director.scene_mut().create_node();
    director.replace_scene(first, None).unwrap();
    director.tick(16.0);
    assert!(director.scene().node(first).unwrap().unit().is_some());

    director.replace_scene(second, None).unwrap();
    assert_eq!(director.current_scene(), Some(second));
    assert!(!director.scene().node(first).unwrap().is_attached());
    assert!(director.scene().node(first).unwrap().unit().is_none());
    assert!(director.scene().node(second).unwrap().is_attached());
}

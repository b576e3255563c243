use glam::Vec2;
use haunt_engine::{
    Animatable, Axis, DurationSpec, ElementSpec, EngineError, EntityId, EventKind, EventTarget,
    GameConfig, MoveOptions, Positionable, Rect, Scrollable, Viewport,
};

fn viewport() -> Viewport {
    Viewport::new(&GameConfig {
        width: 320.0,
        height: 240.0,
        ..GameConfig::default()
    })
}

/// Create an entity and run the frame that makes it ready.
fn spawn(vp: &mut Viewport, attrs: &[(&str, &str)]) -> EntityId {
    let mut spec = ElementSpec::default();
    for (name, value) in attrs {
        spec = spec.with_attribute(*name, *value);
    }
    let id = vp.create_element(spec).unwrap();
    vp.tick(0.0).unwrap();
    vp.drain_events();
    id
}

fn count(vp: &mut Viewport, kind: EventKind) -> usize {
    vp.drain_events().into_iter().filter(|e| e.kind == kind).count()
}

#[test]
fn clamped_move_completes_once() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[("xmin", "0"), ("xmax", "100"), ("x", "50")]);

    vp.handle(id).unwrap().move_x(200.0, MoveOptions::speed(10.0)).unwrap();
    assert_eq!(
        vp.entity(id).unwrap().channel(Axis::X).duration(),
        DurationSpec::seconds(5.0)
    );

    vp.tick(4999.0).unwrap();
    assert_eq!(count(&mut vp, EventKind::AfterMoveX), 0);

    vp.tick(1.0).unwrap();
    let events = vp.drain_events();
    let after: Vec<_> = events.iter().filter(|e| e.kind == EventKind::AfterMoveX).collect();
    assert_eq!(after.len(), 1);
    assert!(after[0].bubbles);
    assert!(after[0].cancelable);
    assert!(after[0].reaches(EventTarget::Viewport));
    assert_eq!(vp.handle(id).unwrap().x(), 100.0);

    vp.tick(10_000.0).unwrap();
    assert_eq!(count(&mut vp, EventKind::AfterMoveX), 0);
}

#[test]
fn transformation_end_stays_on_channel() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[]);
    vp.handle(id).unwrap().move_y(30.0, MoveOptions::speed(30.0)).unwrap();
    vp.tick(1000.0).unwrap();

    let events = vp.drain_events();
    let end = events
        .iter()
        .find(|e| matches!(e.kind, EventKind::TransformationEnd(_)))
        .unwrap();
    assert_eq!(end.target, EventTarget::Channel(id, Axis::Y));
    assert!(!end.bubbles);
    assert!(!end.reaches(EventTarget::Entity(id)));
    match &end.kind {
        EventKind::TransformationEnd(detail) => {
            assert_eq!(detail.prev_value, 0);
            assert_eq!(detail.next_value, 30);
            assert_eq!(detail.full_next_value, "30px");
        }
        _ => unreachable!(),
    }
    assert!(events.iter().any(|e| e.kind == EventKind::AfterMoveY));
}

#[test]
fn speed_reads_back_as_requested() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[("x", "50")]);
    for speed in [1.0_f32, 7.5, 33.0, 250.0] {
        let mut e = vp.handle(id).unwrap();
        e.move_x(-400.0, MoveOptions::speed(speed)).unwrap();
        let expected = (e.entity().channel(Axis::X).value() - 50.0).abs() / speed;
        assert!((e.entity().channel(Axis::X).duration().as_secs() - expected).abs() < 1e-3);
        assert!((e.hspeed().abs() - speed).abs() < 1e-3, "speed {speed}");
        e.stop();
        e.set_x(50.0);
        vp.tick(100.0).unwrap();
    }
}

#[test]
fn zero_speed_move_is_rejected() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[("x", "10")]);
    let result = vp.handle(id).unwrap().move_x(80.0, MoveOptions::speed(0.0));
    assert!(matches!(result, Err(EngineError::InvalidSpeed(s)) if s == 0.0));
    vp.tick(1000.0).unwrap();
    assert!(vp.drain_events().is_empty());
    assert_eq!(vp.handle(id).unwrap().x(), 10.0);
}

#[test]
fn zeroing_hspeed_stops_a_fling() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[]);
    vp.handle(id).unwrap().set_hspeed(25.0).unwrap();
    vp.tick(1000.0).unwrap();

    let mut e = vp.handle(id).unwrap();
    e.set_hspeed(0.0).unwrap();
    let stopped_at = e.x();
    assert!((24.0..=25.0).contains(&stopped_at), "stopped at {stopped_at}");
    assert_eq!(e.x(), stopped_at);
    assert_eq!(e.hspeed(), 0.0);

    vp.tick(5000.0).unwrap();
    assert_eq!(count(&mut vp, EventKind::AfterMoveX), 0);
    assert_eq!(vp.handle(id).unwrap().x(), stopped_at);

    // Already stationary: no-op.
    vp.handle(id).unwrap().set_hspeed(0.0).unwrap();
    assert!(vp.entity(id).unwrap().pending_move(Axis::X).is_none());
}

#[test]
fn repeating_move_reissues_displacement() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[]);
    vp.handle(id)
        .unwrap()
        .move_x(10.0, MoveOptions::speed(10.0).repeating())
        .unwrap();

    vp.tick(3000.0).unwrap();
    assert_eq!(count(&mut vp, EventKind::AfterMoveX), 3);
    assert_eq!(vp.handle(id).unwrap().x(), 30.0);
    assert!(vp.entity(id).unwrap().pending_move(Axis::X).is_some());

    vp.handle(id).unwrap().stop();
    vp.tick(3000.0).unwrap();
    assert_eq!(count(&mut vp, EventKind::AfterMoveX), 0);
}

#[test]
fn fling_stops_at_bound() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[("xmax", "64")]);
    vp.handle(id).unwrap().set_hspeed(64.0).unwrap();
    vp.tick(60_000.0).unwrap();
    assert_eq!(count(&mut vp, EventKind::AfterMoveX), 1);
    assert_eq!(vp.handle(id).unwrap().x(), 64.0);
}

#[test]
fn axes_complete_independently() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[]);
    {
        let mut e = vp.handle(id).unwrap();
        e.move_x(10.0, MoveOptions::speed(10.0)).unwrap();
        e.move_y(40.0, MoveOptions::speed(10.0)).unwrap();
    }
    vp.tick(1000.0).unwrap();
    let kinds: Vec<_> = vp.drain_events().into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::AfterMoveX));
    assert!(!kinds.contains(&EventKind::AfterMoveY));

    vp.tick(3000.0).unwrap();
    assert_eq!(count(&mut vp, EventKind::AfterMoveY), 1);
}

#[test]
fn geometry_is_cached_for_one_frame() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[]);
    vp.handle(id).unwrap().move_x(1000.0, MoveOptions::speed(1000.0)).unwrap();
    assert_eq!(vp.handle(id).unwrap().x(), 0.0);

    // Within the 1000/60 ms window the transform has moved, the cache has not.
    vp.tick(10.0).unwrap();
    let first = vp.handle(id).unwrap().bounding_box();
    let second = vp.handle(id).unwrap().bounding_box();
    assert_eq!(first, second);
    assert_eq!(vp.handle(id).unwrap().x(), 0.0);

    vp.tick(490.0).unwrap();
    assert_eq!(vp.handle(id).unwrap().x(), 500.0);
}

#[test]
fn zero_zoom_collapses_boxes() {
    let mut vp = Viewport::new(&GameConfig {
        zoom: 0.0,
        page_origin: [37.6, 12.2],
        ..GameConfig::default()
    });
    let id = spawn(&mut vp, &[("x", "50"), ("y", "20")]);
    let mut e = vp.handle(id).unwrap();
    assert_eq!(e.bounding_box(), Rect::new(37.0, 12.0, 0.0, 0.0));
    assert_eq!(e.width(), 0.0);
    assert_eq!(vp.bounding_box(), Rect::new(37.0, 12.0, 0.0, 0.0));
}

#[test]
fn follow_clamps_scroll_at_edges() {
    let mut vp = viewport();
    vp.set_scroll_bounds(haunt_engine::ScrollBounds::new(0.0, 160.0, 0.0, 80.0));

    let cases = [
        ((0.0, 0.0), Vec2::new(0.0, 0.0)),
        ((-500.0, -500.0), Vec2::new(0.0, 0.0)),
        ((200.0, 150.0), Vec2::new(48.0, 38.0)),
        ((1000.0, 1000.0), Vec2::new(160.0, 80.0)),
    ];
    for ((x, y), expected) in cases {
        let (xs, ys) = (x.to_string(), y.to_string());
        let id = spawn(&mut vp, &[("x", xs.as_str()), ("y", ys.as_str())]);
        vp.attach_follow_target(id, Vec2::ZERO).unwrap();
        assert_eq!(vp.scroll(), expected, "target at ({x}, {y})");
        vp.remove(id);
    }
}

#[test]
fn follow_loop_tracks_until_detached() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[("x", "200"), ("y", "150")]);
    vp.attach_follow_target(id, Vec2::new(0.0, -20.0)).unwrap();
    assert_eq!(vp.scroll(), Vec2::new(48.0, 18.0));

    vp.handle(id).unwrap().set_x(400.0);
    vp.tick(17.0).unwrap();
    assert_eq!(vp.scroll(), Vec2::new(248.0, 18.0));

    vp.detach_follow_target();
    vp.detach_follow_target();
    vp.handle(id).unwrap().set_x(0.0);
    vp.tick(100.0).unwrap();
    assert_eq!(vp.scroll(), Vec2::new(248.0, 18.0));
}

#[test]
fn follow_stops_when_target_removed() {
    let mut vp = viewport();
    let id = spawn(&mut vp, &[("x", "400")]);
    vp.attach_follow_target(id, Vec2::ZERO).unwrap();
    vp.remove(id);
    assert!(vp.follow_target().is_none());
    vp.tick(100.0).unwrap();
}

#[test]
fn positions_are_world_space_for_plain_and_sticky_entities() {
    let mut vp = viewport();
    let plain = spawn(&mut vp, &[("x", "100")]);
    let sticky = spawn(&mut vp, &[("x", "100"), ("sticky", "")]);
    vp.set_scroll(Vec2::new(60.0, 0.0));
    vp.tick(20.0).unwrap();

    assert_eq!(vp.handle(plain).unwrap().x(), 100.0);
    assert_eq!(vp.handle(sticky).unwrap().x(), 100.0);
    assert!(vp.entity(sticky).unwrap().sticky);
}

#[test]
fn extension_hook_configures_motion_before_ready() {
    let mut vp = viewport();
    vp.define("Walker", |entity| {
        let speed = entity.attributes().get_int("pace", 10.0)?;
        entity.set_hspeed(speed)?;
        Ok(Some("<span class=\"walker\"></span>".to_string()))
    });
    let id = vp
        .create_element(ElementSpec::new("Walker").with_attribute("pace", "20"))
        .unwrap();
    vp.tick(0.0).unwrap();

    let events = vp.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Ready);
    assert!((vp.handle(id).unwrap().hspeed() - 20.0).abs() < 1e-3);
    assert!(vp.entity(id).unwrap().content().ends_with("<span class=\"walker\"></span>"));
}

#[test]
fn malformed_attribute_surfaces_at_ready() {
    let mut vp = viewport();
    vp.create_element(ElementSpec::default().with_attribute("x", "left")).unwrap();
    assert!(matches!(
        vp.tick(16.0),
        Err(EngineError::MalformedAttribute { name, .. }) if name == "x"
    ));
}

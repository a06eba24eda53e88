use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use minemap_engine::{
    Camera2D, EngineConfig, EntityId, EntityKind, EntityStatus, HeadlessContainer, MountError,
    PlaybackState, Position, Projection, RecordingBackend, RecordingLog, Timestamp, Trajectory,
    TrajectoryPoint, TrajectoryReplay, Viewport,
};

fn trajectory(len: usize) -> Trajectory {
    let points = (0..len)
        .map(|i| TrajectoryPoint {
            timestamp: Timestamp::from_secs(i as i64 * 5),
            position: Position::planar(i as f64 * 2.0, 1.0),
            status: if i == 2 {
                EntityStatus::Warning
            } else {
                EntityStatus::Normal
            },
        })
        .collect();
    Trajectory::new(EntityId::new("loader-12"), EntityKind::Device, points).expect("trajectory")
}

fn mount(len: usize) -> (TrajectoryReplay<RecordingBackend>, RecordingLog) {
    let (container, log) = HeadlessContainer::new(Viewport {
        width: 640,
        height: 480,
    });
    let mut config = EngineConfig::default();
    config.playback.base_tick_ms = 200;
    let replay = TrajectoryReplay::mount(
        container,
        trajectory(len),
        &config,
        Projection::Plan(Camera2D::default()),
    )
    .expect("mount");
    (replay, log)
}

#[test]
fn playback_boundaries_hold() {
    let (mut replay, _log) = mount(4);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    replay.on_index_changed(move |index, point: &TrajectoryPoint| {
        sink.borrow_mut().push((index, point.position.x))
    });

    replay.step(-1);
    assert_eq!(replay.index(), 0);
    assert_eq!(replay.state(), PlaybackState::Stopped);

    replay.seek(3);
    replay.step(1);
    assert_eq!(replay.index(), 3);
    assert_eq!(replay.state(), PlaybackState::Ended);

    replay.play();
    assert_eq!(replay.index(), 0);
    assert_eq!(replay.state(), PlaybackState::Playing);
    assert_eq!(*seen.borrow(), vec![(3, 6.0), (0, 0.0)]);
}

#[test]
fn playback_clock_runs_independently_of_frames() {
    let (mut replay, log) = mount(5);
    replay.play();

    for _ in 0..10 {
        replay.frame(Duration::from_millis(50));
    }
    assert_eq!(replay.index(), 2);
    assert_eq!(
        replay.core().store().get(&EntityId::new("loader-12")).map(|e| e.status),
        Some(EntityStatus::Warning)
    );

    replay.pause();
    for _ in 0..10 {
        replay.frame(Duration::from_millis(50));
    }
    assert_eq!(replay.index(), 2);
    assert_eq!(log.creates(), 1);
    assert_eq!(log.destroys(), 0);
    assert_eq!(log.draws(), 20);
}

#[test]
fn selecting_the_subject_reports_its_id() {
    let (mut replay, _log) = mount(3);
    let selected = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&selected);
    replay.on_entity_selected(move |id| sink.borrow_mut().push(id.cloned()));

    let subject = replay.core().pick(minemap_engine::Vec2::new(320.0, 240.0 - 8.0));
    assert_eq!(subject, Some(EntityId::new("loader-12")));

    replay.pointer_down(minemap_engine::Vec2::new(320.0, 232.0));
    replay.pointer_down(minemap_engine::Vec2::new(10.0, 10.0));
    assert_eq!(
        *selected.borrow(),
        vec![Some(EntityId::new("loader-12")), None]
    );
}

#[test]
fn missing_container_fails_mount() {
    let result = TrajectoryReplay::<RecordingBackend>::mount(
        HeadlessContainer::missing(),
        trajectory(2),
        &EngineConfig::default(),
        Projection::default(),
    );
    assert!(matches!(result, Err(MountError::ContainerMissing(_))));
}

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use minemap_engine::{
    AlertKind, BackendCall, Camera2D, EngineConfig, EntityId, EntityKind, EntityStatus,
    HeadlessContainer, LiveMap, Position, Projection, RecordingBackend, RecordingLog,
    SpatialEntity, TelemetryFeed, Timestamp, Vertex, Viewport, Zone, ZoneRule,
};

fn mount() -> (LiveMap<RecordingBackend>, RecordingLog) {
    let (container, log) = HeadlessContainer::new(Viewport {
        width: 800,
        height: 600,
    });
    let mut config = EngineConfig::default();
    config.timing.feed_period_ms = 100;
    let map = LiveMap::mount(container, &config, Projection::Plan(Camera2D::default()))
        .expect("mount");
    (map, log)
}

fn entity(id: &str, x: f64, y: f64, status: EntityStatus, secs: i64) -> SpatialEntity {
    SpatialEntity::new(
        id,
        EntityKind::Person,
        Position::planar(x, y),
        status,
        Timestamp::from_secs(secs),
    )
}

fn square_zone_with_dwell(threshold_seconds: f64) -> Zone {
    Zone::new(
        "stope-4",
        "Stope 4",
        vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(10.0, 0.0),
            Vertex::new(10.0, 10.0),
            Vertex::new(0.0, 10.0),
        ],
        2,
        ZoneRule {
            alert_on_enter: true,
            dwell_threshold_seconds: Some(threshold_seconds),
        },
    )
    .expect("zone")
}

type AlertLog = Rc<RefCell<Vec<(AlertKind, i64)>>>;

fn record_alerts(map: &mut LiveMap<RecordingBackend>) -> AlertLog {
    let alerts: AlertLog = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&alerts);
    map.on_alert(move |alert| {
        sink.borrow_mut()
            .push((alert.kind, alert.timestamp.as_millis() / 1000))
    });
    alerts
}

#[test]
fn square_zone_enter_then_dwell_then_exit() {
    let (mut map, _log) = mount();
    map.set_zones(vec![square_zone_with_dwell(30.0)])
        .expect("zones");
    let alerts = record_alerts(&mut map);
    let zone_id = map.geofence().zones().next().expect("zone").id.clone();
    let id = EntityId::new("miner-7");

    map.upsert(entity("miner-7", 5.0, 5.0, EntityStatus::Normal, 0))
        .expect("enter");
    assert_eq!(*alerts.borrow(), vec![(AlertKind::Enter, 0)]);

    map.frame(Duration::ZERO, Timestamp::from_secs(10));
    map.frame(Duration::ZERO, Timestamp::from_secs(29));
    assert_eq!(alerts.borrow().len(), 1);

    map.frame(Duration::ZERO, Timestamp::from_secs(30));
    assert_eq!(
        *alerts.borrow(),
        vec![(AlertKind::Enter, 0), (AlertKind::Dwell, 30)]
    );

    map.frame(Duration::ZERO, Timestamp::from_secs(30));
    map.upsert(entity("miner-7", 6.0, 6.0, EntityStatus::Normal, 30))
        .expect("still inside");
    assert_eq!(alerts.borrow().len(), 2);

    map.upsert(entity("miner-7", 20.0, 20.0, EntityStatus::Normal, 31))
        .expect("exit");
    assert!(map.geofence().occupancy(&id, &zone_id).is_none());
    map.frame(Duration::ZERO, Timestamp::from_secs(90));
    assert_eq!(alerts.borrow().len(), 2);

    map.upsert(entity("miner-7", 5.0, 5.0, EntityStatus::Normal, 100))
        .expect("re-enter");
    assert_eq!(alerts.borrow().last(), Some(&(AlertKind::Enter, 100)));
}

#[test]
fn create_update_destroy_against_renderer() {
    let (mut map, log) = mount();
    let id = EntityId::new("A");

    map.upsert(SpatialEntity::new(
        "A",
        EntityKind::Device,
        Position::planar(1.0, 1.0),
        EntityStatus::Normal,
        Timestamp::from_secs(0),
    ))
    .expect("create");
    let handle = map
        .core()
        .synchronizer()
        .binding(&id)
        .expect("bound")
        .handle;

    map.upsert(SpatialEntity::new(
        "A",
        EntityKind::Device,
        Position::planar(2.0, 2.0),
        EntityStatus::Warning,
        Timestamp::from_secs(1),
    ))
    .expect("update");
    assert_eq!(
        map.core().synchronizer().binding(&id).map(|binding| binding.handle),
        Some(handle)
    );

    map.remove_entity(&id).expect("remove");

    assert_eq!(
        log.calls(),
        vec![
            BackendCall::Create {
                entity_id: id.clone(),
                handle,
            },
            BackendCall::Update {
                entity_id: id.clone(),
                handle,
            },
            BackendCall::Destroy {
                entity_id: id,
                handle,
            },
        ]
    );
    assert_eq!(map.core().synchronizer().binding_count(), 0);
}

#[test]
fn bindings_track_live_ids_through_mixed_mutations() {
    let (mut map, log) = mount();
    let steps: [(&str, Option<f64>); 8] = [
        ("a", Some(1.0)),
        ("b", Some(2.0)),
        ("a", Some(3.0)),
        ("c", Some(4.0)),
        ("b", None),
        ("d", Some(5.0)),
        ("a", None),
        ("b", Some(6.0)),
    ];
    for (id, x) in steps {
        match x {
            Some(x) => map
                .upsert(entity(id, x, 0.0, EntityStatus::Normal, 0))
                .expect("upsert"),
            None => {
                map.remove_entity(&EntityId::new(id));
            }
        }
        let bound: Vec<&EntityId> = map.core().synchronizer().bindings().map(|(id, _)| id).collect();
        let live: Vec<&EntityId> = map.store().ids().collect();
        assert_eq!(bound, live);
    }
    assert_eq!(log.creates(), 5);
    assert_eq!(log.destroys(), 2);
}

/// Counts polls and keeps counting after its owner is gone.
struct SpyFeed {
    polls: Rc<Cell<usize>>,
}

impl TelemetryFeed for SpyFeed {
    fn poll_batch(&mut self, now: Timestamp) -> Vec<SpatialEntity> {
        self.polls.set(self.polls.get() + 1);
        vec![entity("spy-1", 1.0, 1.0, EntityStatus::Normal, now.as_millis() / 1000)]
    }
}

#[test]
fn no_feed_tick_or_alert_after_dispose() {
    let (mut map, log) = mount();
    map.set_zones(vec![square_zone_with_dwell(5.0)])
        .expect("zones");
    let alerts = record_alerts(&mut map);
    let polls = Rc::new(Cell::new(0));
    map.attach_feed(Box::new(SpyFeed {
        polls: Rc::clone(&polls),
    }));

    map.frame(Duration::from_millis(100), Timestamp::from_secs(0));
    assert_eq!(polls.get(), 1);
    assert_eq!(alerts.borrow().len(), 1);
    assert_eq!(map.core().synchronizer().binding_count(), 1);

    assert!(map.dispose());
    assert!(!map.dispose());
    assert_eq!(map.core().synchronizer().binding_count(), 0);
    assert_eq!(log.releases(), 1);

    for second in 1..20 {
        map.frame(Duration::from_millis(250), Timestamp::from_secs(second));
    }
    map.upsert(entity("late", 5.0, 5.0, EntityStatus::Normal, 30))
        .expect("ignored after dispose");
    drop(map);

    assert_eq!(polls.get(), 1);
    assert_eq!(alerts.borrow().len(), 1);
    assert_eq!(log.releases(), 1);
}

#[test]
fn alarm_filter_hides_rendered_subset_only() {
    let (mut map, log) = mount();
    map.ingest(vec![
        entity("ok", 0.0, 0.0, EntityStatus::Normal, 0),
        entity("hot", 3.0, 0.0, EntityStatus::Alarm, 0),
    ]);

    map.set_filter(|entity| entity.status.is_alarming());
    assert_eq!(map.store().len(), 2);
    assert_eq!(map.core().synchronizer().binding_count(), 1);
    assert_eq!(log.destroys(), 1);

    map.clear_filter();
    assert_eq!(map.core().synchronizer().binding_count(), 2);
}

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::config::MockFeedConfig;
use crate::model::{EntityKind, EntityStatus, Position, SpatialEntity, Timestamp};

/// Source of entity snapshots, polled once per feed-clock tick. An empty
/// batch is a normal gap, not an error.
pub trait TelemetryFeed {
    fn poll_batch(&mut self, now: Timestamp) -> Vec<SpatialEntity>;
}

/// Push side of a [`BufferedFeed`]. Cloneable so any number of producers can
/// queue snapshots between ticks.
#[derive(Debug, Clone, Default)]
pub struct FeedSender {
    queue: Rc<RefCell<VecDeque<SpatialEntity>>>,
}

impl FeedSender {
    pub fn push(&self, entity: SpatialEntity) {
        self.queue.borrow_mut().push_back(entity);
    }

    pub fn push_batch(&self, entities: impl IntoIterator<Item = SpatialEntity>) {
        self.queue.borrow_mut().extend(entities);
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Feed adapter for producers that push on their own cadence. Each tick
/// drains everything queued since the previous one, in arrival order.
#[derive(Debug, Default)]
pub struct BufferedFeed {
    sender: FeedSender,
}

impl BufferedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> FeedSender {
        self.sender.clone()
    }
}

impl TelemetryFeed for BufferedFeed {
    fn poll_batch(&mut self, _now: Timestamp) -> Vec<SpatialEntity> {
        self.sender.queue.borrow_mut().drain(..).collect()
    }
}

/// Seeded random-walk generator standing in for site telemetry.
#[derive(Debug)]
pub struct MockFeed {
    rng: StdRng,
    config: MockFeedConfig,
    entities: Vec<SpatialEntity>,
}

impl MockFeed {
    pub fn new(config: MockFeedConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut entities = Vec::with_capacity(config.devices + config.persons + config.sensors);
        for (kind, count, prefix) in [
            (EntityKind::Device, config.devices, "dev"),
            (EntityKind::Person, config.persons, "per"),
            (EntityKind::Sensor, config.sensors, "sen"),
        ] {
            for n in 0..count {
                let position = random_position(&mut rng, &config);
                let entity = SpatialEntity::new(
                    format!("{prefix}-{n:03}"),
                    kind,
                    position,
                    EntityStatus::Normal,
                    Timestamp::ZERO,
                );
                entities.push(entity);
            }
        }
        Self {
            rng,
            config,
            entities,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn advance(&mut self, entity_index: usize, now: Timestamp) -> SpatialEntity {
        let step = self.config.step.abs();
        let (min, max) = area(&self.config);
        let entity = &mut self.entities[entity_index];

        // Sensors are fixed installations; only their readings change.
        if entity.kind != EntityKind::Sensor {
            let dx = self.rng.gen_range(-step..=step);
            let dy = self.rng.gen_range(-step..=step);
            entity.position.x = (entity.position.x + dx).clamp(min[0], max[0]);
            entity.position.y = (entity.position.y + dy).clamp(min[1], max[1]);
        }

        if self.rng.gen_bool(self.config.status_change_probability.clamp(0.0, 1.0)) {
            if let Some(status) = entity.kind.allowed_statuses().choose(&mut self.rng) {
                entity.status = *status;
            }
        }

        entity.last_update = now;
        let reading = match entity.kind {
            EntityKind::Device => ("fuel_level", json!(self.rng.gen_range(5..=100))),
            EntityKind::Person => ("tag_id", json!(format!("T{:05}", entity_index))),
            EntityKind::Sensor => ("gas_ppm", json!(self.rng.gen_range(0.0..=60.0_f64).round())),
        };
        entity.clone().with_metadata(reading.0, reading.1)
    }
}

impl TelemetryFeed for MockFeed {
    fn poll_batch(&mut self, now: Timestamp) -> Vec<SpatialEntity> {
        (0..self.entities.len())
            .map(|index| self.advance(index, now))
            .collect()
    }
}

fn area(config: &MockFeedConfig) -> ([f64; 2], [f64; 2]) {
    let min = [
        config.area_min[0].min(config.area_max[0]),
        config.area_min[1].min(config.area_max[1]),
    ];
    let max = [
        config.area_min[0].max(config.area_max[0]),
        config.area_min[1].max(config.area_max[1]),
    ];
    (min, max)
}

fn random_position(rng: &mut StdRng, config: &MockFeedConfig) -> Position {
    let (min, max) = area(config);
    let x = rng.gen_range(min[0]..=max[0]);
    let y = rng.gen_range(min[1]..=max[1]);
    if config.max_height > 0.0 {
        Position::spatial(x, y, rng.gen_range(0.0..=config.max_height))
    } else {
        Position::planar(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_feed_is_deterministic_per_seed() {
        let mut first = MockFeed::new(MockFeedConfig::default());
        let mut second = MockFeed::new(MockFeedConfig::default());
        for tick in 0..5 {
            let now = Timestamp::from_secs(tick);
            assert_eq!(first.poll_batch(now), second.poll_batch(now));
        }
    }

    #[test]
    fn mock_entities_stay_valid_and_inside_area() {
        let config = MockFeedConfig {
            step: 25.0,
            status_change_probability: 0.5,
            ..MockFeedConfig::default()
        };
        let (min, max) = area(&config);
        let mut feed = MockFeed::new(config);
        for tick in 0..50 {
            for entity in feed.poll_batch(Timestamp::from_secs(tick)) {
                entity.validate().expect("generated entity is valid");
                assert!(entity.position.x >= min[0] && entity.position.x <= max[0]);
                assert!(entity.position.y >= min[1] && entity.position.y <= max[1]);
                assert_eq!(entity.last_update, Timestamp::from_secs(tick));
            }
        }
    }

    #[test]
    fn batch_covers_every_configured_entity() {
        let config = MockFeedConfig {
            devices: 2,
            persons: 3,
            sensors: 1,
            ..MockFeedConfig::default()
        };
        let mut feed = MockFeed::new(config);
        let batch = feed.poll_batch(Timestamp::ZERO);
        assert_eq!(batch.len(), 6);
        assert_eq!(
            batch.iter().filter(|e| e.kind == EntityKind::Person).count(),
            3
        );
        assert!(batch
            .iter()
            .filter(|e| e.kind == EntityKind::Device)
            .all(|e| e.metadata_value("fuel_level").is_some()));
    }

    #[test]
    fn buffered_feed_drains_in_arrival_order() {
        let mut feed = BufferedFeed::new();
        let sender = feed.sender();
        for id in ["b", "a", "c"] {
            sender.push(SpatialEntity::new(
                id,
                EntityKind::Sensor,
                Position::planar(0.0, 0.0),
                EntityStatus::Normal,
                Timestamp::ZERO,
            ));
        }
        assert_eq!(sender.pending(), 3);
        let ids: Vec<String> = feed
            .poll_batch(Timestamp::ZERO)
            .into_iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(feed.poll_batch(Timestamp::ZERO).is_empty());
    }
}

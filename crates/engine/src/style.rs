use std::collections::HashMap;

use crate::model::{EntityKind, EntityStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerShape {
    Square,
    Diamond,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualStyle {
    pub color: [u8; 4],
    pub half_size_px: i32,
    pub shape: MarkerShape,
}

pub const FALLBACK_STYLE: VisualStyle = VisualStyle {
    color: [150, 150, 160, 255],
    half_size_px: 4,
    shape: MarkerShape::Square,
};

const NORMAL_COLOR: [u8; 4] = [90, 200, 120, 255];
const WARNING_COLOR: [u8; 4] = [240, 190, 60, 255];
const ALARM_COLOR: [u8; 4] = [230, 70, 60, 255];
const OFFLINE_COLOR: [u8; 4] = [110, 110, 120, 255];
const SOS_COLOR: [u8; 4] = [255, 40, 200, 255];

#[derive(Debug, Clone)]
struct KindStyles {
    by_status: HashMap<EntityStatus, VisualStyle>,
    default: VisualStyle,
}

/// Closed `(kind, status) -> style` table. Lookups never fail: a status
/// without an entry gets the kind default, and a kind without an entry gets
/// [`FALLBACK_STYLE`].
#[derive(Debug, Clone)]
pub struct StyleTable {
    kinds: HashMap<EntityKind, KindStyles>,
    fallback: VisualStyle,
}

impl Default for StyleTable {
    fn default() -> Self {
        let mut table = Self::empty(FALLBACK_STYLE);
        for (kind, shape, half_size_px) in [
            (EntityKind::Device, MarkerShape::Square, 5),
            (EntityKind::Person, MarkerShape::Circle, 4),
            (EntityKind::Sensor, MarkerShape::Diamond, 4),
        ] {
            let style = |color| VisualStyle {
                color,
                half_size_px,
                shape,
            };
            table.set_kind_default(kind, style(FALLBACK_STYLE.color));
            for status in kind.allowed_statuses() {
                let color = match status {
                    EntityStatus::Normal => NORMAL_COLOR,
                    EntityStatus::Warning => WARNING_COLOR,
                    EntityStatus::Alarm => ALARM_COLOR,
                    EntityStatus::Offline => OFFLINE_COLOR,
                    EntityStatus::Sos => SOS_COLOR,
                    EntityStatus::Unknown => FALLBACK_STYLE.color,
                };
                let mut entry = style(color);
                if status.is_alarming() {
                    entry.half_size_px += 2;
                }
                table.set(kind, *status, entry);
            }
        }
        table
    }
}

impl StyleTable {
    pub fn empty(fallback: VisualStyle) -> Self {
        Self {
            kinds: HashMap::new(),
            fallback,
        }
    }

    pub fn set(&mut self, kind: EntityKind, status: EntityStatus, style: VisualStyle) {
        let fallback = self.fallback;
        self.kinds
            .entry(kind)
            .or_insert_with(|| KindStyles {
                by_status: HashMap::new(),
                default: fallback,
            })
            .by_status
            .insert(status, style);
    }

    pub fn set_kind_default(&mut self, kind: EntityKind, style: VisualStyle) {
        self.kinds
            .entry(kind)
            .or_insert_with(|| KindStyles {
                by_status: HashMap::new(),
                default: style,
            })
            .default = style;
    }

    pub fn style_for(&self, kind: EntityKind, status: EntityStatus) -> VisualStyle {
        match self.kinds.get(&kind) {
            Some(styles) => styles
                .by_status
                .get(&status)
                .copied()
                .unwrap_or(styles.default),
            None => self.fallback,
        }
    }

    pub fn max_half_size_px(&self) -> i32 {
        self.kinds
            .values()
            .flat_map(|styles| {
                styles
                    .by_status
                    .values()
                    .chain(std::iter::once(&styles.default))
            })
            .map(|style| style.half_size_px)
            .max()
            .unwrap_or(self.fallback.half_size_px)
    }
}

//! Spawned entities and their geometry
//!
//! Positions use a bottom-left origin: `pos.x` is the left edge, `pos.y` the
//! height of the bottom edge above the ground line.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::CoinType;

/// Stable identity of a spawned entity within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Hands out entity ids, monotonically increasing per run
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Axis-aligned bounding box (y grows upward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_bottom_left(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: pos + size,
        }
    }

    /// Overlap test with a margin: negative requires deeper overlap,
    /// positive accepts near misses
    pub fn overlaps(&self, other: &Aabb, margin: f32) -> bool {
        self.min.x < other.max.x + margin
            && self.max.x > other.min.x - margin
            && self.min.y < other.max.y + margin
            && self.max.y > other.min.y - margin
    }
}

/// Obstacle silhouettes, unlocked progressively by level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleShape {
    Square,
    Triangle,
    Line,
    Cube,
    Zeta,
    LShape,
}

impl ObstacleShape {
    /// Base footprint in px (width, height)
    pub fn size(self) -> Vec2 {
        match self {
            ObstacleShape::Square => Vec2::new(40.0, 40.0),
            ObstacleShape::Triangle => Vec2::new(44.0, 38.0),
            ObstacleShape::Line => Vec2::new(16.0, 64.0),
            ObstacleShape::Cube => Vec2::new(48.0, 48.0),
            ObstacleShape::Zeta => Vec2::new(56.0, 40.0),
            ObstacleShape::LShape => Vec2::new(48.0, 56.0),
        }
    }

    /// Shapes that may be upsized at higher levels
    pub fn large_capable(self) -> bool {
        matches!(self, ObstacleShape::Square | ObstacleShape::Cube | ObstacleShape::Line)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleShape::Square => "square",
            ObstacleShape::Triangle => "triangle",
            ObstacleShape::Line => "line",
            ObstacleShape::Cube => "cube",
            ObstacleShape::Zeta => "zeta",
            ObstacleShape::LShape => "lshape",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleKind {
    pub shape: ObstacleShape,
    pub large: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoinKind {
    pub coin_type: CoinType,
    /// Seconds added to the timer on pickup
    pub bonus_s: f32,
}

/// An obstacle or coin in the lane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntity<K> {
    pub id: EntityId,
    pub kind: K,
    pub pos: Vec2,
    pub size: Vec2,
}

pub type Obstacle = SpawnEntity<ObstacleKind>;
pub type Coin = SpawnEntity<CoinKind>;

impl<K> SpawnEntity<K> {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_bottom_left(self.pos, self.size)
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    /// Fully past the trailing (left) edge of the arena
    pub fn is_off_screen(&self) -> bool {
        self.right() < 0.0
    }
}

/// What the renderer is asked to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Avatar,
    Obstacle,
    Coin,
}

/// Renderer-facing entity descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub kind: ViewKind,
    /// Visual variant (shape or coin colour)
    pub visual: &'static str,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<&Obstacle> for EntityView {
    fn from(o: &Obstacle) -> Self {
        Self {
            kind: ViewKind::Obstacle,
            visual: o.kind.shape.as_str(),
            x: o.pos.x,
            y: o.pos.y,
            w: o.size.x,
            h: o.size.y,
        }
    }
}

impl From<&Coin> for EntityView {
    fn from(c: &Coin) -> Self {
        Self {
            kind: ViewKind::Coin,
            visual: c.kind.coin_type.as_str(),
            x: c.pos.x,
            y: c.pos.y,
            w: c.size.x,
            h: c.size.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32, side: f32) -> Aabb {
        Aabb::from_bottom_left(Vec2::new(x, y), Vec2::splat(side))
    }

    #[test]
    fn test_negative_margin_requires_real_overlap() {
        let a = square(0.0, 0.0, 40.0);
        // 5px overlap: plain overlap, but not deep enough for -10
        let b = square(35.0, 0.0, 40.0);
        assert!(a.overlaps(&b, 0.0));
        assert!(!a.overlaps(&b, -10.0));
        let c = square(20.0, 0.0, 40.0);
        assert!(a.overlaps(&c, -10.0));
    }

    #[test]
    fn test_positive_margin_accepts_near_miss() {
        let a = square(0.0, 0.0, 40.0);
        let b = square(43.0, 0.0, 20.0);
        assert!(!a.overlaps(&b, 0.0));
        assert!(a.overlaps(&b, 5.0));
    }

    #[test]
    fn test_off_screen_uses_right_edge() {
        let mut o = Obstacle {
            id: EntityId(1),
            kind: ObstacleKind {
                shape: ObstacleShape::Square,
                large: false,
            },
            pos: Vec2::new(-39.0, 0.0),
            size: ObstacleShape::Square.size(),
        };
        assert!(!o.is_off_screen());
        o.pos.x = -41.0;
        assert!(o.is_off_screen());
    }

    #[test]
    fn test_id_allocator_is_monotonic() {
        let mut ids = IdAllocator::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
    }
}

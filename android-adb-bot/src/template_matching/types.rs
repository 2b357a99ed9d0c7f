/// Template matching data types
use serde::Serialize;

/// Default minimum correlation score for a match.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// A box where a reference image matched, in screen coordinates.
/// `x1`/`y1` are exclusive: the box covers `x0..x1` × `y0..y1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    /// Correlation score (-1.0..=1.0)
    pub score: f32,
}

/// Point a match resolves to, e.g. where to tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MatchPoint {
    pub x: u32,
    pub y: u32,
}

/// Rule turning a match box into a point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointRule {
    #[default]
    Center,
    /// Same point as `Center` for now; see DESIGN.md.
    Bottom,
}

/// Coordinate candidates are ordered by before indexing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    X,
    #[default]
    Y,
}

/// Area a match anchor has to fall in. Bounds are inclusive; a zero `x2`
/// or `y2` stands for the screen's width or height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionOfInterest {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl MatchCandidate {
    pub fn new(x0: u32, y0: u32, width: u32, height: u32, score: f32) -> Self {
        Self {
            x0,
            y0,
            x1: x0 + width,
            y1: y0 + height,
            score,
        }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Area shared with `other`.
    pub fn intersection(&self, other: &MatchCandidate) -> u64 {
        let w = self.x1.min(other.x1).saturating_sub(self.x0.max(other.x0));
        let h = self.y1.min(other.y1).saturating_sub(self.y0.max(other.y0));
        w as u64 * h as u64
    }

    pub fn point(&self, rule: PointRule) -> MatchPoint {
        match rule {
            PointRule::Center | PointRule::Bottom => MatchPoint {
                x: self.x0 + self.width() / 2,
                y: self.y0 + self.height() / 2,
            },
        }
    }

    pub fn contains(&self, point: MatchPoint) -> bool {
        (self.x0..=self.x1).contains(&point.x) && (self.y0..=self.y1).contains(&point.y)
    }
}

impl MatchPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Shift by `(dx, dy)`, saturating at zero and clamping to the last pixel.
    pub fn offset(&self, (dx, dy): (i32, i32), (width, height): (u32, u32)) -> MatchPoint {
        let shift = |v: u32, d: i32, size: u32| -> u32 {
            let moved = (v as i64 + d as i64).max(0) as u64;
            moved.min(size.saturating_sub(1) as u64) as u32
        };
        MatchPoint {
            x: shift(self.x, dx, width),
            y: shift(self.y, dy, height),
        }
    }
}

impl RegionOfInterest {
    pub const FULL_SCREEN: RegionOfInterest = RegionOfInterest {
        x1: 0,
        y1: 0,
        x2: 0,
        y2: 0,
    };

    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Region starting at `(x1, y1)` reaching to the bottom right corner.
    pub fn from_origin(x1: u32, y1: u32) -> Self {
        Self { x1, y1, x2: 0, y2: 0 }
    }

    /// Replace zero lower-right bounds with the screen size.
    pub fn resolve(&self, screen_width: u32, screen_height: u32) -> RegionOfInterest {
        RegionOfInterest {
            x1: self.x1,
            y1: self.y1,
            x2: if self.x2 == 0 { screen_width } else { self.x2 },
            y2: if self.y2 == 0 { screen_height } else { self.y2 },
        }
    }
}

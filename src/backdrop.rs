//! Decorative animated backdrop: wave lines that bend toward the pointer,
//! one trailing dot riding each line, and a slowly drifting starfield.
//!
//! Everything here is a pure function of the frame counter and the latest
//! pointer sample. Entities have no identity beyond their index and are
//! never serialized.

use rand::Rng;
use std::f64::consts::PI;

/// Logical canvas. The renderer maps this onto whatever the terminal gives it.
pub const WIDTH: f64 = 1920.0;
pub const HEIGHT: f64 = 1080.0;

pub const LINES: usize = 6;
/// Bend points per line; a path always has `SEGMENTS + 1` samples.
pub const SEGMENTS: usize = 9;
pub const STAR_COUNT: usize = 30;

/// Seconds advanced per frame tick (~60 fps equivalent time base).
pub const FRAME_SECONDS: f64 = 0.016;

/// Vertical reach of pointer hover detection, in logical units.
const HOVER_RADIUS: f64 = 60.0;

pub const LINE_COLORS: [(u8, u8, u8); 9] = [
    (0, 201, 81),
    (227, 227, 227),
    (207, 207, 207),
    (162, 162, 162),
    (120, 120, 120),
    (152, 255, 206),
    (227, 227, 227),
    (156, 156, 156),
    (90, 90, 90),
];

pub const STAR_COLORS: [(u8, u8, u8); 4] = [
    (114, 255, 159),
    (180, 255, 217),
    (255, 255, 255),
    (152, 255, 206),
];

pub const DOT_COLOR: (u8, u8, u8) = (114, 255, 159);

/// Vertical slot of a line: lines are distributed evenly across the canvas.
pub fn slot(line_idx: usize) -> f64 {
    HEIGHT / (LINES + 1) as f64 * (line_idx + 1) as f64
}

/// Front three lines render brighter than the rest.
pub fn line_opacity(line_idx: usize) -> f64 {
    if line_idx <= 2 {
        0.9
    } else {
        0.55
    }
}

/// Sample points of one wave line at time `t` under the given pointer bend.
///
/// Returns exactly `SEGMENTS + 1` points whose x-coordinates step evenly and
/// monotonically across `[0, WIDTH]`. The y of each sample stacks the line's
/// slot, two index-phased oscillations whose amplitude grows with the
/// vertical bend, a linear tilt from the horizontal bend, and a
/// center-anchored ripple.
pub fn wave_path(t: f64, line_idx: usize, bend_x: f64, bend_y: f64) -> Vec<(f64, f64)> {
    let idx = line_idx as f64;
    let mut points = Vec::with_capacity(SEGMENTS + 1);
    for i in 0..=SEGMENTS {
        let p = i as f64 / SEGMENTS as f64;
        let x = p * WIDTH;
        let base = slot(line_idx)
            + (p * 3.0 + t * (0.7 + idx * 0.11)).sin() * (32.0 + bend_y.abs() * 0.4)
            + (p * 7.0 - t * (0.6 + idx * 0.17)).cos() * (12.0 + bend_y.abs() * 0.2);
        let curve_influence = (p - 0.5) * bend_x * 0.5;
        let ripple = ((p - 0.5) * PI * 2.0 + t * 2.0).sin() * (bend_x + bend_y).abs() * 0.15;
        points.push((x, base + curve_influence + ripple));
    }
    points
}

/// Star flicker opacity; never drops below 0.3 so a star is never
/// fully extinguished.
pub fn flicker(t: f64, phase: f64) -> f64 {
    (0.4 + (t * 0.5 + phase).sin() * 0.3).max(0.3)
}

/// A bright dot sliding along a line's idle path.
#[derive(Debug, Clone, Copy)]
pub struct TrailDot {
    pub offset: f64,
    pub speed: f64,
}

impl TrailDot {
    /// Position at time `t` on the idle path of line `line_idx`. Progress
    /// wraps at 1 so the dot loops forever.
    pub fn position(&self, t: f64, line_idx: usize) -> (f64, f64) {
        let idx = line_idx as f64;
        let progress = (self.offset + t * self.speed).rem_euclid(1.0);
        let x = progress * WIDTH;
        let y = slot(line_idx)
            + (progress * 3.0 + 0.7 * idx).sin() * 48.0
            + (progress * 5.0 + 0.4 * idx).cos() * 20.0;
        (x, y)
    }
}

/// Ambient background particle with wraparound drift.
#[derive(Debug, Clone, Copy)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub vx: f64,
    pub vy: f64,
    pub color: (u8, u8, u8),
    pub phase: f64,
}

impl Star {
    /// Advance one frame. Exits wrap modularly to the opposite edge, so the
    /// position always stays inside `[0, WIDTH) x [0, HEIGHT)`.
    pub fn step(&mut self) {
        self.x = (self.x + self.vx).rem_euclid(WIDTH);
        self.y = (self.y + self.vy).rem_euclid(HEIGHT);
    }
}

/// Latest pointer sample, normalized to `[-0.5, 0.5]` on both axes, plus the
/// line currently hovered. Written by the input handler, read by the frame
/// tick; whole-value replacement, last write wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerCell {
    pub nx: f64,
    pub ny: f64,
    pub hovered: Option<usize>,
}

/// Per-session backdrop state. Drawables are pre-allocated once; each frame
/// only advances the counter and the star positions.
#[derive(Debug)]
pub struct Backdrop {
    frame: u64,
    dots: Vec<TrailDot>,
    stars: Vec<Star>,
    pointer: PointerCell,
}

impl Backdrop {
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let dots = (0..LINES)
            .map(|_| TrailDot {
                offset: rng.random_range(0.0..1.0),
                speed: 0.03 + rng.random_range(0.0..0.04),
            })
            .collect();
        let stars = (0..STAR_COUNT)
            .map(|_| Star {
                x: rng.random_range(0.0..WIDTH),
                y: rng.random_range(0.0..HEIGHT),
                radius: 1.0 + rng.random_range(0.0..3.0),
                vx: (rng.random_range(0.0..1.0) - 0.5) * 0.3,
                vy: (rng.random_range(0.0..1.0) - 0.5) * 0.3,
                color: STAR_COLORS[rng.random_range(0..STAR_COLORS.len())],
                phase: rng.random_range(0.0..PI * 2.0),
            })
            .collect();
        Backdrop {
            frame: 0,
            dots,
            stars,
            pointer: PointerCell::default(),
        }
    }

    /// One animation frame: bump the counter and drift the stars. All other
    /// positions are derived from `time()` on demand.
    pub fn tick(&mut self) {
        self.frame += 1;
        for star in &mut self.stars {
            star.step();
        }
    }

    pub fn time(&self) -> f64 {
        self.frame as f64 * FRAME_SECONDS
    }

    /// Record the latest pointer sample and recompute which line (if any)
    /// the pointer hovers, by vertical proximity to the line's slot.
    pub fn set_pointer(&mut self, nx: f64, ny: f64) {
        let nx = nx.clamp(-0.5, 0.5);
        let ny = ny.clamp(-0.5, 0.5);
        let pointer_y = (ny + 0.5) * HEIGHT;
        let hovered = (0..LINES)
            .map(|i| (i, (slot(i) - pointer_y).abs()))
            .filter(|&(_, d)| d <= HOVER_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        self.pointer = PointerCell { nx, ny, hovered };
    }

    pub fn pointer(&self) -> PointerCell {
        self.pointer
    }

    pub fn is_hovered(&self, line_idx: usize) -> bool {
        self.pointer.hovered == Some(line_idx)
    }

    /// Bend inputs for one line at the current frame. Hover boosts the bend
    /// 2.5x and adds a time wobble.
    pub fn line_bend(&self, line_idx: usize) -> (f64, f64) {
        let t = self.time();
        let boost = if self.is_hovered(line_idx) { 2.5 } else { 1.0 };
        let wobble = if self.is_hovered(line_idx) {
            (t * 3.0).sin() * 0.3
        } else {
            0.0
        };
        (
            self.pointer.nx * 40.0 * boost + wobble,
            self.pointer.ny * 32.0 * boost + wobble,
        )
    }

    pub fn dots(&self) -> &[TrailDot] {
        &self.dots
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }
}

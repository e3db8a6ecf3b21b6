//! Floating-gallery engine.
//!
//! Pure placement and drag state for the freeform image gallery: randomized
//! collision-avoiding initial layout, exponential-smoothing easing toward the
//! pointer, and click-vs-drag disambiguation. Nothing in here touches the
//! DOM; the gallery component applies the computed values to elements.

use crate::imageref::normalize_image_reference;
use crate::{ContentRow, Lang};
use rand::Rng;

/// Fraction of the remaining distance covered by each animation step.
pub const SMOOTHING_FACTOR: f64 = 0.35;
/// Pointer travel beyond which a gesture counts as a drag, not a click.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;
/// How far a dragged figure may leave the canvas before being clamped.
pub const EDGE_OVERSHOOT_PX: f64 = 200.0;
/// Viewports at or below this width get the narrow-layout parameters.
pub const NARROW_BREAKPOINT_PX: f64 = 768.0;

const PLACEMENT_RETRIES: usize = 200;
const NARROW_HEIGHT_FACTOR: f64 = 1.1;
const VERTICAL_RESERVE_PX: f64 = 300.0;
// Narrow viewports leave less horizontal room, so they get both a wider
// safety margin and a larger minimum separation between figures.
const SEPARATION_NARROW_PX: f64 = 160.0;
const SEPARATION_WIDE_PX: f64 = 120.0;
const MARGIN_NARROW_PX: f64 = 80.0;
const MARGIN_WIDE_PX: f64 = 40.0;
const FOOTPRINT_EMPHASIS_PX: f64 = 350.0;
const FOOTPRINT_BASE_PX: f64 = 250.0;
const Z_ORDER_BASE: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Display size of a figure, as declared in the content sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeClass {
    Small,
    Medium,
    #[default]
    Normal,
    Big,
    Large,
    ExtraLarge,
}

impl SizeClass {
    /// Case-insensitive parse with `Normal` as the fallback for anything
    /// unrecognized (including the empty cell).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "small" => SizeClass::Small,
            "medium" => SizeClass::Medium,
            "big" => SizeClass::Big,
            "large" => SizeClass::Large,
            "extra-large" => SizeClass::ExtraLarge,
            _ => SizeClass::Normal,
        }
    }

    /// Big-family figures render wider and carry the emphasized caption.
    pub fn emphasized(self) -> bool {
        matches!(self, SizeClass::Big | SizeClass::Large | SizeClass::ExtraLarge)
    }

    /// Approximate rendered width used when reserving placement room.
    pub fn footprint(self) -> f64 {
        if self.emphasized() {
            FOOTPRINT_EMPHASIS_PX
        } else {
            FOOTPRINT_BASE_PX
        }
    }
}

/// One draggable figure, derived from a content row at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryItem {
    pub image_source: String,
    pub caption: String,
    pub size: SizeClass,
    pub description: Option<String>,
}

/// Build gallery items from content rows, dropping rows without a usable
/// image reference.
pub fn gallery_items(rows: &[ContentRow], lang: Lang, base: &str) -> Vec<GalleryItem> {
    rows.iter()
        .filter_map(|row| {
            let raw = row.text("image_url");
            if raw.trim().is_empty() {
                return None;
            }
            let image_source = normalize_image_reference(raw, base);
            if image_source.is_empty() {
                return None;
            }
            let description = row.localized("description", lang);
            Some(GalleryItem {
                image_source,
                caption: row.localized("caption", lang).to_string(),
                size: SizeClass::parse(row.text("size")),
                description: (!description.is_empty()).then(|| description.to_string()),
            })
        })
        .collect()
}

/// Result of the initial layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasLayout {
    pub canvas_height: f64,
    pub positions: Vec<Point>,
}

/// Place figures at random positions that keep a minimum pairwise distance.
///
/// Rejection sampling with a bounded retry count: after 200 candidates the
/// last one is accepted even if it sits too close — the separation is a soft
/// constraint by design. Accepted positions are clamped into
/// `[margin, max]` on each axis. A non-positive viewport yields no
/// positions instead of failing.
pub fn layout_positions(
    sizes: &[SizeClass],
    viewport_w: f64,
    viewport_h: f64,
    rng: &mut impl Rng,
) -> CanvasLayout {
    if viewport_w <= 0.0 || viewport_h <= 0.0 {
        return CanvasLayout {
            canvas_height: 0.0,
            positions: Vec::new(),
        };
    }

    let narrow = viewport_w <= NARROW_BREAKPOINT_PX;
    let canvas_height = if narrow {
        (viewport_h * NARROW_HEIGHT_FACTOR).round()
    } else {
        viewport_h
    };
    let separation = if narrow {
        SEPARATION_NARROW_PX
    } else {
        SEPARATION_WIDE_PX
    };
    let margin = if narrow { MARGIN_NARROW_PX } else { MARGIN_WIDE_PX };

    let mut positions: Vec<Point> = Vec::with_capacity(sizes.len());
    for size in sizes {
        let max_x = (viewport_w - size.footprint() - margin).max(0.0);
        let max_y = (canvas_height - VERTICAL_RESERVE_PX).max(0.0);
        let mut placed = clamp_into(sample(rng, max_x, max_y), margin, max_x, max_y);
        for _ in 1..PLACEMENT_RETRIES {
            if positions.iter().all(|p| p.distance(placed) >= separation) {
                break;
            }
            placed = clamp_into(sample(rng, max_x, max_y), margin, max_x, max_y);
        }
        positions.push(placed);
    }

    CanvasLayout {
        canvas_height,
        positions,
    }
}

fn sample(rng: &mut impl Rng, max_x: f64, max_y: f64) -> Point {
    Point {
        x: sample_axis(rng, max_x),
        y: sample_axis(rng, max_y),
    }
}

fn sample_axis(rng: &mut impl Rng, max: f64) -> f64 {
    if max > 0.0 {
        rng.random_range(0.0..max)
    } else {
        0.0
    }
}

fn clamp_into(candidate: Point, margin: f64, max_x: f64, max_y: f64) -> Point {
    // The margin wins when the valid range collapses.
    Point {
        x: candidate.x.min(max_x).max(margin),
        y: candidate.y.min(max_y).max(margin),
    }
}

/// Advance `current` toward `target` by a fixed fraction of the remaining
/// distance. Exponential smoothing: converges without overshooting.
pub fn step(current: Point, target: Point, factor: f64) -> Point {
    Point {
        x: current.x + (target.x - current.x) * factor,
        y: current.y + (target.y - current.y) * factor,
    }
}

/// Rectangle a drag target may occupy, already including the allowed
/// overshoot past the top/left canvas edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragBounds {
    pub max_x: f64,
    pub max_y: f64,
}

impl DragBounds {
    pub fn clamp(&self, p: Point) -> Point {
        Point {
            x: p.x.max(-EDGE_OVERSHOOT_PX).min(self.max_x),
            y: p.y.max(-EDGE_OVERSHOOT_PX).min(self.max_y),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    figure: usize,
    offset: Point,
    start: Point,
    target: Point,
    current: Point,
    moved: bool,
}

/// What a finished gesture amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragOutcome {
    pub figure: usize,
    pub position: Point,
    /// True once the pointer strayed more than the click threshold; callers
    /// must suppress activation for such gestures.
    pub was_drag: bool,
}

/// Per-gallery drag state machine: `Idle → Dragging → Idle`.
///
/// `begin` grabs a figure and bumps the monotonic stacking counter;
/// `pointer_moved` retargets (clamped) and latches the drag classification;
/// `frame` advances the eased position once per animation frame; `release`
/// returns to idle and reports the outcome. After `release`, `frame` yields
/// nothing, so a late animation callback cannot move a released figure.
#[derive(Debug)]
pub struct DragController {
    active: Option<ActiveDrag>,
    z_top: i32,
}

impl DragController {
    pub fn new() -> Self {
        Self {
            active: None,
            z_top: Z_ORDER_BASE,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_figure(&self) -> Option<usize> {
        self.active.as_ref().map(|drag| drag.figure)
    }

    /// Start tracking `figure`; returns its new stacking order.
    pub fn begin(&mut self, figure: usize, pointer: Point, figure_pos: Point) -> i32 {
        self.z_top += 1;
        self.active = Some(ActiveDrag {
            figure,
            offset: Point::new(pointer.x - figure_pos.x, pointer.y - figure_pos.y),
            start: pointer,
            target: figure_pos,
            current: figure_pos,
            moved: false,
        });
        self.z_top
    }

    pub fn pointer_moved(&mut self, pointer: Point, bounds: &DragBounds) {
        let Some(drag) = self.active.as_mut() else {
            return;
        };
        if pointer.distance(drag.start) > DRAG_THRESHOLD_PX {
            drag.moved = true;
        }
        drag.target = bounds.clamp(Point::new(
            pointer.x - drag.offset.x,
            pointer.y - drag.offset.y,
        ));
    }

    /// One smoothing step; `Some((figure, rendered position))` while a drag
    /// is active, `None` otherwise.
    pub fn frame(&mut self) -> Option<(usize, Point)> {
        let drag = self.active.as_mut()?;
        drag.current = step(drag.current, drag.target, SMOOTHING_FACTOR);
        Some((drag.figure, drag.current))
    }

    pub fn release(&mut self) -> Option<DragOutcome> {
        self.active.take().map(|drag| DragOutcome {
            figure: drag.figure,
            position: drag.current,
            was_drag: drag.moved,
        })
    }
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_rows;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn size_class_parses_case_insensitively() {
        assert_eq!(SizeClass::parse("BIG"), SizeClass::Big);
        assert_eq!(SizeClass::parse(" extra-large "), SizeClass::ExtraLarge);
        assert_eq!(SizeClass::parse("small"), SizeClass::Small);
        assert_eq!(SizeClass::parse(""), SizeClass::Normal);
        assert_eq!(SizeClass::parse("huge"), SizeClass::Normal);
    }

    #[test]
    fn emphasized_sizes_reserve_the_wide_footprint() {
        assert!(SizeClass::Big.footprint() > SizeClass::Normal.footprint());
        assert_eq!(SizeClass::Large.footprint(), SizeClass::Big.footprint());
        assert!(!SizeClass::Medium.emphasized());
    }

    #[test]
    fn gallery_items_skip_rows_without_images() {
        let rows = parse_rows(&grid(&[
            &["image_url", "caption", "caption_eng", "size", "description"],
            &["frog.jpeg", "In memoriam", "", "normal", ""],
            &["", "no image", "", "big", ""],
            &["[img]garden.jpg[/img]", "Le jardin", "The Garden", "big", "ruine"],
        ]));
        let items = gallery_items(&rows, Lang::En, "/site/");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].image_source, "/site/frog.jpeg");
        assert_eq!(items[0].caption, "In memoriam");
        assert_eq!(items[0].description, None);
        assert_eq!(items[1].image_source, "/site/garden.jpg");
        assert_eq!(items[1].caption, "The Garden");
        assert_eq!(items[1].size, SizeClass::Big);
        assert_eq!(items[1].description.as_deref(), Some("ruine"));
    }

    #[test]
    fn placement_mostly_honors_the_minimum_separation() {
        let sizes = [SizeClass::Normal; 5];
        let mut satisfied = 0;
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let layout = layout_positions(&sizes, 1920.0, 1080.0, &mut rng);
            assert_eq!(layout.positions.len(), sizes.len());
            let ok = layout.positions.iter().enumerate().all(|(i, a)| {
                layout.positions[..i].iter().all(|b| a.distance(*b) >= 120.0)
            });
            if ok {
                satisfied += 1;
            }
        }
        // Soft constraint: a handful of unlucky seeds may fall back, but the
        // overwhelming majority of runs must separate every pair.
        assert!(satisfied >= 48, "only {} of 50 runs separated", satisfied);
    }

    #[test]
    fn placement_never_fails_when_overcrowded() {
        let sizes = [SizeClass::Big; 40];
        let mut rng = StdRng::seed_from_u64(7);
        let layout = layout_positions(&sizes, 300.0, 200.0, &mut rng);
        assert_eq!(layout.positions.len(), 40);
        for p in &layout.positions {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
    }

    #[test]
    fn degenerate_viewport_lays_out_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let layout = layout_positions(&[SizeClass::Normal; 3], 0.0, 800.0, &mut rng);
        assert!(layout.positions.is_empty());
        assert_eq!(layout.canvas_height, 0.0);
        let layout = layout_positions(&[SizeClass::Normal; 3], 1024.0, -1.0, &mut rng);
        assert!(layout.positions.is_empty());
    }

    #[test]
    fn narrow_viewports_get_a_taller_canvas() {
        let mut rng = StdRng::seed_from_u64(2);
        let narrow = layout_positions(&[SizeClass::Normal], 400.0, 600.0, &mut rng);
        assert_eq!(narrow.canvas_height, 660.0);
        let wide = layout_positions(&[SizeClass::Normal], 1400.0, 600.0, &mut rng);
        assert_eq!(wide.canvas_height, 600.0);
    }

    #[test]
    fn positions_respect_margin_and_axis_maxima() {
        let mut rng = StdRng::seed_from_u64(3);
        let layout = layout_positions(&[SizeClass::Normal; 8], 1920.0, 1080.0, &mut rng);
        let max_x = 1920.0 - 250.0 - 40.0;
        let max_y = 1080.0 - 300.0;
        for p in &layout.positions {
            assert!(p.x >= 40.0 && p.x <= max_x);
            assert!(p.y >= 40.0 && p.y <= max_y);
        }
    }

    #[test]
    fn step_converges_without_overshooting() {
        let target = Point::new(100.0, -40.0);
        let mut current = Point::new(0.0, 0.0);
        let first = step(current, target, SMOOTHING_FACTOR);
        assert!((first.x - 35.0).abs() < 1e-9);
        for _ in 0..60 {
            let next = step(current, target, SMOOTHING_FACTOR);
            // Each step shrinks the remaining distance; no oscillation.
            assert!(next.distance(target) <= current.distance(target));
            current = next;
        }
        assert!(current.distance(target) < 0.01);
    }

    #[test]
    fn small_movement_is_a_click() {
        let mut controller = DragController::new();
        let bounds = DragBounds {
            max_x: 1000.0,
            max_y: 800.0,
        };
        controller.begin(0, Point::new(50.0, 50.0), Point::new(40.0, 40.0));
        controller.pointer_moved(Point::new(53.0, 52.0), &bounds);
        controller.pointer_moved(Point::new(50.0, 50.0), &bounds);
        let outcome = controller.release().expect("gesture was active");
        assert!(!outcome.was_drag);
        assert_eq!(outcome.figure, 0);
    }

    #[test]
    fn large_movement_latches_as_a_drag() {
        let mut controller = DragController::new();
        let bounds = DragBounds {
            max_x: 1000.0,
            max_y: 800.0,
        };
        controller.begin(2, Point::new(50.0, 50.0), Point::new(40.0, 40.0));
        controller.pointer_moved(Point::new(70.0, 50.0), &bounds);
        // Returning to the start does not un-latch the classification.
        controller.pointer_moved(Point::new(50.0, 50.0), &bounds);
        let outcome = controller.release().expect("gesture was active");
        assert!(outcome.was_drag);
    }

    #[test]
    fn target_is_clamped_to_the_overshoot_band() {
        let mut controller = DragController::new();
        let bounds = DragBounds {
            max_x: 900.0,
            max_y: 700.0,
        };
        controller.begin(0, Point::new(10.0, 10.0), Point::new(0.0, 0.0));
        controller.pointer_moved(Point::new(-5000.0, 5000.0), &bounds);
        // Step far enough that the eased position reaches the clamp.
        let mut last = Point::default();
        for _ in 0..200 {
            if let Some((_, p)) = controller.frame() {
                last = p;
            }
        }
        assert!((last.x + EDGE_OVERSHOOT_PX).abs() < 0.5);
        assert!((last.y - 700.0).abs() < 0.5);
    }

    #[test]
    fn frames_stop_once_released() {
        let mut controller = DragController::new();
        let bounds = DragBounds {
            max_x: 1000.0,
            max_y: 800.0,
        };
        controller.begin(1, Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        controller.pointer_moved(Point::new(40.0, 0.0), &bounds);
        assert!(controller.frame().is_some());
        let _ = controller.release();
        assert_eq!(controller.frame(), None);
        assert!(!controller.is_dragging());
    }

    #[test]
    fn stacking_order_only_grows() {
        let mut controller = DragController::new();
        let z1 = controller.begin(0, Point::default(), Point::default());
        let _ = controller.release();
        let z2 = controller.begin(1, Point::default(), Point::default());
        let _ = controller.release();
        assert!(z2 > z1);
    }
}

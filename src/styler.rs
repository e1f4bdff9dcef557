//! QR Styler - Grid Repainting
//!
//! Paints a reconstructed module grid onto a fresh canvas with a solid,
//! linear or radial fill, then composites an optional logo. Modules are
//! plain squares without anti-aliasing; a pixel belongs to a module when its
//! centre lies inside the module square.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::grid::ModuleGrid;
use crate::style::{Color, GradientKind, LogoSpec, StyleSpec};

/// Segments used to flatten each quadratic corner curve.
const CURVE_STEPS: usize = 12;

/// Paint source for dark modules, evaluated at pixel centres.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Color),
    Linear {
        from: (f64, f64),
        to: (f64, f64),
        start: Color,
        end: Color,
    },
    Radial {
        center: (f64, f64),
        radius: f64,
        start: Color,
        end: Color,
    },
}

impl Fill {
    /// Build the module fill for a canvas of `size` pixels.
    pub fn for_style(style: &StyleSpec) -> Self {
        let half = style.size as f64 / 2.0;
        let g = &style.gradient;
        match g.kind {
            GradientKind::None => Fill::Solid(style.foreground),
            GradientKind::Linear => {
                let angle = g.angle.to_radians();
                let (dx, dy) = (angle.cos() * half, angle.sin() * half);
                Fill::Linear {
                    from: (half - dx, half - dy),
                    to: (half + dx, half + dy),
                    start: g.start,
                    end: g.end,
                }
            }
            GradientKind::Radial => Fill::Radial {
                center: (half, half),
                radius: half,
                start: g.start,
                end: g.end,
            },
        }
    }

    pub fn color_at(&self, x: f64, y: f64) -> Color {
        match self {
            Fill::Solid(c) => *c,
            Fill::Linear { from, to, start, end } => {
                let (vx, vy) = (to.0 - from.0, to.1 - from.1);
                let len_sq = vx * vx + vy * vy;
                let t = if len_sq == 0.0 {
                    0.0
                } else {
                    ((x - from.0) * vx + (y - from.1) * vy) / len_sq
                };
                start.lerp(*end, t)
            }
            Fill::Radial { center, radius, start, end } => {
                let t = if *radius == 0.0 {
                    0.0
                } else {
                    ((x - center.0).powi(2) + (y - center.1).powi(2)).sqrt() / radius
                };
                start.lerp(*end, t)
            }
        }
    }
}

/// Pixel index range whose centres fall in `[from, to)`.
fn pixel_span(from: f64, to: f64, limit: u32) -> std::ops::Range<u32> {
    let first = (from - 0.5).ceil().max(0.0) as u32;
    let last = (to - 0.5).ceil().max(0.0) as u32;
    first.min(limit)..last.min(limit)
}

/// Background plus dark modules; no logo.
pub fn paint_grid(grid: &ModuleGrid, style: &StyleSpec) -> RgbaImage {
    let size = style.size;
    let mut canvas = RgbaImage::from_pixel(size, size, style.background.to_rgba());
    let fill = Fill::for_style(style);
    let module_size = size as f64 / grid.size() as f64;

    for (row, col) in grid.dark_cells() {
        let x0 = col as f64 * module_size;
        let y0 = row as f64 * module_size;
        for y in pixel_span(y0, y0 + module_size, size) {
            for x in pixel_span(x0, x0 + module_size, size) {
                let color = fill.color_at(x as f64 + 0.5, y as f64 + 0.5);
                canvas.put_pixel(x, y, color.to_rgba());
            }
        }
    }

    canvas
}

/// Closed outline of a rectangle with quadratic-Bezier corners, flattened.
pub fn rounded_rect_path(x: f64, y: f64, w: f64, h: f64, radius: f64) -> Vec<(f64, f64)> {
    let r = radius.max(0.0).min(w / 2.0).min(h / 2.0);
    if r == 0.0 {
        return vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
    }

    // (start, control, end) of each corner, clockwise from top-right
    let corners = [
        ((x + w - r, y), (x + w, y), (x + w, y + r)),
        ((x + w, y + h - r), (x + w, y + h), (x + w - r, y + h)),
        ((x + r, y + h), (x, y + h), (x, y + h - r)),
        ((x, y + r), (x, y), (x + r, y)),
    ];

    let mut points = Vec::with_capacity(corners.len() * (CURVE_STEPS + 1));
    for (p0, c, p1) in corners {
        points.push(p0);
        for step in 1..=CURVE_STEPS {
            let t = step as f64 / CURVE_STEPS as f64;
            let mt = 1.0 - t;
            points.push((
                mt * mt * p0.0 + 2.0 * mt * t * c.0 + t * t * p1.0,
                mt * mt * p0.1 + 2.0 * mt * t * c.1 + t * t * p1.1,
            ));
        }
    }
    points
}

/// Even-odd point in polygon test.
pub fn contains(path: &[(f64, f64)], px: f64, py: f64) -> bool {
    let mut inside = false;
    let mut j = path.len().wrapping_sub(1);
    for i in 0..path.len() {
        let (xi, yi) = path[i];
        let (xj, yj) = path[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn fill_path(canvas: &mut RgbaImage, path: &[(f64, f64)], color: Rgba<u8>) {
    let (min_y, max_y) = path.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    let (min_x, max_x) = path.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let (w, h) = canvas.dimensions();

    for y in pixel_span(min_y, max_y, h) {
        for x in pixel_span(min_x, max_x, w) {
            if contains(path, x as f64 + 0.5, y as f64 + 0.5) {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: &Rgba<u8>) {
    let alpha = src.0[3] as u32;
    for i in 0..3 {
        let mixed = (src.0[i] as u32 * alpha + dst.0[i] as u32 * (255 - alpha) + 127) / 255;
        dst.0[i] = mixed as u8;
    }
    dst.0[3] = 255;
}

/// Composite a decoded logo at the canvas centre.
pub fn overlay_logo(canvas: &mut RgbaImage, logo: &RgbaImage, spec: &LogoSpec) {
    let size = canvas.width() as f64;
    let logo_size = size * spec.size_ratio;
    let origin = (size - logo_size) / 2.0;
    let margin = spec.margin as f64;
    let radius = spec.border_radius as f64;

    let backing = rounded_rect_path(
        origin - margin,
        origin - margin,
        logo_size + margin * 2.0,
        logo_size + margin * 2.0,
        radius,
    );
    fill_path(canvas, &backing, spec.background.to_rgba());

    let side = logo_size.round().max(1.0) as u32;
    let scaled = imageops::resize(logo, side, side, FilterType::Triangle);
    let clip = rounded_rect_path(origin, origin, logo_size, logo_size, radius);
    let left = origin.round() as i64;

    for (lx, ly, src) in scaled.enumerate_pixels() {
        let x = left + lx as i64;
        let y = left + ly as i64;
        if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
            continue;
        }
        if radius > 0.0 && !contains(&clip, x as f64 + 0.5, y as f64 + 0.5) {
            continue;
        }
        blend(canvas.get_pixel_mut(x as u32, y as u32), src);
    }
}

/// Full composite: grid, then logo when one is supplied.
pub fn render(grid: &ModuleGrid, style: &StyleSpec, logo: Option<&RgbaImage>) -> RgbaImage {
    let mut canvas = paint_grid(grid, style);
    if let (Some(image), Some(spec)) = (logo, style.logo.as_ref()) {
        overlay_logo(&mut canvas, image, spec);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::{paint, qr_grid};
    use crate::grid::{is_dark_pixel, reconstruct};
    use crate::style::{Gradient, LogoSpec};

    fn gradient_style(kind: GradientKind) -> StyleSpec {
        StyleSpec {
            gradient: Gradient {
                kind,
                angle: 30.0,
                ..Gradient::default()
            },
            ..StyleSpec::default()
        }
    }

    #[test]
    fn test_linear_fill_endpoints() {
        let fill = Fill::for_style(&gradient_style(GradientKind::Linear));
        let style = gradient_style(GradientKind::None);
        let Fill::Linear { from, to, start, end } = fill.clone() else {
            panic!("expected linear fill");
        };
        assert_eq!(fill.color_at(from.0, from.1), start);
        assert_eq!(fill.color_at(to.0, to.1), end);
        assert_eq!(Fill::for_style(&style), Fill::Solid(Color::BLACK));
    }

    #[test]
    fn test_radial_fill_centre_and_edge() {
        let fill = Fill::for_style(&gradient_style(GradientKind::Radial));
        let g = Gradient::default();
        assert_eq!(fill.color_at(100.0, 100.0), g.start);
        assert_eq!(fill.color_at(200.0, 100.0), g.end);
        assert_eq!(fill.color_at(0.0, 0.0), g.end);
    }

    #[test]
    fn test_pixel_span_uses_centres() {
        assert_eq!(pixel_span(0.0, 8.0, 200), 0..8);
        assert_eq!(pixel_span(1.5, 3.0, 200), 1..3);
        assert_eq!(pixel_span(190.0, 210.0, 200), 190..200);
    }

    #[test]
    fn test_styling_is_deterministic() {
        let grid = qr_grid("determinism", 3);
        let style = gradient_style(GradientKind::Radial);
        assert_eq!(render(&grid, &style, None), render(&grid, &style, None));
    }

    #[test]
    fn test_gradient_changes_color_not_topology() {
        let grid = qr_grid("topology", 2);
        let solid = paint_grid(&grid, &gradient_style(GradientKind::None));
        let linear = paint_grid(&grid, &gradient_style(GradientKind::Linear));
        assert_ne!(solid, linear);
        for (a, b) in solid.pixels().zip(linear.pixels()) {
            assert_eq!(is_dark_pixel(a), is_dark_pixel(b));
        }
    }

    #[test]
    fn test_styled_output_reconstructs_to_same_grid() {
        let grid = qr_grid("idempotent", 2);
        let source = paint(&grid, 200);
        let first = reconstruct(&source).unwrap();
        let styled = paint_grid(&first, &gradient_style(GradientKind::Linear));
        assert_eq!(reconstruct(&styled).unwrap(), first);
        assert_eq!(first, grid);
    }

    #[test]
    fn test_rounded_path_excludes_corners() {
        let path = rounded_rect_path(0.0, 0.0, 20.0, 20.0, 8.0);
        assert!(contains(&path, 10.0, 10.0));
        assert!(contains(&path, 10.0, 0.5));
        assert!(!contains(&path, 0.5, 0.5));
        assert!(!contains(&path, 19.5, 19.5));

        let square = rounded_rect_path(0.0, 0.0, 20.0, 20.0, 0.0);
        assert!(contains(&square, 0.5, 0.5));
    }

    #[test]
    fn test_logo_overlay_paints_centre() {
        let grid = qr_grid("logo", 2);
        let mut style = StyleSpec::default();
        let mut spec = LogoSpec::new(vec![]);
        spec.margin = 4;
        spec.border_radius = 6;
        style.logo = Some(spec);

        let red = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
        let out = render(&grid, &style, Some(&red));

        assert_eq!(out.get_pixel(100, 100), &Rgba([255, 0, 0, 255]));
        // backing square just outside the logo
        assert_eq!(out.get_pixel(78, 100), &Rgba([255, 255, 255, 255]));
        // outside the backing the grid is untouched
        let bare = paint_grid(&grid, &style);
        assert_eq!(out.get_pixel(10, 10), bare.get_pixel(10, 10));
    }
}

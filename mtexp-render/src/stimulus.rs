use anyhow::{Result, anyhow};
use mtexp_core::{Cue, Grid};
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

const RED: [u8; 4] = [0xff, 0x00, 0x00, 0xff];
const BLUE: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

/// Geometry of the rasterised grid, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStyle {
    pub spacing: f32,
    pub line_length: f32,
    pub line_width: f32,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            spacing: 25.0,
            line_length: 20.0,
            line_width: 2.0,
        }
    }
}

impl GridStyle {
    pub fn image_size(&self, grid: &Grid) -> (u32, u32) {
        (
            (grid.width() as f32 * self.spacing).ceil() as u32,
            (grid.height() as f32 * self.spacing).ceil() as u32,
        )
    }
}

fn cue_color(cue: Cue) -> Option<[u8; 4]> {
    match cue {
        Cue::None => None,
        Cue::HorizontalDistractor | Cue::VerticalTarget => Some(RED),
        Cue::VerticalDistractor => Some(BLUE),
    }
}

/// Draws every cue as a line centred in its cell on a transparent pixmap
pub fn rasterize_grid(grid: &Grid, style: &GridStyle) -> Result<Pixmap> {
    let (width, height) = style.image_size(grid);
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot allocate {width}x{height} stimulus pixmap"))?;

    let stroke = Stroke {
        width: style.line_width,
        ..Stroke::default()
    };
    let half = style.line_length / 2.0;

    for (x, y, cue) in grid.cells() {
        let Some(color) = cue_color(cue) else {
            continue;
        };
        let cx = x as f32 * style.spacing + style.spacing / 2.0;
        let cy = y as f32 * style.spacing + style.spacing / 2.0;

        let mut pb = PathBuilder::new();
        if cue.is_vertical() {
            pb.move_to(cx, cy - half);
            pb.line_to(cx, cy + half);
        } else {
            pb.move_to(cx - half, cy);
            pb.line_to(cx + half, cy);
        }
        let path = pb
            .finish()
            .ok_or_else(|| anyhow!("degenerate line at cell ({x}, {y})"))?;

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    Ok(pixmap)
}

/// White cross shown on every non-stimulus frame
pub fn fixation_cross(size: u32, thickness: u32) -> Result<Pixmap> {
    let mut pm =
        Pixmap::new(size, size).ok_or_else(|| anyhow!("cannot allocate {size}px fixation"))?;

    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(Color::WHITE);

    let (s, t) = (size as f32, thickness as f32);
    let bars = [
        Rect::from_xywh(0.0, (s - t) * 0.5, s, t),
        Rect::from_xywh((s - t) * 0.5, 0.0, t, s),
    ];
    for bar in bars {
        let bar = bar.ok_or_else(|| anyhow!("fixation bar out of range"))?;
        pm.fill_rect(bar, &paint, Transform::identity(), None);
    }
    Ok(pm)
}

/// Opaque filled rectangle, used for feedback and prompt markers
pub fn solid_bar(width: u32, height: u32, rgba: [u8; 4]) -> Result<Pixmap> {
    let mut pm = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot allocate {width}x{height} bar"))?;
    pm.fill(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
    Ok(pm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_center(x: usize, y: usize) -> (u32, u32) {
        (x as u32 * 25 + 12, y as u32 * 25 + 12)
    }

    fn alpha_at(pm: &Pixmap, x: u32, y: u32) -> u8 {
        pm.pixel(x, y).map_or(0, |p| p.alpha())
    }

    #[test]
    fn image_covers_whole_grid() {
        let pm = rasterize_grid(&Grid::empty(8, 8), &GridStyle::default()).expect("raster");
        assert_eq!((pm.width(), pm.height()), (200, 200));
        assert!(pm.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn cues_have_orientation_and_colour() {
        let mut grid = Grid::empty(8, 8);
        grid.set(1, 1, Cue::HorizontalDistractor);
        grid.set(3, 4, Cue::VerticalTarget);
        grid.set(6, 2, Cue::VerticalDistractor);
        let pm = rasterize_grid(&grid, &GridStyle::default()).expect("raster");

        let (hx, hy) = cell_center(1, 1);
        assert!(alpha_at(&pm, hx + 7, hy) > 200);
        assert_eq!(alpha_at(&pm, hx, hy + 7), 0);

        let (tx, ty) = cell_center(3, 4);
        let target = pm.pixel(tx, ty + 7).expect("pixel");
        assert!(target.alpha() > 200);
        assert!(target.red() > 200 && target.blue() == 0);
        assert_eq!(alpha_at(&pm, tx + 7, ty), 0);

        let (vx, vy) = cell_center(6, 2);
        let distractor = pm.pixel(vx, vy - 7).expect("pixel");
        assert!(distractor.blue() > 200 && distractor.red() == 0);

        assert_eq!(alpha_at(&pm, 12, 190), 0);
    }

    #[test]
    fn fixation_is_centred() {
        let pm = fixation_cross(10, 2).expect("fixation");
        assert_eq!(alpha_at(&pm, 5, 5), 255);
        assert_eq!(alpha_at(&pm, 4, 0), 255);
        assert_eq!(alpha_at(&pm, 0, 4), 255);
        assert_eq!(alpha_at(&pm, 0, 0), 0);
        assert_eq!(alpha_at(&pm, 9, 9), 0);
    }

    #[test]
    fn empty_grid_cannot_be_rasterised() {
        assert!(rasterize_grid(&Grid::empty(0, 8), &GridStyle::default()).is_err());
    }
}

use crate::stimulus::{GridStyle, fixation_cross, rasterize_grid, solid_bar};
use anyhow::{Result, anyhow, ensure};
use bytemuck::{cast_slice, cast_slice_mut};
use mtexp_core::{Grid, Screen};
use mtexp_timing::Clock;
use std::time::Duration;
use tiny_skia::{Color, Pixmap, Rect};

#[repr(usize)]
#[derive(Debug, Clone, Copy)]
enum CacheIndex {
    Fixation = 0,
    Correct = 1,
    Incorrect = 2,
    Prompt = 3,
}

impl CacheIndex {
    const STATIC_COUNT: usize = 4;
}

const CORRECT: [u8; 4] = [0x40, 0xff, 0x40, 0xff];
const INCORRECT: [u8; 4] = [0xff, 0x40, 0x40, 0xff];
const PROMPT: [u8; 4] = [0xff, 0xff, 0xff, 0xff];

/// Per-frame timing breakdown
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

pub trait Renderer {
    fn clear_dirty(&mut self, dirty: &[Rect]);
    fn blit_cached(&mut self, index: usize, pos: (f32, f32));
}

pub trait ScreenRenderer: Renderer {
    fn render_screen(&mut self, screen: &Screen<'_>) -> Result<()>;
}

/// Composes session screens onto an opaque RGBA canvas.
///
/// Only regions drawn on the previous or current frame are cleared and
/// copied to the output buffer. Because the canvas stays opaque, its
/// premultiplied pixels can be copied to a straight-alpha frame unchanged.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    style: GridStyle,

    static_cache: Vec<Pixmap>,
    // Rasterised once per trial, re-blitted every stimulus tick
    stimulus: Option<(u64, Pixmap)>,

    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,
    clear_buffer: Vec<u8>,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_style(width, height, GridStyle::default())
    }

    pub fn with_style(width: u32, height: u32, style: GridStyle) -> Result<Self> {
        let mut renderer = SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            style,
            static_cache: Vec::with_capacity(CacheIndex::STATIC_COUNT),
            stimulus: None,
            canvas: blank_canvas(width, height)?,
            dirty_regions: Vec::with_capacity(16),
            first_frame: true,
            clear_buffer: clear_buffer(width, height),
        };
        renderer.init_cache()?;
        Ok(renderer)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas = blank_canvas(width, height)?;
        self.width = width;
        self.height = height;
        self.center = (width as f32 / 2.0, height as f32 / 2.0);
        self.clear_buffer = clear_buffer(width, height);
        self.dirty_regions.clear();
        self.first_frame = true;
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn init_cache(&mut self) -> Result<()> {
        self.static_cache = vec![
            fixation_cross(10, 2)?,
            solid_bar(120, 8, CORRECT)?,
            solid_bar(120, 8, INCORRECT)?,
            solid_bar(60, 4, PROMPT)?,
        ];
        Ok(())
    }

    fn prepare_stimulus(&mut self, trial_index: u64, grid: &Grid) -> Result<()> {
        if self.stimulus.as_ref().is_some_and(|(idx, _)| *idx == trial_index) {
            return Ok(());
        }
        let pixmap = rasterize_grid(grid, &self.style)?;
        self.stimulus = Some((trial_index, pixmap));
        Ok(())
    }

    fn below_center(&self) -> (f32, f32) {
        (self.center.0, self.center.1 + 60.0)
    }

    fn copy_dirty_region(&self, dirty: Rect, frame_buffer: &mut [u8]) {
        let Some((x0, y0, x1, y1)) = self.clamp(dirty) else {
            return;
        };
        let row_bytes = self.width as usize * 4;
        let canvas_data = self.canvas.data();
        for row in y0..y1 {
            let start = row * row_bytes + x0 * 4;
            let end = row * row_bytes + x1 * 4;
            frame_buffer[start..end].copy_from_slice(&canvas_data[start..end]);
        }
    }

    fn clamp(&self, rect: Rect) -> Option<(usize, usize, usize, usize)> {
        let (w, h) = (self.width as f32, self.height as f32);
        let x0 = rect.x().floor().clamp(0.0, w) as usize;
        let y0 = rect.y().floor().clamp(0.0, h) as usize;
        let x1 = (rect.x() + rect.width()).ceil().clamp(0.0, w) as usize;
        let y1 = (rect.y() + rect.height()).ceil().clamp(0.0, h) as usize;
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }

    fn coalesce_dirty(rects: &mut Vec<Rect>) {
        rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
        let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
        for r in rects.drain(..) {
            if let Some(last) = out.last_mut() {
                let same_row =
                    (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
                let touching = r.x() <= last.x() + last.width() + 1.0;
                if same_row && touching {
                    let nx = last.x().min(r.x());
                    let nx2 = (last.x() + last.width()).max(r.x() + r.width());
                    if let Some(merged) = Rect::from_xywh(nx, last.y(), nx2 - nx, last.height()) {
                        *last = merged;
                        continue;
                    }
                }
            }
            out.push(r);
        }
        *rects = out;
    }

    /// Draws `screen` and copies every changed region into `frame_buffer`,
    /// which must be a `width * height` RGBA8 buffer.
    pub fn render_frame<C: Clock>(
        &mut self,
        screen: &Screen<'_>,
        frame_buffer: &mut [u8],
        clock: &C,
    ) -> Result<FrameStats> {
        ensure!(
            frame_buffer.len() == self.clear_buffer.len(),
            "frame buffer holds {} bytes, canvas needs {}",
            frame_buffer.len(),
            self.clear_buffer.len()
        );
        let started = clock.now();

        if self.first_frame {
            self.first_frame = false;
            self.canvas.fill(Color::BLACK);
            frame_buffer.copy_from_slice(&self.clear_buffer);
            self.dirty_regions.clear();
        }

        let old_dirty = std::mem::take(&mut self.dirty_regions);
        let t = clock.now();
        Renderer::clear_dirty(self, &old_dirty);
        let clear = clock.elapsed(t);

        let t = clock.now();
        self.render_screen(screen)?;
        let draw = clock.elapsed(t);

        let mut present = old_dirty;
        present.extend_from_slice(&self.dirty_regions);
        Self::coalesce_dirty(&mut present);

        let t = clock.now();
        for rect in &present {
            self.copy_dirty_region(*rect, frame_buffer);
        }
        let copy = clock.elapsed(t);

        Ok(FrameStats {
            clear,
            draw,
            copy,
            total: clock.elapsed(started),
            dirty_count: self.dirty_regions.len(),
        })
    }

    fn blit_stimulus(&mut self) {
        if let Some((_, pixmap)) = &self.stimulus {
            if let Some(rect) = blit_centered(&mut self.canvas, pixmap, self.center) {
                self.dirty_regions.push(rect);
            }
        }
    }
}

impl Renderer for SkiaRenderer {
    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let stride = self.width as usize * 4;
        for rect in dirty {
            let Some((x0, y0, x1, y1)) = self.clamp(*rect) else {
                continue;
            };
            let canvas_data = self.canvas.data_mut();
            for y in y0..y1 {
                let start = y * stride + x0 * 4;
                let end = y * stride + x1 * 4;
                canvas_data[start..end].copy_from_slice(&self.clear_buffer[start..end]);
            }
        }
    }

    fn blit_cached(&mut self, index: usize, pos: (f32, f32)) {
        let Some(pixmap) = self.static_cache.get(index) else {
            return;
        };
        if let Some(rect) = blit_centered(&mut self.canvas, pixmap, pos) {
            self.dirty_regions.push(rect);
        }
    }
}

impl ScreenRenderer for SkiaRenderer {
    fn render_screen(&mut self, screen: &Screen<'_>) -> Result<()> {
        match screen {
            Screen::Greeting { last_correct } => {
                self.blit_cached(CacheIndex::Fixation as usize, self.center);
                if let Some(correct) = last_correct {
                    let marker = if *correct {
                        CacheIndex::Correct
                    } else {
                        CacheIndex::Incorrect
                    };
                    self.blit_cached(marker as usize, self.below_center());
                }
            }
            Screen::Blank => {
                self.blit_cached(CacheIndex::Fixation as usize, self.center);
            }
            Screen::Stimulus { trial_index, grid } => {
                self.prepare_stimulus(*trial_index, grid)
                    .map_err(|e| anyhow!("stimulus for trial {trial_index}: {e}"))?;
                self.blit_stimulus();
            }
            Screen::Response { .. } => {
                self.blit_cached(CacheIndex::Fixation as usize, self.center);
                self.blit_cached(CacheIndex::Prompt as usize, self.below_center());
            }
            Screen::Done => {}
        }
        Ok(())
    }
}

fn blank_canvas(width: u32, height: u32) -> Result<Pixmap> {
    let mut canvas =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("cannot allocate {width}x{height} canvas"))?;
    canvas.fill(Color::BLACK);
    Ok(canvas)
}

fn clear_buffer(width: u32, height: u32) -> Vec<u8> {
    [0u8, 0, 0, 255]
        .into_iter()
        .cycle()
        .take(width as usize * height as usize * 4)
        .collect()
}

/// Source-over blit of `src` centred on `pos`, clipped to the canvas.
/// Returns the touched region.
fn blit_centered(canvas: &mut Pixmap, src: &Pixmap, pos: (f32, f32)) -> Option<Rect> {
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);

    let x0 = (pos.0 - sw as f32 * 0.5).floor() as i64;
    let y0 = (pos.1 - sh as f32 * 0.5).floor() as i64;

    let dst_x = x0.max(0);
    let dst_y = y0.max(0);
    let dst_x_end = (x0 + sw).min(cw);
    let dst_y_end = (y0 + sh).min(ch);
    if dst_x_end <= dst_x || dst_y_end <= dst_y {
        return None;
    }

    let src_x = (dst_x - x0) as usize;
    let src_y = (dst_y - y0) as usize;
    let copy_w = (dst_x_end - dst_x) as usize;
    let copy_h = (dst_y_end - dst_y) as usize;
    let (dst_x, dst_y) = (dst_x as usize, dst_y as usize);

    let src_stride = sw as usize;
    let dst_stride = cw as usize;
    let src_px: &[[u8; 4]] = cast_slice(src.data());
    let dst_px: &mut [[u8; 4]] = cast_slice_mut(canvas.data_mut());

    for row in 0..copy_h {
        let s0 = (src_y + row) * src_stride + src_x;
        let d0 = (dst_y + row) * dst_stride + dst_x;
        let src_row = &src_px[s0..s0 + copy_w];
        let dst_row = &mut dst_px[d0..d0 + copy_w];

        if src_row.iter().all(|p| p[3] == 255) {
            dst_row.copy_from_slice(src_row);
            continue;
        }
        for (d, s) in dst_row.iter_mut().zip(src_row) {
            let inv = 255 - s[3] as u32;
            if inv == 255 {
                continue;
            }
            // Premultiplied source-over
            for c in 0..4 {
                d[c] = (s[c] as u32 + (d[c] as u32 * inv + 127) / 255).min(255) as u8;
            }
        }
    }

    Rect::from_xywh(dst_x as f32, dst_y as f32, copy_w as f32, copy_h as f32)
}

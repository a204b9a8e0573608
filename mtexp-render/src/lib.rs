pub mod export;
pub mod render;
pub mod stimulus;

pub use export::PngExporter;
pub use render::{FrameStats, Renderer, ScreenRenderer, SkiaRenderer};
pub use stimulus::{GridStyle, fixation_cross, rasterize_grid, solid_bar};

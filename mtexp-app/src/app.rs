use anyhow::{Result, anyhow};
use mtexp_core::{Answer, ResultSink};
use mtexp_experiment::{ExperimentConfig, Identity, Input, SessionFlow};
use mtexp_render::{PngExporter, SkiaRenderer};
use mtexp_timing::{Clock, MonotonicClock, TickRecorder};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

type Flow = SessionFlow<Box<dyn ResultSink>, StdRng>;

/// Maps a pressed key to a session input
pub fn input_for(key: KeyCode) -> Option<Input> {
    match key {
        KeyCode::Space => Some(Input::Advance),
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(Input::Respond(Answer::Yes)),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some(Input::Respond(Answer::No)),
        KeyCode::Escape => Some(Input::Shutdown),
        _ => None,
    }
}

/// Moves the session to `Done`, logging anything that fails on the way
fn close_session(flow: &mut Flow) {
    if let Err(e) = flow.handle(Input::Shutdown) {
        error!("shutdown could not be recorded: {e}");
    }
    info!(
        trials = flow.state().trial_index(),
        recorded = flow.recorder().emitted(),
        "session finished"
    );
}

/// Window host: one session poll and one rendered frame per redraw
pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    flow: Flow,
    clock: MonotonicClock,
    ticks: TickRecorder,
    title: String,
    refresh_rate: Option<f64>,
    fatal: Option<anyhow::Error>,
}

impl App {
    pub fn new(
        config: ExperimentConfig,
        identity: Identity,
        sink: Box<dyn ResultSink>,
        exporter: Option<PngExporter>,
        rng: StdRng,
    ) -> Self {
        let mut flow = SessionFlow::new(config, identity, sink, rng);
        if let Some(exporter) = exporter {
            info!(directory = %exporter.directory().display(), "exporting stimulus images");
            flow = flow.with_exporter(Box::new(exporter));
        }

        Self {
            window: None,
            pixels: None,
            renderer: None,
            flow,
            clock: MonotonicClock,
            ticks: TickRecorder::new(),
            title: String::new(),
            refresh_rate: None,
            fatal: None,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "press SPACE to start a trial, 1/2 to answer, ESC to exit"
        );

        event_loop.run_app(&mut self)?;
        self.report_ticks();

        match self.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let attributes = Window::default_attributes()
            .with_title("mtexp")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.renderer = Some(SkiaRenderer::new(size.width, size.height)?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(window), Some(pixels), Some(renderer)) =
            (self.window.as_ref(), self.pixels.as_mut(), self.renderer.as_mut())
        else {
            return Ok(());
        };

        let now = self.clock.now();
        self.ticks.record_tick(now);

        let screen = self.flow.poll(now);
        let prompt = screen.prompt();
        if !prompt.is_empty() && prompt != self.title {
            info!("{prompt}");
            window.set_title(&prompt);
            self.title = prompt;
        }

        let stats = renderer.render_frame(&screen, pixels.frame_mut(), &self.clock)?;
        pixels.render()?;
        debug!(
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            total_ms = stats.total.as_secs_f64() * 1e3,
            dirty = stats.dirty_count,
            "frame"
        );

        window.request_redraw();
        Ok(())
    }

    fn handle_key(&mut self, event: KeyEvent, event_loop: &ActiveEventLoop) {
        if !event.state.is_pressed() || event.repeat {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(input) = input_for(code) else {
            return;
        };

        match self.flow.handle(input) {
            Ok(accepted) => debug!(?input, accepted, "input"),
            Err(e) => {
                error!("cannot record result: {e}");
                self.fail(anyhow::Error::new(e), event_loop);
                return;
            }
        }
        if self.flow.is_done() {
            self.exit(event_loop);
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(pixels) = self.pixels.as_mut() {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                warn!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(size.width, size.height) {
                warn!("failed to resize buffer: {e}");
            }
        }
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.resize(size.width, size.height) {
                warn!("failed to resize renderer: {e}");
            }
        }
        info!(width = size.width, height = size.height, "display resized");
    }

    fn fail(&mut self, e: anyhow::Error, event_loop: &ActiveEventLoop) {
        if self.fatal.is_none() {
            self.fatal = Some(e);
        }
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        close_session(&mut self.flow);
        event_loop.exit();
    }

    fn report_ticks(&self) {
        let stats = self.ticks.stats();
        if stats.samples == 0 {
            return;
        }
        info!(
            samples = stats.samples,
            effective_hz = stats.effective_hz,
            average_ms = stats.average_interval_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            phase_precision_ms = stats.phase_precision().as_secs_f64() * 1e3,
            "tick cadence"
        );
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!("failed to create window and surface: {e}");
                self.fail(e, event_loop);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    error!("frame failed: {e:#}");
                    self.fail(e, event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event, event_loop),
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_inputs() {
        assert_eq!(input_for(KeyCode::Space), Some(Input::Advance));
        assert_eq!(
            input_for(KeyCode::Digit1),
            Some(Input::Respond(Answer::Yes))
        );
        assert_eq!(
            input_for(KeyCode::Numpad2),
            Some(Input::Respond(Answer::No))
        );
        assert_eq!(input_for(KeyCode::Escape), Some(Input::Shutdown));
        assert_eq!(input_for(KeyCode::KeyY), None);
    }

    #[test]
    fn closing_mid_trial_ends_the_session() {
        use mtexp_core::ResultRecord;
        use rand::SeedableRng;

        let sink: Box<dyn ResultSink> = Box::new(Vec::<ResultRecord>::new());
        let mut flow = SessionFlow::new(
            ExperimentConfig::default(),
            Identity::new("pilot", 1_700_000_000),
            sink,
            StdRng::seed_from_u64(5),
        );
        assert!(flow.handle(Input::Advance).expect("advance"));

        close_session(&mut flow);
        assert!(flow.is_done());
        assert_eq!(flow.recorder().emitted(), 0);

        close_session(&mut flow);
        assert!(flow.is_done());
    }
}

//! Winit-based Viewer
//!
//! [`App`] configures and launches the interactive asteroid viewer on top of
//! the [winit](https://crates.io/crates/winit) windowing library.
//!
//! # Lifecycle
//!
//! 1. [`App::run`] creates the event loop and hands it an internal runner
//! 2. On `resumed` the runner opens the window, creates the surface and the
//!    GPU context, and builds the [`FrameRenderer`] from the asset directory
//! 3. Each `RedrawRequested` applies one frame of input to the camera and
//!    scene, renders into the surface texture and presents it
//! 4. Holding either mouse button hides and captures the cursor until release
//! 5. `Escape` or closing the window exits the loop
//!
//! A failure during setup stops the event loop and is returned from
//! [`App::run`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pbr_asteroid::app::winit::App;
//! use pbr_asteroid::renderer::RendererSettings;
//!
//! fn main() -> pbr_asteroid::errors::Result<()> {
//!     App::new()
//!         .with_settings(RendererSettings {
//!             msaa_samples: 4,
//!             ..Default::default()
//!         })
//!         .run()
//! }
//! ```

use std::sync::Arc;

use winit::application::ApplicationHandler;
use glam::Vec2;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::CursorGrabMode;
pub use winit::window::{Window, WindowId};

use crate::app::input::Input;
use crate::assets::AssetPaths;
use crate::errors::{PbrError, Result};
use crate::renderer::core::GpuContext;
use crate::renderer::{EnvironmentSettings, FrameRenderer, RendererSettings};
use crate::scene::{Camera, SceneSettings};
use crate::utils::FpsCounter;

pub mod input_adapter;

pub const WINDOW_TITLE: &str = "PBR asteroid (wgpu)";
pub const WINDOW_WIDTH: u32 = 960;
pub const WINDOW_HEIGHT: u32 = 540;

/// Window title carrying the measured frame rate.
#[must_use]
pub fn title_with_fps(title: &str, fps: f32) -> String {
    format!("{title}, {fps:.1} fps")
}

/// Hides and captures the cursor for a drag, or releases it.
///
/// Tries `Confined`, then `Locked`. Returns the grab mode in effect.
fn capture_cursor(window: &Window, capture: bool) -> CursorGrabMode {
    if !capture {
        if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("Failed to release cursor: {err}");
        }
        window.set_cursor_visible(true);
        return CursorGrabMode::None;
    }

    window.set_cursor_visible(false);
    for mode in [CursorGrabMode::Confined, CursorGrabMode::Locked] {
        match window.set_cursor_grab(mode) {
            Ok(()) => return mode,
            Err(err) => log::debug!("Cursor grab {mode:?} unavailable: {err}"),
        }
    }
    CursorGrabMode::None
}

/// Viewer builder.
///
/// # Example
///
/// ```rust,ignore
/// App::new()
///     .with_assets(AssetPaths::new("/opt/asteroid/data"))
///     .with_environment(EnvironmentSettings {
///         cube_size: 512,
///         ..Default::default()
///     })
///     .run()?;
/// ```
#[derive(Debug, Clone)]
pub struct App {
    title: String,
    settings: RendererSettings,
    environment: EnvironmentSettings,
    assets: AssetPaths,
    scene: SceneSettings,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: WINDOW_TITLE.into(),
            settings: RendererSettings::default(),
            environment: EnvironmentSettings::default(),
            assets: AssetPaths::default(),
            scene: SceneSettings::default(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RendererSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: EnvironmentSettings) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_assets(mut self, assets: AssetPaths) -> Self {
        self.assets = assets;
        self
    }

    /// Initial scene rotation and lights.
    #[must_use]
    pub fn with_scene(mut self, scene: SceneSettings) -> Self {
        self.scene = scene;
        self
    }

    /// Runs the viewer until the window closes.
    ///
    /// This method blocks; the event loop takes ownership of the current
    /// thread.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = AppRunner::new(self);
        event_loop.run_app(&mut runner)?;

        match runner.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU and scene state that lives as long as the window.
struct Viewer {
    window: Arc<Window>,
    ctx: GpuContext,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    renderer: FrameRenderer,
    camera: Camera,
    scene: SceneSettings,
    input: Input,
    cursor_captured: bool,
    grab: CursorGrabMode,
    fps: FpsCounter,
}

impl Viewer {
    fn new(window: Arc<Window>, app: &App) -> Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(Arc::clone(&window))?;
        let ctx = pollster::block_on(GpuContext::new(instance, Some(&surface), app.settings.power_preference))?;

        let mut config = surface
            .get_default_config(&ctx.adapter, width, height)
            .ok_or(PbrError::SurfaceUnsupported)?;
        // 优先使用 sRGB 格式，由硬件完成伽马编码
        let capabilities = surface.get_capabilities(&ctx.adapter);
        if let Some(&format) = capabilities.formats.iter().find(|f| f.is_srgb()) {
            config.format = format;
        }
        config.present_mode = if app.settings.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        surface.configure(&ctx.device, &config);
        log::info!(
            "Surface configured: {width}x{height}, {:?}, {:?}",
            config.format,
            config.present_mode
        );

        let renderer = FrameRenderer::from_assets(
            &ctx,
            &app.assets,
            &app.settings,
            &app.environment,
            config.format,
            width,
            height,
        )?;

        Ok(Self {
            window,
            ctx,
            surface,
            config,
            renderer,
            camera: Camera::new(width as f32 / height as f32),
            scene: app.scene,
            input: Input::new(),
            cursor_captured: false,
            grab: CursorGrabMode::None,
            fps: FpsCounter::new(),
        })
    }

    fn sync_cursor(&mut self) {
        let dragging = self.input.is_dragging();
        if dragging == self.cursor_captured {
            return;
        }
        self.cursor_captured = dragging;
        self.grab = capture_cursor(&self.window, dragging);
    }

    fn resize(&mut self, width: u32, height: u32) {
        // 最小化时尺寸为 0，保持原配置
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.ctx.device, &self.config);
        self.camera.set_aspect(width as f32 / height as f32);
    }

    fn redraw(&mut self, title: &str) {
        self.camera = self.camera.update(self.input.camera_deltas());
        self.input.apply_to_scene(&mut self.scene);
        self.input.end_frame();

        let output = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                self.surface.configure(&self.ctx.device, &self.config);
                return;
            }
            e => {
                log::warn!("Skipping frame: {e:?}");
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let stats = self.renderer.render(
            &self.ctx,
            &view,
            self.config.width,
            self.config.height,
            &self.camera,
            &self.scene,
        );
        if stats.reallocated > 0 {
            log::debug!("Reallocated {} attachments", stats.reallocated);
        }

        self.window.pre_present_notify();
        output.present();

        if let Some(fps) = self.fps.update() {
            self.window.set_title(&title_with_fps(title, fps));
        }
    }
}

/// Event loop handler.
struct AppRunner {
    app: App,
    viewer: Option<Viewer>,
    error: Option<PbrError>,
}

impl AppRunner {
    fn new(app: App) -> Self {
        Self {
            app,
            viewer: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: PbrError) {
        log::error!("Fatal Renderer Error: {err}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(&self.app.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };

        log::info!("Initializing Renderer Backend...");
        match Viewer::new(window, &self.app) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        input_adapter::process_window_event(&mut viewer.input, &event);
        viewer.sync_cursor();
        if viewer.input.exit_requested() {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                viewer.redraw(&self.app.title);
                viewer.window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };
        // 锁定模式下光标位置不再变化，改用原始位移
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event
            && viewer.grab == CursorGrabMode::Locked
        {
            viewer.input.mouse_motion(Vec2::new(dx as f32, dy as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &self.viewer {
            viewer.window.request_redraw();
        }
    }
}

use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::config::{Settings, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use crate::error::AppError;
use crate::gpu::{GpuContext, GridBuffers, RenderPipeline};
use crate::simulation::{Command, SimulationController, SystemClock};

const WINDOW_TITLE: &str = "Cyclic Cellular Automaton";

/// Share of the grid changed by one perturbation, in cells per thousand
const PERTURB_PER_MILLE: usize = 10;

/// What a key press asks for
enum KeyAction {
    Command(Command),
    Perturb,
    Quit,
}

/// Application state
pub struct App {
    settings: Settings,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    render_pipeline: Option<RenderPipeline>,
    grid_buffers: Option<GridBuffers>,
    bind_group: Option<wgpu::BindGroup>,
    controller: Option<SimulationController<SystemClock>>,
    /// Controller generation whose palette is currently on the GPU
    uploaded_generation: Option<u64>,
    title: String,
    error: Option<AppError>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            window: None,
            gpu: None,
            render_pipeline: None,
            grid_buffers: None,
            bind_group: None,
            controller: None,
            uploaded_generation: None,
            title: String::new(),
            error: None,
        }
    }

    /// Setup error that stopped the event loop, if any
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(
                DEFAULT_WINDOW_WIDTH,
                DEFAULT_WINDOW_HEIGHT,
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        log::info!("Creating GPU context...");
        let gpu = pollster::block_on(GpuContext::new(window.clone()))?;
        let render_pipeline = RenderPipeline::new(&gpu.device, gpu.format());

        let size = window.inner_size();
        let controller = SimulationController::new(
            self.settings.clone(),
            (size.width, size.height),
            SystemClock::new(),
        );

        log::info!("Controls:");
        log::info!("  +/-: Change scaling factor");
        log::info!("  ]/[: Add/remove a color");
        log::info!("  Space: Toggle palette (random colors / melting ice)");
        log::info!("  R: Restart");
        log::info!("  P: Perturb random cells");
        log::info!("  Escape: Quit");

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.render_pipeline = Some(render_pipeline);
        self.controller = Some(controller);
        Ok(())
    }

    /// Mirror the controller's grid and palette into GPU buffers
    fn sync_buffers(&mut self) {
        let (Some(gpu), Some(controller), Some(render)) =
            (&self.gpu, &self.controller, &self.render_pipeline)
        else {
            return;
        };

        let grid = controller.grid();
        if grid.is_empty() {
            self.grid_buffers = None;
            self.bind_group = None;
            self.uploaded_generation = None;
            return;
        }

        let color_count = controller.palette().len();
        let fits = self
            .grid_buffers
            .as_ref()
            .is_some_and(|b| b.fits(grid.rows(), grid.cols(), color_count));
        if !fits {
            let buffers = GridBuffers::new(&gpu.device, grid.rows(), grid.cols(), color_count);
            self.bind_group = Some(render.create_bind_group(&gpu.device, &buffers));
            self.grid_buffers = Some(buffers);
            self.uploaded_generation = None;
        }

        let Some(buffers) = &self.grid_buffers else {
            return;
        };
        if self.uploaded_generation != Some(controller.generation()) {
            buffers.write_palette(&gpu.queue, controller.palette());
            buffers.write_params(&gpu.queue, controller.scale());
            self.uploaded_generation = Some(controller.generation());
        }
        buffers.write_cells(&gpu.queue, grid.cells());
    }

    fn render(&mut self) {
        let (Some(gpu), Some(render)) = (&self.gpu, &self.render_pipeline) else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        render.draw(&mut encoder, &view, self.bind_group.as_ref());

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn update_title(&mut self) {
        let (Some(window), Some(controller)) = (&self.window, &self.controller) else {
            return;
        };
        let fps = controller.fps_text();
        let title = if fps.is_empty() {
            WINDOW_TITLE.to_string()
        } else {
            fps.to_string()
        };
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }
    }

    fn handle_key(&mut self, action: KeyAction) {
        let Some(controller) = &mut self.controller else {
            return;
        };
        log::debug!(
            "{:?} after {} steps, handling key",
            controller.state(),
            controller.steps()
        );
        match action {
            KeyAction::Command(command) => {
                controller.apply(command);
                log::info!(
                    "Scaling {}x, {} colors, {} palette",
                    controller.scale(),
                    controller.color_count(),
                    controller.strategy()
                );
            }
            KeyAction::Perturb => {
                let amount = (controller.grid().len() * PERTURB_PER_MILLE / 1000).max(1);
                log::debug!("Perturbing {} cells", amount);
                controller.perturb(amount);
            }
            KeyAction::Quit => return,
        }
        self.sync_buffers();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Quit),
        Key::Named(NamedKey::Space) => Some(KeyAction::Command(Command::TogglePalette)),
        Key::Character(c) => match c.as_str() {
            "+" | "=" => Some(KeyAction::Command(Command::ScaleUp)),
            "-" => Some(KeyAction::Command(Command::ScaleDown)),
            "]" => Some(KeyAction::Command(Command::MoreColors)),
            "[" => Some(KeyAction::Command(Command::FewerColors)),
            "r" | "R" => Some(KeyAction::Command(Command::Restart)),
            "p" | "P" => Some(KeyAction::Perturb),
            _ => None,
        },
        _ => None,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        log::info!("Initializing cyclic cellular automaton...");
        if let Err(e) = self.init(event_loop) {
            log::error!("Initialization failed: {}", e);
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !event.state.is_pressed() {
                    return;
                }
                log::debug!("Key pressed ({:?})", event.logical_key);
                match key_action(&event.logical_key) {
                    Some(KeyAction::Quit) => {
                        log::info!("Escape pressed, exiting...");
                        event_loop.exit();
                    }
                    Some(action) => self.handle_key(action),
                    None => {}
                }
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Window resized to {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size);
                }
                if let Some(controller) = &mut self.controller {
                    // Some platforms report the initial size as a resize
                    if controller.viewport() != (new_size.width, new_size.height) {
                        controller.resize(new_size.width, new_size.height);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.render(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(controller) = &mut self.controller else {
            return;
        };

        if controller.poll() {
            self.sync_buffers();
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
        self.update_title();

        let Some(controller) = &self.controller else {
            return;
        };
        match controller.next_deadline() {
            Some(deadline) => {
                let at = controller.clock().instant_at(deadline);
                event_loop.set_control_flow(ControlFlow::WaitUntil(at));
            }
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

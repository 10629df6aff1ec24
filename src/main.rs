mod app;
mod config;
mod error;
mod gpu;
mod simulation;

use winit::event_loop::EventLoop;

use crate::app::App;
use crate::config::Settings;
use crate::error::AppError;

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env();
    if let Some(seed) = settings.seed {
        log::info!("Using fixed seed {}", seed);
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings);
    event_loop.run_app(&mut app)?;

    match app.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

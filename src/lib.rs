pub mod app;
pub mod asset;
pub mod error;
pub mod io;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod settings;

use app::AppBuilder;
use winit::event_loop::EventLoop;

pub use error::{EngineError, LoadError};

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

pub fn run(builder: AppBuilder) -> Result<(), winit::error::EventLoopError> {
    init_logging();

    log::info!("Starting wgpu sprite renderer");

    let event_loop = EventLoop::new()?;
    let mut app = builder.build();

    let result = event_loop.run_app(&mut app);

    if let Err(ref err) = result {
        log::error!("Application error: {}", err);
    }

    log::info!("Application shutdown complete");

    result
}

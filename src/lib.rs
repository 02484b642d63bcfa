pub mod app;
mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod remote;
pub mod session;
pub mod stroke;
pub mod viewport;

pub use error::{AppError, AppResult};

/// Entrypoint used by UI shells and CLI bindings.
pub fn run() -> AppResult<app::App<remote::HttpProcessingClient>> {
    logging::init();
    tracing::info!("starting fishedit");

    let app = app::App::from_env_config();

    tracing::info!("startup complete");
    Ok(app)
}

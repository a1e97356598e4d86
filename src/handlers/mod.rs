//! One module per subcommand. Results go to stdout as JSON; logs go to stderr.

pub mod comments;
pub mod export;
pub mod nodes;
pub mod projects;
pub mod versions;

use figport::application::error::AppError;
use figport::config::Settings;
use figport::infra::http::FigmaClient;
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");
    Ok(())
}

pub fn client(settings: &Settings) -> Result<FigmaClient, AppError> {
    Ok(FigmaClient::from_settings(&settings.api)?)
}

use std::process;

use figport::{
    application::error::{AppError, ErrorReport},
    config::{self, Command},
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

mod handlers;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("figport", error);
    let log = || {
        error!(
            error = %error,
            causes = ?&report.messages[1..],
            "application error"
        );
    };

    if dispatcher::has_been_set() {
        log();
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, log);
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::Infra(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Export(args) => handlers::export::run(&settings, *args).await,
        Command::Nodes(args) => handlers::nodes::run(&settings, args).await,
        Command::Comments(args) => handlers::comments::run(&settings, args).await,
        Command::Projects(args) => handlers::projects::run(&settings, args).await,
        Command::Versions(args) => handlers::versions::run(&settings, args).await,
    }
}

//! Groundwork CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use groundwork::cli::{home_dir, parse_exit_code, Cli, ProvisionCommand};
use groundwork::requirements::probe::EnvironmentProbe;
use groundwork::ui::create_ui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for diagnostic logging.
///
/// `RUST_LOG` sets the filter; the default only shows warnings so the
/// terminal belongs to the status output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("groundwork=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = parse_exit_code(&e);
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    init_tracing();

    tracing::debug!("Groundwork starting with args: {:?}", cli);

    let home = match home_dir() {
        Ok(home) => home,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };
    let probe = EnvironmentProbe::run(&home);
    let command = ProvisionCommand::new(cli, &home, probe);
    let mut ui = create_ui(command.interactive());

    match command.execute(ui.as_mut()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            if let Some(hint) = e.hint() {
                ui.show_hint(&hint);
            }
            ExitCode::from(1)
        }
    }
}

use duwdu_portal::{
    Portal, Services,
    config::{AppConfig, Env},
    handlers::{self, Command},
};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point for the terminal front-end: loads configuration, installs
/// logging, builds the HTTP services and runs the command loop on stdin.
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    // 2. Logging. Goes to stderr so it never interleaves with the UI on stdout.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "duwdu_portal=debug".into());
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    tracing::info!(
        env = ?config.env,
        auth_gate = config.auth_gate,
        wire_format = ?config.wire_format,
        "portal starting"
    );

    // 3. Remote collaborators
    let services = match Services::from_config(&config) {
        Ok(services) => services,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP clients");
            return ExitCode::FAILURE;
        }
    };

    // 4. Command loop
    let mut portal = Portal::new(config);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let banner = if portal.is_open() {
        "DUWDU1. Введите help для списка команд."
    } else {
        "DUWDU1. Введите код доступа (code <код>) или войдите (login <логин> <пароль>)."
    };
    if write_lines(&mut stdout, &[banner.to_string()]).await.is_err() {
        return ExitCode::FAILURE;
    }

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                return ExitCode::FAILURE;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let output = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => match handlers::handle(&mut portal, &services, command).await {
                Ok(output) => output,
                Err(e) => vec![format!("❌ Ошибка: {e}")],
            },
            Err(e) => vec![format!("⚠️ {e}")],
        };

        if write_lines(&mut stdout, &output).await.is_err() {
            return ExitCode::FAILURE;
        }
    }

    tracing::info!("portal stopped");
    ExitCode::SUCCESS
}

async fn write_lines(stdout: &mut tokio::io::Stdout, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await
}

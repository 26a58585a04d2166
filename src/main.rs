use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payment_service::application::supervisor::WorkerSupervisor;
use payment_service::application::worker::Worker;
use payment_service::config::{Cli, Command, ServiceArgs};
use payment_service::domain::worker::WorkerIdentity;
use payment_service::infrastructure::consul::ConsulClient;
use payment_service::infrastructure::postgres::PgConnector;
use payment_service::infrastructure::process::ProcessSpawner;
use payment_service::logging;
use std::sync::Arc;
use tokio::signal;
use tracing::{Instrument, error, info, info_span};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.service.log_config());

    match cli.command.unwrap_or(Command::Supervise) {
        Command::Supervise => supervise(&cli.service).await,
        Command::Worker { worker_id } => {
            let span = info_span!("worker", id = %worker_id);
            run_worker(&cli.service, worker_id)
                .instrument(span)
                .await
                .into_diagnostic()
        }
    }
}

async fn supervise(args: &ServiceArgs) -> Result<()> {
    let mut spawner = ProcessSpawner::current_exe(args.worker_args()).into_diagnostic()?;
    if let Some(token) = &args.registry_token {
        spawner = spawner.with_env("CONSUL_HTTP_TOKEN", token.clone());
    }

    info!(
        pid = std::process::id(),
        base_port = args.base_port,
        "master process running"
    );
    WorkerSupervisor::new(Arc::new(spawner), args.worker_count())
        .run(shutdown_signal())
        .await
        .into_diagnostic()
}

async fn run_worker(
    args: &ServiceArgs,
    worker_id: WorkerIdentity,
) -> payment_service::error::Result<()> {
    let spec = args.worker_spec(worker_id)?;
    let registry = ConsulClient::new(args.registry_url.clone())?
        .with_token(args.registry_token.clone());
    let connector = PgConnector::new(args.max_connections);

    // Nothing is bound yet if this fails; the supervisor starts a replacement.
    let worker = Worker::new(spec, Arc::new(registry), Arc::new(connector))
        .start()
        .await
        .inspect_err(|err| error!(error = %err, "worker startup failed"))?;

    worker.serve(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}

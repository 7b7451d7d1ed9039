use crate::cli::ServeArgs;
use crate::infra::{
    admin_audience_from_env, AppState, EnvPaymentGateway, InMemoryApplicationRepository,
    InMemoryEarningsLedger, InMemoryNotifier, InMemoryPaymentRepository,
    InMemoryProjectRepository, LocalFileStore,
};
use crate::routes::marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campuslance::config::AppConfig;
use campuslance::error::AppError;
use campuslance::telemetry;
use campuslance::workflows::payments::PaymentCoordinator;
use campuslance::workflows::projects::applications::SelectionCoordinator;
use campuslance::workflows::projects::submissions::WorkSubmissionCoordinator;
use campuslance::workflows::projects::{ExpirySweeper, ProjectCatalog};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let projects = Arc::new(InMemoryProjectRepository::default());
    let applications = Arc::new(InMemoryApplicationRepository::default());
    let payments = Arc::new(InMemoryPaymentRepository::default());
    let ledger = Arc::new(InMemoryEarningsLedger::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    let gateway = Arc::new(EnvPaymentGateway::from_env());
    let files = Arc::new(LocalFileStore);
    let admins = admin_audience_from_env();

    let catalog = Arc::new(ProjectCatalog::new(
        projects.clone(),
        config.marketplace.max_revisions,
    ));
    let selection = Arc::new(SelectionCoordinator::new(
        projects.clone(),
        applications.clone(),
        notifier.clone(),
    ));
    let payment_coordinator = Arc::new(PaymentCoordinator::new(
        projects.clone(),
        payments,
        gateway,
        ledger,
        notifier.clone(),
        admins.clone(),
        config.marketplace.platform_fee_percent,
    ));
    let workspace = Arc::new(WorkSubmissionCoordinator::new(
        projects.clone(),
        payment_coordinator.clone(),
        files,
        notifier.clone(),
        admins,
    ));

    let sweeper = ExpirySweeper::new(projects, applications, notifier);
    let sweep_period = Duration::from_secs(config.marketplace.expiry_sweep_hours * 3600);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_period);
        // The first tick fires immediately; skip it so startup is quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sweeper.sweep(Utc::now()) {
                Ok(report) => info!(
                    closed = report.projects_closed,
                    rejected = report.applications_rejected,
                    "scheduled expiry sweep completed"
                ),
                Err(err) => warn!(%err, "scheduled expiry sweep failed"),
            }
        }
    });

    let app = marketplace_routes(catalog, selection, workspace, payment_coordinator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campuslance marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}

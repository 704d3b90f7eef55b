use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use courier_assignment::{
    AssignmentBackend, AssignmentLifecycle, AssignmentStatus, HttpAssignmentBackend, Session,
    TransitionPayload,
};
use courier_core::config::{LogFormat, LoggingConfig};
use courier_core::geo::decode_polyline;
use courier_core::{AppConfig, GeoPoint, TravelMode};
use courier_location::{LocationTracker, ReplayLocationProvider, TrackerConfig};
use courier_map::{
    ControllerConfig, DeliveryMapController, HttpPositionReporter, LogMapEngine,
    LogPositionReporter, PositionReporter,
};
use courier_route::{GoongRoutingProvider, RouteService};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Courier delivery core: assignments, routes and live tracking
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/courier.yaml")]
    config: PathBuf,

    /// Backend access token
    #[arg(long, env = "COURIER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode an encoded polyline into points
    Decode { polyline: String },

    /// Compute a route between two points
    Route {
        /// Origin as "lat,lng"
        #[arg(long)]
        from: GeoPoint,
        /// Destination as "lat,lng"
        #[arg(long)]
        to: GeoPoint,
        /// Travel mode (car, bike, taxi, truck); defaults to the configured mode
        #[arg(long)]
        mode: Option<TravelMode>,
    },

    /// Query shipping assignments
    Assignments {
        #[command(subcommand)]
        query: AssignmentQuery,
    },

    /// Accept a pending assignment
    Accept { id: String },

    /// Move an assignment to a new status
    Update {
        id: String,
        /// Target status, e.g. PICKED_UP or DELIVERED
        status: AssignmentStatus,
        #[arg(long)]
        note: Option<String>,
        /// Failure or return reason
        #[arg(long)]
        reason: Option<String>,
        /// Whether cash was collected (DELIVERED only)
        #[arg(long)]
        cod_collected: Option<bool>,
        /// Collected amount (DELIVERED with --cod-collected true)
        #[arg(long)]
        cod_amount: Option<f64>,
    },

    /// Run a delivery against a recorded path
    Simulate {
        #[arg(long)]
        pickup: GeoPoint,
        #[arg(long)]
        delivery: GeoPoint,
        /// JSON file with a point list or {"polyline": "..."}
        #[arg(long)]
        replay: PathBuf,
        /// Stop after this many seconds (default: length of the replay)
        #[arg(long)]
        duration_secs: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum AssignmentQuery {
    /// Unassigned shipping logs
    Available,
    /// Shipping logs held by the current courier
    Mine,
    /// One shipping log
    Show { id: String },
    /// Shipping logs for an order
    Order { order_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::from_config_builder(&args.config)
        .with_context(|| format!("Failed to load config: {:?}", args.config))?;
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging)?;
    info!("Configuration loaded from {:?}", args.config);

    match args.command {
        Command::Decode { polyline } => {
            let points = decode_polyline(&polyline)?;
            print_json(&points)
        }
        Command::Route { from, to, mode } => {
            let provider = GoongRoutingProvider::from_config(&config.routing)?;
            let service = RouteService::new(Arc::new(provider));
            let route = service
                .compute_route(from, to, mode.unwrap_or(config.routing.mode))
                .await?;
            print_json(&route)
        }
        Command::Assignments { query } => {
            let session = session(args.token)?;
            let backend = HttpAssignmentBackend::from_config(&config.backend)?;
            match query {
                AssignmentQuery::Available => print_json(&backend.available(&session).await?),
                AssignmentQuery::Mine => print_json(&backend.my_deliveries(&session).await?),
                AssignmentQuery::Show { id } => print_json(&backend.detail(&session, &id).await?),
                AssignmentQuery::Order { order_id } => {
                    print_json(&backend.by_order(&session, &order_id).await?)
                }
            }
        }
        Command::Accept { id } => {
            let session = session(args.token)?;
            let lifecycle = lifecycle(&config)?;
            let mut assignment = lifecycle.backend().detail(&session, &id).await?;
            lifecycle.assign(&session, &mut assignment).await?;
            print_json(&assignment)
        }
        Command::Update {
            id,
            status,
            note,
            reason,
            cod_collected,
            cod_amount,
        } => {
            let session = session(args.token)?;
            let lifecycle = lifecycle(&config)?;
            let payload = TransitionPayload {
                note,
                reason,
                is_cod_collected: cod_collected,
                cod_amount,
            };
            let mut assignment = lifecycle.backend().detail(&session, &id).await?;
            lifecycle
                .transition(&session, &mut assignment, status, payload)
                .await?;
            print_json(&assignment)
        }
        Command::Simulate {
            pickup,
            delivery,
            replay,
            duration_secs,
        } => simulate(&config, args.token, pickup, delivery, replay, duration_secs).await,
    }
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = config.parse_level()?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

fn session(token: Option<String>) -> Result<Session> {
    match token {
        Some(token) if !token.trim().is_empty() => Ok(Session::new(token)),
        _ => bail!("an access token is required (--token or COURIER_TOKEN)"),
    }
}

fn lifecycle(config: &AppConfig) -> Result<AssignmentLifecycle> {
    let backend = HttpAssignmentBackend::from_config(&config.backend)?;
    Ok(AssignmentLifecycle::new(Arc::new(backend)))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct SimulationSummary {
    degraded: bool,
    distance: Option<String>,
    duration: Option<String>,
    last_applied_sequence: Option<u64>,
    courier: Option<GeoPoint>,
    last_error: Option<String>,
    metrics: courier_map::MetricsSnapshot,
}

async fn simulate(
    config: &AppConfig,
    token: Option<String>,
    pickup: GeoPoint,
    delivery: GeoPoint,
    replay: PathBuf,
    duration_secs: Option<u64>,
) -> Result<()> {
    let interval = config.tracking.replay_interval();
    let provider = ReplayLocationProvider::from_file(&replay, interval)
        .with_context(|| format!("Failed to load replay file: {:?}", replay))?;
    let replay_len = provider.points().len() as u32;

    let tracker = Arc::new(LocationTracker::new(
        Arc::new(provider),
        TrackerConfig::from(&config.tracking),
    ));
    let routes = RouteService::new(Arc::new(GoongRoutingProvider::from_config(&config.routing)?));

    let reporter: Arc<dyn PositionReporter> = match &config.tracking.report_url {
        Some(url) => {
            let mut reporter = HttpPositionReporter::new(url, config.backend.timeout())?;
            if let Some(token) = token {
                reporter = reporter.with_bearer(token);
            }
            Arc::new(reporter)
        }
        None => Arc::new(LogPositionReporter),
    };

    let controller = DeliveryMapController::new(
        tracker,
        routes,
        Arc::new(LogMapEngine),
        reporter,
        ControllerConfig::from(config),
    );

    let activation = controller.activate(pickup, delivery).await?;
    if activation.degraded {
        warn!("Simulation running without an initial position fix");
    }
    controller.start_tracking()?;

    let limit = match duration_secs {
        Some(secs) => Duration::from_secs(secs),
        None => interval * (replay_len + 1),
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = tokio::time::sleep(limit) => info!("Replay finished"),
        _ = wait_for_session_end(&controller) => warn!("Tracking session ended early"),
    }

    controller.deactivate();

    let session = controller.tracking_session();
    let render = controller.render_state();
    let route = activation.route.as_ref();
    print_json(&SimulationSummary {
        degraded: activation.degraded,
        distance: route.and_then(|r| r.distance.as_ref()).map(|m| m.text.clone()),
        duration: route.and_then(|r| r.duration.as_ref()).map(|m| m.text.clone()),
        last_applied_sequence: session.last_applied_sequence,
        courier: render.courier,
        last_error: session.last_error.map(|e| e.to_string()),
        metrics: controller.metrics(),
    })
}

async fn wait_for_session_end(controller: &DeliveryMapController) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        ticker.tick().await;
        if !controller.tracking_session().active {
            return;
        }
    }
}

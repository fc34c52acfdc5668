use luminaris_core::dashboard::{
    AnalyticsModel, OverviewModel, SystemMetricsModel, ThreatsModel,
};
use luminaris_core::gate::navigation;
use luminaris_core::{
    mount, AuthorizationGate, DashboardHandle, DashboardKind, DashboardSources, GateDecision,
    HttpTransport, LuminarisConfig, MemoryStorage, MountOptions, PushHub, RocksStorage,
    SessionStorage, SessionStore, View, WsPushChannel,
};
use luminaris_core::transport::PushChannel;
use serde::Serialize;
use serde_json::json;
use std::io::BufRead;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const USAGE: &str = "usage: luminaris-monitor <login USER PASSWORD | logout | whoami | \
watch PATH [--stdin] | threat ID [--resolve] | forecast [--next | --history]>";

enum Command {
    Login { username: String, password: String },
    Logout,
    WhoAmI,
    /// `replay`: take push frames from stdin instead of the backend sockets
    Watch { path: String, replay: bool },
    Threat { id: u64, resolve: bool },
    Forecast(ForecastQuery),
}

enum ForecastQuery {
    Last,
    Next,
    History,
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [cmd, username, password] if cmd == "login" => Some(Command::Login {
            username: username.clone(),
            password: password.clone(),
        }),
        [cmd] if cmd == "logout" => Some(Command::Logout),
        [cmd] if cmd == "whoami" => Some(Command::WhoAmI),
        [cmd, path] if cmd == "watch" => Some(Command::Watch {
            path: path.clone(),
            replay: false,
        }),
        [cmd, path, flag] if cmd == "watch" && flag == "--stdin" => Some(Command::Watch {
            path: path.clone(),
            replay: true,
        }),
        [cmd, id] if cmd == "threat" => Some(Command::Threat {
            id: id.parse().ok()?,
            resolve: false,
        }),
        [cmd, id, flag] if cmd == "threat" && flag == "--resolve" => Some(Command::Threat {
            id: id.parse().ok()?,
            resolve: true,
        }),
        [cmd] if cmd == "forecast" => Some(Command::Forecast(ForecastQuery::Last)),
        [cmd, flag] if cmd == "forecast" && flag == "--next" => {
            Some(Command::Forecast(ForecastQuery::Next))
        }
        [cmd, flag] if cmd == "forecast" && flag == "--history" => {
            Some(Command::Forecast(ForecastQuery::History))
        }
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    luminaris_core::telemetry::init_tracing("info,luminaris_core=info,luminaris_monitor=info")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = LuminarisConfig::load();

    let storage: Arc<dyn SessionStorage> = match &cfg.session.storage_dir {
        Some(dir) => Arc::new(RocksStorage::open(dir)?),
        None => {
            warn!(target: "monitor", "No session directory configured; session lasts for this run only");
            Arc::new(MemoryStorage::new())
        }
    };
    let store = SessionStore::open(storage);
    let http = HttpTransport::new(&cfg.api)?.with_session(Arc::clone(&store));

    match command {
        Command::Login { username, password } => {
            let session = store.login(&http, &username, &password).await?;
            print_line(&json!({
                "username": session.username,
                "role": session.role,
                "tenant": session.tenant_name,
                "expires_at": session.expires_at,
                "landing": session.role.landing_view().path(),
            }));
        }
        Command::Logout => {
            store.logout();
            print_line(&json!({ "redirect": View::Login.path() }));
        }
        Command::WhoAmI => match store.current() {
            Some(session) => print_line(&json!({
                "username": session.username,
                "role": session.role,
                "tenant": session.tenant_name,
                "expires_at": session.expires_at,
                "navigation": navigation(&session.role)
                    .iter()
                    .map(View::path)
                    .collect::<Vec<_>>(),
            })),
            None => print_line(&serde_json::Value::Null),
        },
        Command::Watch { path, replay } => watch(&cfg, store, http, &path, replay).await?,
        Command::Threat { id, resolve } => {
            if admitted(&store, View::ThreatDetail(id.to_string())) {
                let record = if resolve {
                    http.resolve_threat(id).await?
                } else {
                    http.threat(id).await?
                };
                let level = record.level();
                print_line(&json!({ "threat": record, "level": level }));
            }
        }
        Command::Forecast(query) => {
            let view = match query {
                ForecastQuery::History => View::ForecastHistory,
                _ => View::Forecast,
            };
            if admitted(&store, view) {
                match query {
                    ForecastQuery::Last => print_line(&http.last_forecast().await?),
                    ForecastQuery::Next => print_line(&http.next_attack_forecast().await?),
                    ForecastQuery::History => print_line(&http.forecast_history().await?),
                }
            }
        }
    }

    Ok(())
}

async fn watch(
    cfg: &LuminarisConfig,
    store: Arc<SessionStore>,
    http: HttpTransport,
    path: &str,
    replay: bool,
) -> Result<(), BoxError> {
    let view = View::from_path(path).ok_or_else(|| format!("unknown view: {path}"))?;
    if !view.is_protected() {
        print_line(&json!({ "view": view.path(), "dashboards": [] }));
        return Ok(());
    }

    let _expiry = store.watch_expiry(cfg.session.expiry_check());
    let gate = AuthorizationGate::for_view(&store, view.clone());
    if let Some(target) = gate.decision().redirect_target() {
        print_line(&json!({ "redirect": target.path() }));
        return Ok(());
    }

    let channel: Arc<dyn PushChannel> = if replay {
        let hub = Arc::new(PushHub::default());
        relay_stdin(hub.clone());
        hub
    } else {
        Arc::new(WsPushChannel::new(&cfg.api)?.with_session(Arc::clone(&store)))
    };
    let sources = DashboardSources {
        snapshots: Arc::new(http),
        channel,
    };
    let options = MountOptions {
        poll_interval: cfg.series.poll_interval(),
    };

    let mut tasks = JoinSet::new();
    match &view {
        View::Dashboard => spawn_printer(&mut tasks, mount(OverviewModel, sources, options)),
        View::Threats => spawn_printer(&mut tasks, mount(ThreatsModel, sources, options)),
        View::Analytics => {
            spawn_printer(
                &mut tasks,
                mount(AnalyticsModel, sources.clone(), options.clone()),
            );
            let system = SystemMetricsModel::new(
                cfg.series.window_capacity,
                cfg.series.interval_secs(),
            );
            spawn_printer(&mut tasks, mount(system, sources, options));
        }
        other => {
            print_line(&json!({ "view": other.path(), "dashboards": [] }));
            return Ok(());
        }
    }

    let mut decisions = gate.subscribe();
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!(target: "monitor", "Interrupted");
        }
        _ = decisions.wait_for(|d| *d != GateDecision::Render) => {
            let target = gate.decision().redirect_target().unwrap_or(View::Login);
            print_line(&json!({ "redirect": target.path() }));
        }
    }

    tasks.shutdown().await;
    Ok(())
}

/// Gate a one-shot command; prints the redirect when refused
fn admitted(store: &SessionStore, view: View) -> bool {
    let gate = AuthorizationGate::for_view(store, view);
    match gate.decision().redirect_target() {
        Some(target) => {
            print_line(&json!({ "redirect": target.path() }));
            false
        }
        None => true,
    }
}

/// Relay push frames from stdin, one per line
///
/// A plain thread, so a pending read never holds up runtime shutdown.
fn relay_stdin(hub: Arc<PushHub>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let frame = line.trim();
            if frame.is_empty() {
                continue;
            }
            let delivered = hub.publish_all(frame);
            debug!(target: "monitor", delivered, "Relayed push frame");
        }
        for kind in DashboardKind::ALL {
            hub.close(kind);
        }
        info!(target: "monitor", "Push input closed");
    });
}

/// Print every published view of a dashboard until the task is aborted
fn spawn_printer<S>(tasks: &mut JoinSet<()>, handle: DashboardHandle<S>)
where
    S: Serialize + Clone + Send + Sync + 'static,
{
    tasks.spawn(async move {
        let mut views = handle.subscribe();
        loop {
            let line = serde_json::to_string(&*views.borrow_and_update());
            match line {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(target: "monitor", dashboard = %handle.kind(), error = %e, "Failed to encode view"),
            }
            if views.changed().await.is_err() {
                break;
            }
        }
        handle.unmount().await;
    });
}

fn print_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(target: "monitor", error = %e, "Failed to encode output"),
    }
}

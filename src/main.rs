pub mod command;
pub mod config;
pub mod controller;
pub mod session;
pub mod transport;

use crate::command::Interpreter;
use crate::config::{Config, ControllerConfig};
use crate::controller::{ControllerHandle, ControllerKind, ControllerState};
use crate::session::{run_until_interrupted, session_loop::Listening, Session, UdpListener};
use crate::transport::{HostLink, LogLink, UdpHostLink};
use clap::Parser;
use color_eyre::Result;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Remote control for an emulated game controller over UDP text commands
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to <config dir>/remotepad/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address the command listener binds to
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Port the command listener binds to
    #[arg(long)]
    port: Option<u16>,

    /// host:port that receives the input reports
    #[arg(long)]
    host: Option<String>,

    /// Controller to emulate: pro_controller, joycon_l or joycon_r
    #[arg(long)]
    controller: Option<ControllerKind>,

    /// Also accept commands on stdin
    #[arg(long)]
    console: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(host) = self.host {
            config.host.target = Some(host);
        }
        if let Some(kind) = self.controller {
            config.controller.kind = kind;
        }
        if self.console {
            config.console.enabled = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup(cli.verbose)?;

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    info!("Starting with config: {:?}", config);

    let controller = match config.host.resolve_target()? {
        Some(target) => spawn_controller(&config.controller, UdpHostLink::connect(target).await?),
        None => {
            warn!("No host target configured, reports are only logged");
            spawn_controller(&config.controller, LogLink::default())
        }
    };

    let shutdown = CancellationToken::new();
    let (lines_tx, lines_rx) = mpsc::channel(100);

    let listener =
        UdpListener::bind(config.listener.socket_addr(), config.listener.buffer_size).await?;
    let _listener_handle = listener.spawn(lines_tx.clone(), shutdown.clone());

    if config.console.enabled {
        let _console_handle = session::console::spawn(lines_tx.clone(), shutdown.clone());
    }
    // the session sees InputClosed once every source has stopped
    drop(lines_tx);

    let session = Session::<Listening>::create(
        lines_rx,
        Arc::new(Interpreter::default()),
        controller,
        shutdown,
    );

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let termination = run_until_interrupted(session, interrupt).await;

    info!("Shutting down: {}", termination);
    Ok(())
}

fn spawn_controller<L: HostLink>(config: &ControllerConfig, link: L) -> ControllerHandle {
    let state = ControllerState::new(config.kind, config.left_stick, config.right_stick, link);
    ControllerHandle::spawn(state, Some(config.settings()))
}

fn setup(verbose: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(if verbose { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

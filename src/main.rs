//! DAEDALUS Shell - desktop front end for the DAEDALUS DNA-origami design engine.
//!
//! Launching a second time while an instance is resident reactivates that instance.

use std::{cell::Cell, path::PathBuf, rc::Rc};

use anyhow::{Result, anyhow};
use clap::Parser;
use egui::ViewportBuilder;
use tracing_subscriber::EnvFilter;

use daedalus_shell::{
    config::Config,
    controller::ShellHandle,
    helper::{
        file_dialog::NativeFileDialog,
        ioapi::{ControlListener, IoApiCommand, connection_file_path, forward_to_running_instance},
        lifecycle::{AfterLastWindow, Platform, WindowLifecycle},
        rpc_client::RpcClient,
    },
    view::{PageApp, PageState, ResidentLink},
};

const APP_TITLE: &str = "DAEDALUS";

#[derive(Parser, Debug)]
#[command(name = "daedalus-shell", version, about)]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine XML-RPC endpoint, overriding the settings file.
    #[arg(long)]
    endpoint: Option<String>,

    /// Engine call timeout in seconds, overriding the settings file.
    #[arg(long)]
    timeout: Option<u64>,

    /// Ask a resident instance to exit and return.
    #[arg(long)]
    quit: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let connection_file = connection_file_path();

    if cli.quit {
        if !forward_to_running_instance(&connection_file, IoApiCommand::Quit) {
            tracing::info!("No running instance to quit");
        }
        return Ok(());
    }
    if forward_to_running_instance(&connection_file, IoApiCommand::Activate) {
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    let client = RpcClient::new(&config.endpoint, config.timeout(), config.connect_timeout())?;
    let control = Rc::new(ControlListener::bind(&connection_file)?);
    let shell = Rc::new(ShellHandle::spawn(
        config.initial_session(),
        NativeFileDialog,
    ));
    let quit_requested = Rc::new(Cell::new(false));

    let mut lifecycle = WindowLifecycle::new(Platform::current());
    let mut open_window = lifecycle.on_ready();

    loop {
        if open_window {
            let link = ResidentLink {
                control: control.clone(),
                quit_requested: quit_requested.clone(),
            };
            run_window(&config, shell.clone(), client.clone(), link)?;
            lifecycle.on_closed();
        }

        if quit_requested.get() {
            break;
        }
        match lifecycle.on_all_windows_closed() {
            AfterLastWindow::Quit => break,
            AfterLastWindow::StayResident => {
                tracing::info!("Window closed, staying resident until reactivated");
            }
        }

        match control.wait()? {
            IoApiCommand::Activate => open_window = lifecycle.on_activate(),
            IoApiCommand::Quit => break,
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}

fn run_window(
    config: &Config,
    shell: Rc<ShellHandle>,
    client: RpcClient,
    link: ResidentLink,
) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([config.window_width, config.window_height]),
        run_and_return: true,
        ..Default::default()
    };

    // Cells start from the configured defaults; the shell resyncs them on load.
    let state = PageState::new(&config.initial_session(), config.images_dir.clone());

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(PageApp::new(cc, state, shell, client, Some(link))))),
    )
    .map_err(|e| anyhow!("window failed: {}", e))
}

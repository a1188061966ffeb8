mod app;
mod client;
mod config;
mod devices;
mod logging;
mod servers;
mod templates;
mod ui;
mod wizard;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use app::App;
use client::{HttpClient, ImageListClient};
use config::Config;
use devices::DeviceRegistry;
use servers::{Server, ServerChoice};
use templates::TemplateStore;
use wizard::{
    DeviceWizard, DialogLevel, ImageSource, IouDevice, IouImageType, WizardEnv, WizardPage,
};

#[derive(Parser)]
#[command(name = "device-wizard")]
#[command(version)]
#[command(about = "A TUI wizard to create IOU devices for network topologies")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured devices
    List,

    /// Show the local and remote compute servers
    Servers,

    /// List the images a compute server holds
    Images {
        /// "local" or host:port
        #[arg(short, long, default_value = "local")]
        server: String,
        /// Image list endpoint
        #[arg(short, long, default_value = wizard::IOU_IMAGES_ENDPOINT)]
        endpoint: String,
    },

    /// Create an IOU device without the TUI
    Create {
        /// Device name
        #[arg(short, long)]
        name: String,
        /// Image path (local path, or path on the remote server)
        #[arg(short, long)]
        image: String,
        /// Image type; guessed from the path when omitted
        #[arg(short = 't', long = "type", value_enum)]
        image_type: Option<ImageTypeArg>,
        /// "local", "cloud" or a registered remote server as host:port
        #[arg(short, long, default_value = "local")]
        server: String,
        /// Let the first registered remote server run the device
        #[arg(long)]
        load_balance: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImageTypeArg {
    L2,
    L3,
}

impl From<ImageTypeArg> for IouImageType {
    fn from(arg: ImageTypeArg) -> Self {
        match arg {
            ImageTypeArg::L2 => IouImageType::L2,
            ImageTypeArg::L3 => IouImageType::L3,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_file_path);
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Some(Commands::List) => {
            logging::init_stderr();
            cmd_list(&config)
        }
        Some(Commands::Servers) => {
            logging::init_stderr();
            cmd_servers(&config)
        }
        Some(Commands::Images { server, endpoint }) => {
            logging::init_stderr();
            cmd_images(&config, &server, &endpoint)
        }
        Some(Commands::Create {
            name,
            image,
            image_type,
            server,
            load_balance,
        }) => {
            logging::init_stderr();
            cmd_create(&config, &name, &image, image_type.map(Into::into), &server, load_balance)
        }
        None => run_tui(config, &config_path),
    }
}

/// Guard that ensures terminal is restored on drop (even on panic)
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best effort restoration - ignore errors since we may be panicking
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        let _ = execute!(io::stdout(), crossterm::cursor::Show);
    }
}

fn run_tui(config: Config, config_path: &Path) -> Result<()> {
    let log_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_dir);
    let _log_guard = logging::init_file(&log_dir)?;

    // First run: write the defaults so they can be edited
    if !config_path.exists() {
        config.save_to(config_path)?;
        info!("Wrote default configuration to {:?}", config_path);
    }

    // Create app state before touching the terminal so errors print normally
    let mut app = App::new(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Create guard AFTER setup so it only cleans up if setup succeeded
    let _guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    ui::run(&mut terminal, &mut app)
}

fn cmd_list(config: &Config) -> Result<()> {
    let registry = DeviceRegistry::load(&config.devices_path)?;

    if registry.devices().is_empty() {
        println!("No devices in {:?}", config.devices_path);
        return Ok(());
    }

    for device in registry.devices() {
        println!(
            "  {:16} {:10} {:24} {}e/{}s  {}",
            device.name,
            device.category.to_string(),
            device.image,
            device.ethernet_adapters,
            device.serial_adapters,
            device.server
        );
    }
    println!();
    println!("Total: {} devices", registry.devices().len());
    Ok(())
}

fn cmd_servers(config: &Config) -> Result<()> {
    let registry = config.server_registry();
    println!("Local:  {}", registry.local_server());
    if registry.remote_servers().is_empty() {
        println!("Remote: none");
    }
    for (i, remote) in registry.remote_servers().iter().enumerate() {
        let note = if i == 0 { "  (load balance)" } else { "" };
        println!("Remote: {}{}", remote, note);
    }
    println!("Cloud:  {}", if config.enable_cloud { "enabled" } else { "disabled" });
    Ok(())
}

fn cmd_images(config: &Config, server: &str, endpoint: &str) -> Result<()> {
    let server = config
        .server_registry()
        .resolve(server)
        .map_err(anyhow::Error::msg)?;
    let client = HttpClient::new().context("Failed to create HTTP client")?;

    let images = client
        .get_images(&server, endpoint)
        .with_context(|| format!("Error while getting the VMs from {}", server))?;

    if images.is_empty() {
        println!("No images on {}", server);
    }
    for image in &images {
        println!("{}", image.filename);
    }
    Ok(())
}

/// Run the IOU wizard without a terminal UI
fn cmd_create(
    config: &Config,
    name: &str,
    image: &str,
    image_type: Option<IouImageType>,
    server: &str,
    load_balance: bool,
) -> Result<()> {
    let mut registry = DeviceRegistry::load(&config.devices_path)?;
    let servers = config.server_registry();

    let kind = IouDevice::new(
        registry.names(),
        TemplateStore::with_user_dir(&config.configs_path),
        config.use_local_server,
    );
    let env = WizardEnv {
        local_available: IouDevice::local_supported(config.use_local_server),
        cloud_enabled: config.enable_cloud,
    };
    let mut wizard = DeviceWizard::new(kind, servers.clone(), env);

    if wizard.page() == WizardPage::Server {
        choose_server(&mut wizard, &servers, server, load_balance)?;
        if !wizard.next() {
            report_dialogs(&mut wizard)?;
        }
    } else {
        check_forced_local(server, load_balance)?;
    }

    // The image is given as a path; the server list is not needed
    if wizard.take_fetch_request().is_some() {
        wizard.cancel_loading();
    }
    report_dialogs(&mut wizard)?;

    let selector = wizard
        .kind()
        .image_selector()
        .context("IOU wizard has no image selector")?;
    wizard.set_name(name);
    wizard.set_image_source(selector, ImageSource::Manual);
    wizard.set_image_text(selector, image);
    if let Some(image_type) = image_type {
        wizard.kind_mut().set_image_type(image_type);
    }

    if !wizard.next() {
        report_dialogs(&mut wizard)?;
    }
    let settings = match wizard.finish() {
        Ok(settings) => settings,
        Err(e) => bail!("{}: {}", e.title(), e),
    };

    registry.add(settings.clone())?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

/// Translate the --server/--load-balance flags into server page choices
fn choose_server(
    wizard: &mut DeviceWizard<IouDevice>,
    servers: &servers::ServerRegistry,
    server: &str,
    load_balance: bool,
) -> Result<()> {
    if load_balance {
        wizard.set_server_choice(ServerChoice::Remote);
        wizard.set_load_balance(true);
        return Ok(());
    }

    let choice = match servers.resolve(server).map_err(anyhow::Error::msg)? {
        Server::Local(_) => ServerChoice::Local,
        Server::Cloud => ServerChoice::Cloud,
        Server::Remote(addr) => {
            let index = wizard
                .state()
                .remote_choices
                .iter()
                .position(|r| *r == addr)
                .with_context(|| format!("{} is not a registered remote server", addr))?;
            wizard.set_server_choice(ServerChoice::Remote);
            wizard.select_remote(index);
            ServerChoice::Remote
        }
    };

    let vis = wizard.visibility();
    let available = match choice {
        ServerChoice::Local => vis.local_enabled,
        ServerChoice::Cloud => vis.cloud_visible,
        ServerChoice::Remote => true,
    };
    if !available {
        bail!("{} is not available on this host", choice.label());
    }
    wizard.set_server_choice(choice);
    Ok(())
}

/// With `use_local_server` the server page is skipped, so only "local" makes sense
fn check_forced_local(server: &str, load_balance: bool) -> Result<()> {
    if load_balance {
        bail!("--load-balance conflicts with use_local_server: IOU devices run on the local server");
    }
    if server != "local" {
        bail!(
            "--server {} conflicts with use_local_server: IOU devices run on the local server",
            server
        );
    }
    Ok(())
}

/// Print warnings; the first critical dialog becomes the error
fn report_dialogs(wizard: &mut DeviceWizard<IouDevice>) -> Result<()> {
    while let Some(dialog) = wizard.take_dialog() {
        match dialog.level {
            DialogLevel::Warning => eprintln!("warning: {}", dialog.message),
            DialogLevel::Critical => bail!("{}: {}", dialog.title, dialog.message),
        }
    }
    Ok(())
}

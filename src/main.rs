use color_eyre::{eyre::WrapErr, Result};
use padmouse::config::Config;
use padmouse::daemon::Daemon;
use padmouse::device::{
    DeviceLocator, EvdevNamespace, HotplugWatcher, InotifyWatch, VirtualPointer,
};
use padmouse::error::DaemonError;
use padmouse::session::SessionSettings;
use padmouse::shutdown;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load().await.wrap_err("Failed to load configuration")?;

    let token = shutdown::install()?;

    let sink = VirtualPointer::create(&config.device.virtual_name)
        .map_err(DaemonError::OutputSinkError)?;

    let watch = InotifyWatch::watch(&config.device.dir).map_err(|source| {
        DaemonError::HotplugError {
            path: config.device.dir.clone(),
            source,
        }
    })?;

    let locator = DeviceLocator::new(
        Box::new(EvdevNamespace::new(&config.device.dir)),
        config.device.scan_limit,
    );

    info!("Starting padmouse");
    let daemon = Daemon::create(
        locator,
        HotplugWatcher::new(Box::new(watch)),
        Box::new(sink),
        SessionSettings::from_config(&config),
        token,
    );

    daemon.run().await?.shutdown();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

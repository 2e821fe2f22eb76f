use clap::Parser;
use push_registrar::config::{
    parse_public_gateway, ENV_PROVIDER_APP_ID, ENV_PUSH_INITIATOR_URL, ENV_USE_PUBLIC_PPG,
};
use push_registrar::{
    utils, CertificatePolicy, Configuration, DeviceInfo, FileUserStore, HostPlatform,
    HttpTransport, HttpTransportConfig, IgnoreCertificateErrors, OverrideDeviceInfo,
    PlatformDeviceInfo, RegisterService, RejectCertificateErrors, StaticConfigurationProvider,
    User, UserStore,
};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

/// Push Initiator subscription CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Push Initiator base URL (e.g., https://pi.example.com/pushinitiator)
    #[arg(long, env = ENV_PUSH_INITIATOR_URL)]
    url: String,

    /// Registered provider application ID
    #[arg(short, long, env = ENV_PROVIDER_APP_ID)]
    app_id: String,

    /// Use the public push proxy gateway (true/public) or BDS (false/bds)
    #[arg(
        long = "public",
        env = ENV_USE_PUBLIC_PPG,
        default_value = "true",
        value_parser = parse_public_gateway,
        action = clap::ArgAction::Set
    )]
    public_gateway: bool,

    /// Username
    #[arg(short, long, env = "PUSH_USERNAME")]
    user: String,

    /// Password
    #[arg(short, long, env = "PUSH_PASSWORD")]
    password: String,

    /// Device push token
    #[arg(short, long, env = "PUSH_TOKEN")]
    token: String,

    /// Override the detected OS version
    #[arg(long)]
    os_version: Option<String>,

    /// Override the detected device model
    #[arg(long)]
    model: Option<String>,

    /// File the user is saved to after a successful registration
    #[arg(short, long, default_value = "push-user.json")]
    store: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Abort on certificate errors instead of ignoring them
    #[arg(long)]
    strict_tls: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    utils::initialize_logging(args.log_level.as_str());

    let configuration = Configuration::new(
        args.url.clone(),
        args.app_id.clone(),
        args.public_gateway,
    );

    let policy: Arc<dyn CertificatePolicy> = if args.strict_tls {
        Arc::new(RejectCertificateErrors)
    } else {
        Arc::new(IgnoreCertificateErrors)
    };

    let transport = HttpTransport::new(
        HttpTransportConfig::default().with_timeout(Duration::from_secs(args.timeout)),
        policy,
    )?;

    let device = OverrideDeviceInfo::new(
        PlatformDeviceInfo::new(HostPlatform::default()),
        args.os_version.clone(),
        args.model.clone(),
    );
    info!(
        "Device: osversion='{}', model='{}'",
        device.os_version(),
        device.model()
    );

    let store = Arc::new(FileUserStore::new(&args.store));
    if let Ok(Some(previous)) = store.current().await {
        info!("Previously registered user: {}", previous.user_id);
    }

    let service = RegisterService::new(
        Arc::new(transport),
        Arc::new(StaticConfigurationProvider::new(configuration)),
        Arc::new(device),
        store,
    );

    let user = User::new(args.user.clone(), args.password.clone());
    let pending = service.subscribe(&user, &args.token)?;
    info!("Registration {} issued", pending.attempt_id());

    let outcome = pending.outcome().await?;
    if outcome.is_success() {
        info!("Registration completed successfully");
        println!("{}", outcome.code());
        Ok(())
    } else {
        error!("Registration failed: {}", outcome);
        println!("{}", outcome);
        std::process::exit(1);
    }
}

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use pwa_lifecycle::adapters::{HttpRegistrationBackend, JsonFileStateStore, TokioTimeProvider};
use pwa_lifecycle::config::{BackendConfig, LifecycleConfig};
use pwa_lifecycle::device::DeviceIdentityStore;
use pwa_lifecycle::registration::RegistrationClient;
use pwa_lifecycle::types::device::{DeviceEnvironment, DeviceMetadata};
use pwa_lifecycle::types::dismissal::{DismissalMode, PromptKind};
use pwa_lifecycle::types::registration::{MessagingCredential, Session};
use pwa_lifecycle::{DismissalPolicy, Error, Result};

const DEFAULT_USER_AGENT: &str = concat!("pwa-lifecycle/", env!("CARGO_PKG_VERSION"));

#[derive(Parser, Debug)]
#[command(
    name = "pwa-lifecycle",
    version,
    about = "Inspect and drive install/update prompt and push registration state"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Command,
    #[arg(
        long,
        env = "PWA_LIFECYCLE_STATE_FILE",
        default_value = "pwa-lifecycle-state.json"
    )]
    state_file: PathBuf,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub(crate) verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the persisted device id, creating it if needed
    DeviceId,
    /// Show whether the install and update prompts would be shown now
    PromptStatus,
    /// Record a dismissal for a prompt
    Dismiss(DismissArgs),
    /// Clear every dismissal for a prompt
    Reset(ResetArgs),
    /// Register a messaging token for this device with the backend
    Register(RegisterArgs),
}

#[derive(Args, Debug)]
struct DismissArgs {
    kind: PromptKind,
    mode: DismissalMode,
}

#[derive(Args, Debug)]
struct ResetArgs {
    kind: PromptKind,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    token: String,
    #[arg(long, env = "PWA_LIFECYCLE_BACKEND_URL")]
    backend_url: String,
    #[arg(long, env = "PWA_LIFECYCLE_CSRF_TOKEN")]
    csrf_token: Option<String>,
    #[arg(long, env = "PWA_LIFECYCLE_SESSION_COOKIE")]
    session_cookie: Option<String>,
    #[arg(long, env = "PWA_LIFECYCLE_USER_ID")]
    user_id: Option<String>,
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    #[arg(long, default_value = std::env::consts::OS)]
    platform: String,
}

pub(crate) async fn run(cli: Cli) -> u8 {
    let store = JsonFileStateStore::new(&cli.state_file);
    let config = LifecycleConfig::default();
    match cli.command {
        Command::DeviceId => {
            let identity = DeviceIdentityStore::with_prefix(store, config.device_id_prefix.clone());
            println!("{}", identity.identity().id);
            0
        }
        Command::PromptStatus => {
            let policy = DismissalPolicy::new(store, TokioTimeProvider, &config);
            for kind in [PromptKind::Install, PromptKind::Update] {
                let records = policy.records(kind);
                let show = policy.should_prompt(kind);
                println!("{kind}: {}", if show { "prompt" } else { "suppressed" });
                for record in records {
                    match record.timestamp {
                        Some(at) => println!("  {:?} dismissal at {at}", record.mode),
                        None => println!("  {:?} dismissal", record.mode),
                    }
                }
            }
            0
        }
        Command::Dismiss(args) => {
            let policy = DismissalPolicy::new(store, TokioTimeProvider, &config);
            policy.record_dismissal(args.kind, args.mode);
            println!("{} prompt dismissed ({:?})", args.kind, args.mode);
            0
        }
        Command::Reset(args) => {
            let policy = DismissalPolicy::new(store, TokioTimeProvider, &config);
            policy.clear(args.kind);
            println!("{} prompt dismissals cleared", args.kind);
            0
        }
        Command::Register(args) => run_register(store, &config, args).await,
    }
}

async fn run_register(store: JsonFileStateStore, config: &LifecycleConfig, args: RegisterArgs) -> u8 {
    let backend_config = match resolve_backend_config(&args) {
        Ok(backend_config) => backend_config,
        Err(err) => {
            eprintln!("error: {err}");
            return 2;
        }
    };
    let backend = match HttpRegistrationBackend::new(&backend_config) {
        Ok(backend) => backend,
        Err(err) => {
            eprintln!("error: failed to build http client ({err})");
            return 1;
        }
    };

    let identity = DeviceIdentityStore::with_prefix(store, config.device_id_prefix.clone());
    let environment = DeviceEnvironment {
        user_agent: args.user_agent,
        platform: args.platform,
    };
    let metadata = DeviceMetadata::collect(identity.get_or_create_device_id(), &environment);
    let client = RegistrationClient::new(
        backend,
        Session {
            user_id: backend_config.user_id.clone(),
        },
    );

    let credential = MessagingCredential(args.token);
    let result = client.register(Some(&credential), metadata).await;
    println!("{}", result.user_message());
    if result.is_registered() { 0 } else { 1 }
}

fn resolve_backend_config(args: &RegisterArgs) -> Result<BackendConfig> {
    let raw = args.backend_url.trim();
    if raw.is_empty() {
        return Err(Error::Config("backend url cannot be empty".to_string()));
    }
    let mut base_url = url::Url::parse(raw)
        .map_err(|err| Error::Config(format!("invalid backend url '{raw}': {err}")))?;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    if args.token.trim().is_empty() {
        return Err(Error::Config("token cannot be empty".to_string()));
    }

    Ok(BackendConfig {
        base_url,
        csrf_token: non_empty(args.csrf_token.as_deref()),
        session_cookie: non_empty(args.session_cookie.as_deref()),
        user_id: non_empty(args.user_id.as_deref()),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

//! Kickforge CLI - the sneaker studio from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session survives between runs)
//! kf auth login -e asha@kickforge.in -p 'hunter22!'
//!
//! # Save a design and put it in the cart
//! kf design create -n "Night Court" -c sole=#111111 -c laces=#ff6600
//! kf cart add <design-id> -q 2
//!
//! # Check out
//! kf checkout quote
//! kf checkout pay --address address.json
//! ```
//!
//! # Commands
//!
//! - `auth` - Sign in, register, verify email, reset password
//! - `design` - List, create, delete and generate designs
//! - `cart` - Show and edit the cart
//! - `checkout` - Quote and pay
//! - `profile` - Update details and profile image
//!
//! # Environment Variables
//!
//! See `ClientConfig::from_env`. `KICKFORGE_API_URL` is required.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kickforge_client::{AppState, ClientConfig};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "kf")]
#[command(author, version, about = "Kickforge sneaker studio CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and manage the session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Manage saved designs
    Design {
        #[command(subcommand)]
        action: DesignAction,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Quote and pay for the cart
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Manage the signed-in profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user, re-checking the session
    Whoami,
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Confirm an account with the emailed code (prompts if not given)
    Verify {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        otp: Option<String>,
    },
    /// Email a new verification code
    Resend {
        #[arg(short, long)]
        email: String,
    },
    /// Email a password reset code
    Forgot {
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password with a reset code
    Reset {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        otp: String,
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum DesignAction {
    /// List local and account designs, newest first
    List,
    /// Save a new design
    Create {
        /// Design name
        #[arg(short, long)]
        name: String,
        /// Part color as `part=#rrggbb` (repeatable)
        #[arg(short, long = "color")]
        colors: Vec<String>,
        /// Preview image (JPEG, PNG or WebP)
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Delete a design locally and from the account
    Delete {
        id: String,
    },
    /// Generate a design from a text prompt
    Generate {
        prompt: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and totals
    Show,
    /// Add a saved design
    Add {
        design_id: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        /// Unit price
        #[arg(long, default_value = "2499")]
        price: Decimal,
    },
    /// Remove a design
    Remove {
        design_id: String,
    },
    /// Set a quantity (0 removes)
    Set {
        design_id: String,
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CheckoutAction {
    /// Show subtotal, shipping, tax and total
    Quote,
    /// Start a payment and complete it with the gateway's response
    Pay {
        /// Shipping address as JSON
        #[arg(short, long)]
        address: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Update name and phone
    Update {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        phone: Option<String>,
    },
    /// Upload a profile image
    Upload {
        path: PathBuf,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output on stdout stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kickforge_client=info,kickforge_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            e.report();
            eprintln!("{}", e.toast().message);
            return ExitCode::FAILURE;
        }
    };
    state.restore().await;

    match run(cli, &state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            if e.requires_sign_in() {
                if let Err(sign_out) = state.sign_out().await {
                    tracing::warn!(error = %sign_out, "could not clear expired session");
                }
            }
            eprintln!("{}", e.message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, state: &AppState) -> Result<(), CommandError> {
    match cli.command {
        Commands::Auth { action } => match action {
            AuthAction::Login { email, password } => {
                commands::auth::login(state, &email, &password).await?;
            }
            AuthAction::Logout => commands::auth::logout(state).await?,
            AuthAction::Whoami => commands::auth::whoami(state).await?,
            AuthAction::Register {
                name,
                email,
                password,
            } => commands::auth::register(state, &name, &email, &password).await?,
            AuthAction::Verify { email, otp } => {
                commands::auth::verify(state, &email, otp.as_deref()).await?;
            }
            AuthAction::Resend { email } => commands::auth::resend(state, &email).await?,
            AuthAction::Forgot { email } => commands::auth::forgot(state, &email).await?,
            AuthAction::Reset {
                email,
                otp,
                password,
            } => commands::auth::reset(state, &email, &otp, &password).await?,
        },
        Commands::Design { action } => match action {
            DesignAction::List => commands::designs::list(state).await?,
            DesignAction::Create {
                name,
                colors,
                preview,
            } => commands::designs::create(state, &name, &colors, preview.as_deref()).await?,
            DesignAction::Delete { id } => commands::designs::delete(state, &id).await?,
            DesignAction::Generate { prompt } => commands::designs::generate(state, &prompt).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(state).await,
            CartAction::Add {
                design_id,
                quantity,
                price,
            } => commands::cart::add(state, &design_id, quantity, price).await?,
            CartAction::Remove { design_id } => commands::cart::remove(state, &design_id).await?,
            CartAction::Set {
                design_id,
                quantity,
            } => commands::cart::set(state, &design_id, quantity).await?,
            CartAction::Clear => commands::cart::clear(state).await?,
        },
        Commands::Checkout { action } => match action {
            CheckoutAction::Quote => commands::checkout::quote(state).await,
            CheckoutAction::Pay { address } => commands::checkout::pay(state, &address).await?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Update { name, phone } => {
                commands::profile::update(state, &name, phone.as_deref()).await?;
            }
            ProfileAction::Upload { path } => commands::profile::upload(state, &path).await?,
        },
    }
    Ok(())
}

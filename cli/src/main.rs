use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mailtester::client::HttpRelayClient;
use mailtester::config::{MergePolicy, ServerConfig, SmtpDefaults};
use mailtester::form::{Field, FormController, SendOutcome};
use mailtester::mail::StubConnector;
use mailtester::relay::{self, RelayState};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser)]
#[command(name = "mailtester", about = "Send a test email through an SMTP relay")]
struct Cli {
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay endpoint
    Serve {
        /// Listen port [env: RELAY_PORT, default: 3000]
        #[arg(short, long)]
        port: Option<u16>,

        /// How inline SMTP values combine with SMTP_* defaults [env: RELAY_POLICY]
        #[arg(long)]
        policy: Option<MergePolicy>,

        /// Accept messages without contacting any SMTP server
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Fill in the form and send one email through a running relay
    Send(SendArgs),
}

#[derive(Args)]
struct SendArgs {
    /// Relay origin
    #[arg(long, default_value = "http://localhost:3000")]
    relay: String,

    #[arg(long)]
    to: String,

    #[arg(long)]
    subject: String,

    #[arg(long)]
    message: String,

    #[arg(long, env = "SMTP_HOST", default_value = "")]
    host: String,

    #[arg(long = "smtp-port", env = "SMTP_PORT", default_value = "")]
    smtp_port: String,

    #[arg(long, env = "SMTP_USER", default_value = "")]
    user: String,

    #[arg(long, env = "SMTP_PASS", default_value = "", hide_env_values = true)]
    pass: String,

    #[arg(long, env = "SMTP_FROM", default_value = "")]
    from: String,

    /// Implicit TLS (usually port 465) instead of STARTTLS (usually 587)
    #[arg(long, default_value_t = false)]
    secure: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = match cli.verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            policy,
            dry_run,
        } => serve(port, policy, dry_run).await,
        Commands::Send(args) => send(args).await,
    }
}

async fn serve(port: Option<u16>, policy: Option<MergePolicy>, dry_run: bool) -> Result<()> {
    let config = ServerConfig::load().context("reading RELAY_* configuration")?;
    let defaults = SmtpDefaults::load().context("reading SMTP_* configuration")?;
    let port = port.unwrap_or(config.port);
    let policy = policy.unwrap_or(config.policy);

    tracing::info!(?policy, dry_run, ?defaults, "starting relay");
    let state = if dry_run {
        RelayState::new(defaults, policy, StubConnector::default())
    } else {
        RelayState::smtp(defaults, policy)
    };

    mailtester::serve((Ipv4Addr::UNSPECIFIED, port), relay::router(state))
        .await
        .context("error running HTTP server")?;
    Ok(())
}

async fn send(args: SendArgs) -> Result<()> {
    let client = HttpRelayClient::new(&args.relay);
    let mut form = FormController::new(client).with_observer(|steps| {
        let active = steps.iter().nth(steps.active_index());
        if let Some(step) = active {
            tracing::debug!(step = %step.key, status = %step.status, "{}%", steps.progress());
        }
    });

    for (field, value) in [
        (Field::To, args.to),
        (Field::Subject, args.subject),
        (Field::Message, args.message),
        (Field::Host, args.host),
        (Field::Port, args.smtp_port),
        (Field::User, args.user),
        (Field::Pass, args.pass),
        (Field::From, args.from),
    ] {
        form.set_field(field, value);
    }
    form.set_secure(args.secure);

    let outcome = form.send().await;
    println!("{}", render::steps(form.steps()));
    println!("{}", form.status());

    match outcome {
        SendOutcome::Sent => Ok(()),
        SendOutcome::Failed(step) => anyhow::bail!("send failed at step {step}"),
    }
}

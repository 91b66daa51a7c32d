//! CLI entry point for `throw`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, ValueEnum};

use throw::config::{self, DispatchConfig, GalleryConfig, JsonConfigStore, SmtpConfig};
use throw::dispatch::{DispatchDecision, Dispatcher};
use throw::error::ThrowError;
use throw::gallery::MinusClient;
use throw::identity::send_test_email;
use throw::transport::SmtpMailTransport;
use throw::ui::{select_interface, UserInteraction};
use throw::wizard;

/// Throw files at people by e-mail.
///
/// Files are attached when their total size is small. Larger sets are
/// uploaded to a gallery and the recipients are sent the links.
#[derive(Parser)]
#[command(name = "throw", version)]
struct Cli {
    /// Files or directories to send (directories are walked recursively)
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Recipient address; repeat for several. Prompted for when omitted.
    #[arg(short, long = "to", value_name = "RECIPIENT")]
    to: Vec<String>,

    /// Name for this collection of files, added to the subject
    #[arg(short, long, value_name = "NAME")]
    name: Option<String>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run a setup wizard and exit
    #[arg(long, value_enum, value_name = "WHAT")]
    set: Option<SetTarget>,

    /// Send a test e-mail to yourself with the saved identity
    #[arg(long)]
    test_email: bool,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,

    /// Generate a man page and exit
    #[arg(long)]
    manpage: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SetTarget {
    /// Default sender name and address
    Identity,
    /// SMTP server used when no local relay is available
    Smtp,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if matches!(e.downcast_ref::<ThrowError>(), Some(ThrowError::Cancelled)) {
                tracing::info!("Cancelled by user");
                eprintln!();
            } else {
                tracing::error!(error = %e, "Aborting");
                eprintln!("throw: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(shell) = cli.completions {
        return cmd_completions(shell);
    }
    if cli.manpage {
        return cmd_manpage();
    }

    let mut config = JsonConfigStore::open_default()?;
    let ui = select_interface();
    let transport = SmtpMailTransport::new(SmtpConfig::from_store(&config)?);

    match cli.set {
        Some(SetTarget::Identity) => {
            wizard::set_identity(ui.as_ref(), &mut config, &transport)?;
            return Ok(());
        }
        Some(SetTarget::Smtp) => {
            wizard::input_smtp(ui.as_ref(), &mut config)?;
            if let Some(path) = config.path() {
                ui.message(&format!("Settings are stored in {}.", path.display()));
            }
            return Ok(());
        }
        None => {}
    }

    if cli.test_email {
        let identity = wizard::default_identity(ui.as_ref(), &mut config, &transport)?;
        send_test_email(&identity, &transport)?;
        ui.message(&format!("Sent a test email to {}.", identity.email()));
        return Ok(());
    }

    cmd_throw(&cli, ui.as_ref(), &mut config, &transport)
}

/// Send the files named on the command line.
fn cmd_throw(
    cli: &Cli,
    ui: &dyn UserInteraction,
    config: &mut JsonConfigStore,
    transport: &SmtpMailTransport,
) -> anyhow::Result<()> {
    let dispatch_config = DispatchConfig::from_store(&*config)?;
    if cli.paths.is_empty() && !dispatch_config.allow_empty {
        return Err(ThrowError::NoFiles.into());
    }

    let recipients = if cli.to.is_empty() {
        wizard::collect_recipients(ui)?
    } else {
        cli.to.clone()
    };
    let identity = wizard::default_identity(ui, config, transport)?;

    let gallery = MinusClient::new(GalleryConfig::from_store(&*config)?)?;
    let decision = Dispatcher::new(ui, &gallery, transport)
        .allow_empty(dispatch_config.allow_empty)
        .dispatch_files(cli.paths.as_slice(), &recipients, cli.name.as_deref(), &identity)?;

    ui.new_section();
    ui.message(match decision {
        DispatchDecision::InlineAttachment => "Your files have been sent as attachments.",
        DispatchDecision::RemoteGallery => "Your files have been uploaded and the links sent.",
    });
    Ok(())
}

/// Set up tracing with stderr output and file logging.
fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "throw.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "throw", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use webhook_client::config::{Settings, SharedEndpoint, DEFAULT_CONFIG_FILE};
use webhook_client::gui::run_gui;
use webhook_client::lifecycle::{LifecycleState, RequestManager};
use webhook_client::log::Role;
use webhook_client::transport::{FilePart, Payload, WebhookTransport};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Chemin du fichier de configuration
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// URL du webhook (prioritaire sur la configuration, mode CLI)
    #[arg(long)]
    url: Option<String>,

    /// Fichier a envoyer en multipart (repetable, mode CLI)
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Message a envoyer en mode CLI (sinon la GUI est lancee)
    message: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.message.is_some() || !args.files.is_empty() {
        run_cli(args)
    } else {
        run_gui(args.config)
    }
}

/// Envoi unique sans interface: meme gestionnaire de cycle de vie que la
/// GUI, draine en boucle jusqu'au retour a Idle.
fn run_cli(args: Args) -> Result<()> {
    let url = match args.url {
        Some(url) => url,
        None => Settings::load(&args.config).webhook_url,
    };

    let payload = if args.files.is_empty() {
        let body = args
            .message
            .ok_or_else(|| anyhow!("Mode CLI: il faut fournir un message ou --file"))?;
        Payload::Text { body }
    } else {
        let mut files = Vec::with_capacity(args.files.len());
        for path in &args.files {
            files.push(FilePart::from_path(path)?);
        }
        Payload::FileBatch { files }
    };

    let transport = WebhookTransport::new()?;
    let mut manager = RequestManager::new(transport, SharedEndpoint::new(url));

    if !manager.submit(payload) {
        return Err(anyhow!("Soumission refusee"));
    }

    while manager.state() != LifecycleState::Idle {
        manager.poll();
        thread::sleep(Duration::from_millis(20));
    }

    let terminal = manager
        .log()
        .last()
        .ok_or_else(|| anyhow!("Aucune reponse enregistree"))?;

    match terminal.role {
        Role::Error => Err(anyhow!("{}", terminal.text)),
        _ => {
            println!("{}", terminal.text);
            Ok(())
        }
    }
}

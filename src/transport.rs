use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Raison renvoyee quand aucune URL de webhook n'est configuree.
pub const NO_ENDPOINT_REASON: &str = "no endpoint configured";

const TEXT_TIMEOUT: Duration = Duration::from_secs(15);
const FILE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct FilePart {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl FilePart {
    /// Lit un fichier local et le prepare pour le lot multipart. Les octets
    /// sont copies immediatement: aucun handle ne reste ouvert entre la
    /// selection et l'envoi.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Fichier illisible: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "fichier".to_string());

        Ok(Self {
            name,
            bytes,
            mime_type: guess_mime_type(path).to_string(),
        })
    }
}

/// Type de contenu deduit de l'extension, octet-stream par defaut.
fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("txt") | Some("log") | Some("md") => "text/plain",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Charge utile d'une soumission, immuable une fois construite. La variante
/// determine l'encodage HTTP: JSON pour le texte, multipart pour les fichiers.
#[derive(Clone, Debug)]
pub enum Payload {
    Text { body: String },
    FileBatch { files: Vec<FilePart> },
}

impl Payload {
    /// Texte de l'entree journal cote utilisateur, ajoute avant tout appel
    /// reseau.
    pub fn display_text(&self) -> String {
        match self {
            Payload::Text { body } => body.clone(),
            Payload::FileBatch { files } => {
                let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
                format!("Envoi de {} fichier(s): {}", files.len(), names.join(", "))
            }
        }
    }
}

/// Resultat d'une soumission, produit exactement une fois par requete.
/// Un corps de reponse non-JSON est porte tel quel par `Value::String`.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome {
    Success(Value),
    Failure(String),
}

/// Couture entre le gestionnaire de cycle de vie et le reseau. L'appel est
/// bloquant: c'est au gestionnaire de le deporter hors du contexte UI.
pub trait Transport: Send + Sync {
    fn send(&self, url: &str, payload: &Payload) -> RequestOutcome;
}

/// Implementation reelle: POST JSON ou multipart vers le webhook configure.
/// Aucun echec ne traverse cette frontiere autrement que sous forme de
/// `Failure`.
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Impossible de construire le client HTTP")?;

        Ok(Self { client })
    }

    async fn dispatch(&self, url: &str, payload: &Payload) -> Result<Value> {
        let request = match payload {
            Payload::Text { body } => self
                .client
                .post(url)
                .timeout(TEXT_TIMEOUT)
                .json(&json!({ "message": body })),
            Payload::FileBatch { files } => self
                .client
                .post(url)
                .timeout(FILE_TIMEOUT)
                .multipart(build_batch_form(files)?),
        };

        let response = request.send().await.context("Echec de requete HTTP")?;
        let status = response.status();
        let text = response
            .text()
            .await
            .context("Lecture du corps de reponse impossible")?;

        if !status.is_success() {
            return Err(anyhow!("Erreur HTTP {status}: {text}"));
        }

        Ok(parse_response_body(text))
    }
}

impl Transport for WebhookTransport {
    fn send(&self, url: &str, payload: &Payload) -> RequestOutcome {
        let url = url.trim();
        if url.is_empty() {
            return RequestOutcome::Failure(NO_ENDPOINT_REASON.to_string());
        }

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(err) => {
                return RequestOutcome::Failure(format!(
                    "Impossible de creer le runtime async: {err}"
                ));
            }
        };

        debug!(url, "envoi de la requete webhook");
        match runtime.block_on(self.dispatch(url, payload)) {
            Ok(data) => RequestOutcome::Success(data),
            Err(err) => {
                warn!(url, error = %err, "echec de la requete webhook");
                RequestOutcome::Failure(format!("{err:#}"))
            }
        }
    }
}

/// Une part par fichier, nommee positionnellement `file0`, `file1`, ...
/// chacune portant le nom de fichier d'origine et son type de contenu.
fn build_batch_form(files: &[FilePart]) -> Result<Form> {
    let mut form = Form::new();
    for (index, file) in files.iter().enumerate() {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .with_context(|| format!("Type de contenu invalide pour {}", file.name))?;
        form = form.part(format!("file{index}"), part);
    }
    Ok(form)
}

fn parse_response_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::lifecycle::EndpointSource;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Configuration persistee dans `config.json`. L'URL par defaut est vide:
/// une installation neuve echoue immediatement avec "no endpoint configured"
/// plutot que de poster vers un hote d'exemple.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub webhook_url: String,
}

impl Settings {
    /// Charge la configuration. Fichier absent, illisible ou malforme:
    /// retour aux valeurs par defaut, jamais d'erreur au demarrage.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Settings::default(),
        }
    }

    /// Sauvegarde explicite, declenchee par l'utilisateur. Les echecs sont
    /// propages pour etre affiches dans une notification bloquante.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .context("Impossible de serialiser la configuration")?;
        fs::write(path, content).with_context(|| {
            format!("Impossible d'ecrire la configuration: {}", path.display())
        })
    }
}

/// Accesseur de configuration injecte dans le gestionnaire de requetes.
/// L'interface ecrit la valeur a la sauvegarde des parametres; le
/// gestionnaire la relit a chaque soumission, jamais en cache.
#[derive(Clone, Debug, Default)]
pub struct SharedEndpoint(Arc<Mutex<String>>);

impl SharedEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(Arc::new(Mutex::new(url.into())))
    }

    pub fn set(&self, url: impl Into<String>) {
        if let Ok(mut current) = self.0.lock() {
            *current = url.into();
        }
    }

    pub fn get(&self) -> String {
        match self.0.lock() {
            Ok(current) => current.clone(),
            Err(_) => String::new(),
        }
    }
}

impl EndpointSource for SharedEndpoint {
    fn webhook_url(&self) -> String {
        self.get()
    }
}

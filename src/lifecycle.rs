use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::log::{format_response, MessageLog, Role};
use crate::transport::{Payload, RequestOutcome, Transport, NO_ENDPOINT_REASON};

/// Accesseur d'URL injecte a la construction et relu a chaque soumission:
/// un changement d'URL en cours de session s'applique a l'envoi suivant.
pub trait EndpointSource {
    fn webhook_url(&self) -> String;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    InFlight { request_id: u64 },
}

/// Coordinateur a une seule requete en vol entre la source d'evenements UI
/// et le transport HTTP. Chaque soumission acceptee cree un worker ephemere;
/// le resultat revient par un canal draine sur le contexte qui possede le
/// journal, jamais depuis le thread de fond.
pub struct RequestManager<T: Transport + 'static> {
    transport: Arc<T>,
    endpoint: Box<dyn EndpointSource>,
    log: MessageLog,
    state: LifecycleState,
    next_request_id: u64,
    completion_rx: Option<Receiver<RequestOutcome>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Transport + 'static> RequestManager<T> {
    pub fn new(transport: T, endpoint: impl EndpointSource + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            endpoint: Box::new(endpoint),
            log: MessageLog::new(),
            state: LifecycleState::Idle,
            next_request_id: 0,
            completion_rx: None,
            worker: None,
        }
    }

    /// Soumet une charge utile. No-op si une requete est deja en vol: les
    /// controles UI sont desactives pendant le vol, ceci est la garde
    /// defensive derriere eux.
    pub fn submit(&mut self, payload: Payload) -> bool {
        if matches!(self.state, LifecycleState::InFlight { .. }) {
            debug!("soumission ignoree: une requete est deja en vol");
            return false;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        // L'entree utilisateur s'affiche avant tout appel reseau.
        self.log.append(Role::User, payload.display_text());

        let url = self.endpoint.webhook_url().trim().to_string();
        let (tx, rx) = mpsc::channel();

        if url.is_empty() {
            // Pas de worker a demarrer: l'echec emprunte le meme canal de
            // completion que les autres issues.
            let _ = tx.send(RequestOutcome::Failure(NO_ENDPOINT_REASON.to_string()));
        } else {
            let transport = Arc::clone(&self.transport);
            debug!(request_id, %url, "requete webhook deportee en arriere-plan");
            self.worker = Some(thread::spawn(move || {
                let outcome = transport.send(&url, &payload);
                // La fenetre peut etre fermee pendant la requete; l'envoi
                // echoue alors silencieusement et le thread se termine.
                let _ = tx.send(outcome);
            }));
        }

        self.completion_rx = Some(rx);
        self.state = LifecycleState::InFlight { request_id };
        true
    }

    /// A appeler a chaque frame depuis le contexte qui possede le journal.
    /// Draine le canal de completion et execute le nettoyage terminal.
    pub fn poll(&mut self) {
        let event = match self.completion_rx.as_ref() {
            Some(rx) => rx.try_recv(),
            None => return,
        };

        match event {
            Ok(outcome) => self.finish(outcome),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                // Le worker est mort sans produire de resultat; la
                // soumission recoit quand meme son unique entree terminale.
                self.finish(RequestOutcome::Failure(
                    "le worker s'est termine sans produire de resultat".to_string(),
                ));
            }
        }
    }

    /// Nettoyage terminal d'une soumission. Le `take()` du recepteur est
    /// l'unique verrou: meme si completion et deconnexion se presentaient
    /// toutes les deux, une seule entree terminale serait ajoutee.
    fn finish(&mut self, outcome: RequestOutcome) {
        if self.completion_rx.take().is_none() {
            return;
        }

        // Le thread a deja envoye son resultat; relacher le handle suffit.
        self.worker = None;

        match outcome {
            RequestOutcome::Success(data) => {
                self.log.append(Role::Agent, format_response(&data));
            }
            RequestOutcome::Failure(reason) => {
                warn!(%reason, "la requete webhook a echoue");
                self.log.append(
                    Role::Error,
                    format!("Impossible de contacter le webhook: {reason}"),
                );
            }
        }

        self.state = LifecycleState::Idle;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn input_enabled(&self) -> bool {
        self.state == LifecycleState::Idle
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }
}

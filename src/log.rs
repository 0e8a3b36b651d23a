use serde_json::Value;

/// Origine d'une entree du journal de conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
    Error,
}

/// Entree immuable du journal. `sequence` fixe l'ordre d'affichage et est
/// attribue a l'insertion, jamais reordonne.
#[derive(Clone, Debug)]
pub struct Entry {
    pub role: Role,
    pub text: String,
    pub sequence: u64,
}

/// Journal de conversation en ajout seul. Aucune API de suppression ni de
/// modification: l'historique est permanent pour la session.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Entry>,
    next_sequence: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(Entry {
            role,
            text: text.into(),
            sequence,
        });
        sequence
    }

    /// Vue en lecture seule pour le rendu.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }
}

/// Met en forme la reponse du webhook une seule fois, a l'insertion.
/// Les valeurs structurees deviennent du JSON indente (cles triees par
/// serde_json), les chaines restent litterales, les autres scalaires
/// gardent leur representation JSON.
pub fn format_response(data: &Value) -> String {
    match data {
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_assigns_monotonic_sequences() {
        let mut log = MessageLog::new();

        assert_eq!(log.append(Role::User, "bonjour"), 0);
        assert_eq!(log.append(Role::Agent, "salut"), 1);
        assert_eq!(log.append(Role::Error, "oups"), 2);

        let sequences: Vec<u64> = log.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn entries_keep_insertion_order_and_content() {
        let mut log = MessageLog::new();
        log.append(Role::User, "question");
        log.append(Role::Agent, "reponse");

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].role, Role::User);
        assert_eq!(log.entries()[0].text, "question");
        assert_eq!(log.entries()[1].role, Role::Agent);
        assert_eq!(log.entries()[1].text, "reponse");
    }

    #[test]
    fn format_response_pretty_prints_objects() {
        let formatted = format_response(&json!({"reply": "hi"}));

        assert_eq!(formatted, "{\n  \"reply\": \"hi\"\n}");
        // Le texte produit doit rester re-parsable.
        let reparsed: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(reparsed, json!({"reply": "hi"}));
    }

    #[test]
    fn format_response_keeps_strings_literal() {
        let formatted = format_response(&Value::String("texte brut".to_string()));
        assert_eq!(formatted, "texte brut");
    }

    #[test]
    fn format_response_renders_scalars_as_json_text() {
        assert_eq!(format_response(&json!(42)), "42");
        assert_eq!(format_response(&json!(true)), "true");
        assert_eq!(format_response(&Value::Null), "null");
    }

    #[test]
    fn format_response_sorts_object_keys() {
        let formatted = format_response(&json!({"zeta": 1, "alpha": 2}));
        let alpha = formatted.find("alpha").unwrap();
        let zeta = formatted.find("zeta").unwrap();
        assert!(alpha < zeta);
    }
}

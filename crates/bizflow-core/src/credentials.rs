//! Named secrets referenced by id from node data.
//!
//! The store is independent of the graph history. Deleting a credential does
//! not touch nodes by itself; the editor clears dangling references in the
//! same call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::fresh_id;
use crate::persistence::PersistencePort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialKind {
    ApiKey,
    Database,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

#[derive(Default)]
pub struct CredentialStore {
    credentials: Vec<Credential>,
    port: Option<Box<dyn PersistencePort<Vec<Credential>>>>,
}

impl CredentialStore {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            port: None,
        }
    }

    /// Start from whatever the port holds. A failing port yields an empty store.
    pub fn with_port(port: Box<dyn PersistencePort<Vec<Credential>>>) -> Self {
        let credentials = match port.load() {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load saved credentials, starting empty: {:#}", e);
                Vec::new()
            }
        };
        Self {
            credentials,
            port: Some(port),
        }
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        kind: CredentialKind,
        data: HashMap<String, String>,
    ) -> String {
        let credential = Credential {
            id: fresh_id("cred"),
            name: name.into(),
            kind,
            data,
        };
        let id = credential.id.clone();
        info!(id = %id, name = %credential.name, ?kind, "Credential added");
        self.credentials.push(credential);
        self.persist();
        id
    }

    /// Returns whether a credential was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.credentials.len();
        self.credentials.retain(|c| c.id != id);
        let removed = self.credentials.len() != before;
        if removed {
            info!(id, "Credential removed");
            self.persist();
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.id == id)
    }

    pub fn list(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    fn persist(&self) {
        if let Some(port) = &self.port
            && let Err(e) = port.save(&self.credentials)
        {
            warn!("Failed to save credentials: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPort;

    #[test]
    fn add_assigns_prefixed_ids_and_persists() {
        let port: MemoryPort<Vec<Credential>> = MemoryPort::new();
        let observer = port.clone();
        let mut store = CredentialStore::with_port(Box::new(port));

        let id = store.add(
            "Stripe",
            CredentialKind::ApiKey,
            HashMap::from([("apiKey".to_string(), "sk_test".to_string())]),
        );
        assert!(id.starts_with("cred_"));
        assert_eq!(store.get(&id).unwrap().name, "Stripe");
        assert_eq!(observer.saved().unwrap().len(), 1);

        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(observer.saved().unwrap().is_empty());
    }

    #[test]
    fn wire_format_uses_type_field() {
        let credential = Credential {
            id: "cred_1".into(),
            name: "Main DB".into(),
            kind: CredentialKind::Database,
            data: HashMap::new(),
        };
        let json = serde_json::to_value(&credential).unwrap();
        assert_eq!(json["type"], "DATABASE");

        let parsed: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, credential);
    }
}

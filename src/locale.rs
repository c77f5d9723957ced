//! The UI language preference.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::i18n::Locale;
use crate::storage::{CredentialStore, keys};

/// Persisted UI language. Changes are published on a `watch` channel that
/// the HTTP gateway reads for its `Accept-Language` header.
pub struct LocaleStore {
    credentials: Arc<dyn CredentialStore>,
    sender: watch::Sender<Locale>,
}

impl LocaleStore {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        let (sender, _) = watch::channel(Locale::default());
        Self {
            credentials,
            sender,
        }
    }

    pub fn locale(&self) -> Locale {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.sender.subscribe()
    }

    /// Load the stored preference. Only `"tr"` selects Turkish.
    pub async fn hydrate(&self) -> Locale {
        let stored = match self.credentials.get(keys::LOCALE).await {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Locale read failed");
                None
            }
        };
        let locale = match stored.as_deref() {
            Some("tr") => Locale::Tr,
            _ => Locale::En,
        };
        self.sender.send_replace(locale);
        locale
    }

    /// Persist and publish a new language.
    pub async fn set_locale(&self, locale: Locale) -> Result<(), StorageError> {
        self.credentials.set(keys::LOCALE, locale.as_str()).await?;
        self.sender.send_replace(locale);
        info!(%locale, "Locale changed");
        Ok(())
    }
}

//! The session dispatcher: one event in, document state and notifications out.
//!
//! A [`Session`] owns the document store, the diagnostic engine, and the
//! completion engine, and processes client events one at a time per document.
//! Failures are confined to the document that caused them: a stale version
//! becomes a resync notification, a failed diagnostic scan becomes a single
//! internal-error diagnostic, and every other document proceeds untouched.

use crate::events::{ClientEvent, CompletionResponse, ServerNotification};
use ordo_core::completion::CompletionEngine;
use ordo_core::diagnostics::{
    Diagnostic, DiagnosticEngine, DiagnosticRange, DiagnosticRule, DiagnosticSeverity, RuleError,
};
use ordo_core::document::{DirtyRegion, DocumentStore, StoreError, SyncMode};

/// Session configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Document synchronization mode.
    pub sync_mode: SyncMode,
}

type Subscriber = Box<dyn Fn(&ServerNotification)>;

/// A language session over a set of open documents.
pub struct Session {
    store: DocumentStore,
    engine: DiagnosticEngine,
    completion: CompletionEngine,
    subscribers: Vec<Subscriber>,
}

impl Session {
    /// Create a session with the built-in diagnostic rules.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            store: DocumentStore::new(config.sync_mode),
            engine: DiagnosticEngine::with_default_rules(),
            completion: CompletionEngine::new(),
            subscribers: Vec::new(),
        }
    }

    /// Register a notification subscriber. Subscribers are invoked
    /// synchronously, in registration order, while the triggering event is
    /// being handled.
    pub fn subscribe(&mut self, subscriber: impl Fn(&ServerNotification) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Register an additional diagnostic rule.
    pub fn add_rule(&mut self, rule: Box<dyn DiagnosticRule>) {
        self.engine.add_rule(rule);
    }

    /// Read access to the document store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Handle one client event. Only [`ClientEvent::Completion`] produces a
    /// response; everything else reports through notifications.
    pub fn handle(&mut self, event: ClientEvent) -> Option<CompletionResponse> {
        match event {
            ClientEvent::Open { uri, text, version } => {
                self.store.open(&uri, &text, version);
                self.rescan(&uri, &DirtyRegion::Full);
                None
            }
            ClientEvent::Change {
                uri,
                version,
                change,
            } => {
                match self.store.apply_edit(&uri, version, &change) {
                    Ok(outcome) => self.rescan(&uri, &outcome.dirty),
                    Err(err @ StoreError::StaleVersion { .. }) => {
                        log::debug!("{}", err);
                        self.notify(&ServerNotification::ResyncNeeded { uri });
                    }
                    Err(err) => {
                        log::warn!("change rejected: {}", err);
                        self.notify(&ServerNotification::ResyncNeeded { uri });
                    }
                }
                None
            }
            ClientEvent::Close { uri } => {
                let version = self.store.get(&uri).map(|doc| doc.version());
                if self.store.close(&uri) {
                    self.engine.forget(&uri);
                    // An empty set clears any diagnostics still displayed.
                    self.notify(&ServerNotification::Diagnostics {
                        uri,
                        version: version.unwrap_or(0),
                        diagnostics: Vec::new(),
                    });
                }
                None
            }
            ClientEvent::Completion { uri, offset } => {
                let candidates = self
                    .store
                    .get(&uri)
                    .map(|doc| self.completion.complete(doc, offset))
                    .unwrap_or_default();
                Some(CompletionResponse { candidates })
            }
        }
    }

    /// Rescan a document and publish the result. A failed scan is downgraded
    /// to a single internal-error diagnostic on that document alone.
    fn rescan(&mut self, uri: &str, dirty: &DirtyRegion) {
        let Some(document) = self.store.get(uri) else {
            return;
        };
        let version = document.version();
        let diagnostics = match self.engine.scan(document, dirty) {
            Ok(diagnostics) => diagnostics,
            Err(err) => {
                log::warn!("diagnostic scan failed for {}: {}", uri, err);
                let fallback = vec![internal_error_diagnostic(&err)];
                self.engine.set_diagnostics(uri, fallback.clone());
                fallback
            }
        };
        self.notify(&ServerNotification::Diagnostics {
            uri: uri.to_string(),
            version,
            diagnostics,
        });
    }

    fn notify(&self, notification: &ServerNotification) {
        for subscriber in &self.subscribers {
            subscriber(notification);
        }
    }
}

fn internal_error_diagnostic(err: &RuleError) -> Diagnostic {
    Diagnostic {
        range: DiagnosticRange::new(0, 0),
        severity: DiagnosticSeverity::Error,
        message: format!("diagnostic scan failed: {}", err),
        rule: "internal-error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordo_core::document::{DocumentChange, RangeEdit};

    const URI: &str = "file:///pipeline.ordo";

    fn open(session: &mut Session, text: &str) {
        session.handle(ClientEvent::Open {
            uri: URI.to_string(),
            text: text.to_string(),
            version: 1,
        });
    }

    #[test]
    fn test_completion_for_unknown_document_is_empty() {
        let mut session = Session::new(SessionConfig::default());
        let response = session
            .handle(ClientEvent::Completion {
                uri: URI.to_string(),
                offset: 0,
            })
            .unwrap();
        assert!(response.candidates.is_empty());
    }

    #[test]
    fn test_open_then_edit_advances_version() {
        let mut session = Session::new(SessionConfig::default());
        open(&mut session, "let x = 1;");
        session.handle(ClientEvent::Change {
            uri: URI.to_string(),
            version: 2,
            change: DocumentChange::Incremental(vec![RangeEdit {
                start: 10,
                end: 10,
                text: " let y = 2;".to_string(),
            }]),
        });
        let doc = session.store().get(URI).unwrap();
        assert_eq!(doc.version(), 2);
        assert!(doc.symbols().is_declared("y"));
    }

    #[test]
    fn test_close_forgets_document() {
        let mut session = Session::new(SessionConfig::default());
        open(&mut session, "let x = 1;");
        session.handle(ClientEvent::Close {
            uri: URI.to_string(),
        });
        assert!(session.store().get(URI).is_none());
    }
}

//! Event types crossing the session boundary, and their JSON encodings.
//!
//! Inbound [`ClientEvent`]s are plain values the host constructs from its
//! transport; outbound [`ServerNotification`]s and [`CompletionResponse`]s
//! encode themselves as JSON shaped like the corresponding LSP payloads, with
//! ranges as half-open character offsets.

use ordo_core::completion::{CompletionCandidate, CompletionKind};
use ordo_core::diagnostics::{Diagnostic, DiagnosticSeverity};
use ordo_core::document::DocumentChange;
use serde_json::{json, Value};

/// An inbound event from the editor client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A document was opened (or reopened for resync).
    Open {
        /// Document URI.
        uri: String,
        /// Full document text.
        text: String,
        /// Initial version.
        version: u64,
    },
    /// A document changed.
    Change {
        /// Document URI.
        uri: String,
        /// Version after this change.
        version: u64,
        /// The change payload.
        change: DocumentChange,
    },
    /// A document was closed.
    Close {
        /// Document URI.
        uri: String,
    },
    /// Completion was requested at a cursor position.
    Completion {
        /// Document URI.
        uri: String,
        /// Cursor character offset.
        offset: usize,
    },
}

/// An outbound notification pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerNotification {
    /// The full diagnostic set for a document at a version.
    Diagnostics {
        /// Document URI.
        uri: String,
        /// Document version the diagnostics were computed against.
        version: u64,
        /// Sorted diagnostics; empty clears the client's display.
        diagnostics: Vec<Diagnostic>,
    },
    /// The document's state is out of sync and must be reopened.
    ResyncNeeded {
        /// Document URI.
        uri: String,
    },
}

impl ServerNotification {
    /// The notification method name.
    pub fn method(&self) -> &'static str {
        match self {
            ServerNotification::Diagnostics { .. } => "ordo/publishDiagnostics",
            ServerNotification::ResyncNeeded { .. } => "ordo/resyncNeeded",
        }
    }

    /// Encode the notification parameters as JSON.
    pub fn to_json(&self) -> Value {
        match self {
            ServerNotification::Diagnostics {
                uri,
                version,
                diagnostics,
            } => json!({
                "uri": uri,
                "version": version,
                "diagnostics": diagnostics.iter().map(diagnostic_json).collect::<Vec<_>>(),
            }),
            ServerNotification::ResyncNeeded { uri } => json!({ "uri": uri }),
        }
    }
}

fn diagnostic_json(diagnostic: &Diagnostic) -> Value {
    json!({
        "range": { "start": diagnostic.range.start, "end": diagnostic.range.end },
        "severity": severity_code(diagnostic.severity),
        "message": diagnostic.message,
        "source": diagnostic.rule,
    })
}

fn severity_code(severity: DiagnosticSeverity) -> u8 {
    match severity {
        DiagnosticSeverity::Error => 1,
        DiagnosticSeverity::Warning => 2,
        DiagnosticSeverity::Information => 3,
        DiagnosticSeverity::Hint => 4,
    }
}

/// The response to a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionResponse {
    /// Ordered candidates; empty when no context matches.
    pub candidates: Vec<CompletionCandidate>,
}

impl CompletionResponse {
    /// Encode the candidate list as JSON.
    pub fn to_json(&self) -> Value {
        Value::Array(self.candidates.iter().map(candidate_json).collect())
    }
}

fn candidate_json(candidate: &CompletionCandidate) -> Value {
    let mut item = json!({
        "label": candidate.label,
        "kind": kind_code(candidate.kind),
    });
    if let Some(detail) = &candidate.detail {
        item["detail"] = json!(detail);
    }
    if let Some(insert_text) = &candidate.insert_text {
        item["insertText"] = json!(insert_text);
    }
    item
}

fn kind_code(kind: CompletionKind) -> u8 {
    match kind {
        CompletionKind::Method => 2,
        CompletionKind::Variable => 6,
        CompletionKind::Keyword => 14,
    }
}

//! End-to-end session scenarios: events in, notifications and responses out.

use ordo_core::completion::CompletionKind;
use ordo_core::diagnostics::{
    Diagnostic, DiagnosticRule, DiagnosticSeverity, RuleContext, RuleError, RuleScope,
};
use ordo_core::document::{DocumentChange, RangeEdit};
use ordo_core::token::TokenKind;
use ordo_session::{ClientEvent, ServerNotification, Session, SessionConfig};
use std::cell::RefCell;
use std::rc::Rc;

const URI: &str = "file:///pipeline.ordo";

fn session_with_log() -> (Session, Rc<RefCell<Vec<ServerNotification>>>) {
    let mut session = Session::new(SessionConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    session.subscribe(move |notification| sink.borrow_mut().push(notification.clone()));
    (session, log)
}

fn open(session: &mut Session, uri: &str, text: &str) {
    session.handle(ClientEvent::Open {
        uri: uri.to_string(),
        text: text.to_string(),
        version: 1,
    });
}

fn insert(session: &mut Session, uri: &str, version: u64, at: usize, text: &str) {
    session.handle(ClientEvent::Change {
        uri: uri.to_string(),
        version,
        change: DocumentChange::Incremental(vec![RangeEdit {
            start: at,
            end: at,
            text: text.to_string(),
        }]),
    });
}

fn last_diagnostics(log: &RefCell<Vec<ServerNotification>>, uri: &str) -> Vec<Diagnostic> {
    log.borrow()
        .iter()
        .rev()
        .find_map(|n| match n {
            ServerNotification::Diagnostics {
                uri: n_uri,
                diagnostics,
                ..
            } if n_uri == uri => Some(diagnostics.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

#[test]
fn unrecognized_term_is_reported_with_an_exact_span() {
    let (mut session, log) = session_with_log();
    open(&mut session, URI, "let x = undefined;");

    let diagnostics = last_diagnostics(&log, URI);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!((errors[0].range.start, errors[0].range.end), (8, 17));
}

#[test]
fn member_completion_after_typing_a_dot() {
    let (mut session, _log) = session_with_log();
    let text = "let u = data_loader";
    open(&mut session, URI, text);
    insert(&mut session, URI, 2, text.len(), ".");

    let response = session
        .handle(ClientEvent::Completion {
            uri: URI.to_string(),
            offset: text.len() + 1,
        })
        .unwrap();
    let labels: Vec<_> = response.candidates.iter().map(|c| c.label.as_str()).collect();
    assert!(labels.contains(&"getData"));
    assert!(labels.contains(&"getUniverseFromTickers"));
    assert!(
        response
            .candidates
            .iter()
            .all(|c| c.kind == CompletionKind::Method)
    );
}

#[test]
fn stale_change_triggers_resync_and_leaves_state_intact() {
    let (mut session, log) = session_with_log();
    open(&mut session, URI, "let a = 1;");
    insert(&mut session, URI, 2, 10, " let b = 2;");

    // A duplicate of version 2 is stale and must not touch the document.
    insert(&mut session, URI, 2, 0, "junk ");

    assert!(log.borrow().iter().any(|n| matches!(
        n,
        ServerNotification::ResyncNeeded { uri } if uri == URI
    )));
    let doc = session.store().get(URI).unwrap();
    assert_eq!(doc.version(), 2);
    assert_eq!(doc.text().to_string(), "let a = 1; let b = 2;");
}

#[test]
fn resync_recovers_through_reopen() {
    let (mut session, log) = session_with_log();
    open(&mut session, URI, "let a = 1;");
    insert(&mut session, URI, 7, 0, "x"); // skipped versions: stale
    assert!(log.borrow().iter().any(|n| matches!(
        n,
        ServerNotification::ResyncNeeded { .. }
    )));

    // The client reopens with the authoritative text and a fresh version.
    session.handle(ClientEvent::Open {
        uri: URI.to_string(),
        text: "let a = undefined;".to_string(),
        version: 8,
    });
    insert(&mut session, URI, 9, 18, " ");
    assert_eq!(session.store().get(URI).unwrap().version(), 9);
    assert!(!last_diagnostics(&log, URI).is_empty());
}

/// A rule that fails whenever the document mentions a trigger identifier.
struct TriggeredFailure;

impl DiagnosticRule for TriggeredFailure {
    fn id(&self) -> &str {
        "triggered-failure"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Global
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        if ctx
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Identifier && t.text == "explode")
        {
            return Err(RuleError {
                rule: "triggered-failure".to_string(),
                message: "synthetic failure".to_string(),
            });
        }
        Ok(Vec::new())
    }
}

#[test]
fn scan_failure_is_isolated_to_the_failing_document() {
    let (mut session, log) = session_with_log();
    session.add_rule(Box::new(TriggeredFailure));

    let healthy = "file:///healthy.ordo";
    let failing = "file:///failing.ordo";
    open(&mut session, healthy, "let a = 1;");
    open(&mut session, failing, "let b = explode;");

    let failing_diags = last_diagnostics(&log, failing);
    assert_eq!(failing_diags.len(), 1);
    assert_eq!(failing_diags[0].rule, "internal-error");
    assert_eq!(
        (failing_diags[0].range.start, failing_diags[0].range.end),
        (0, 0)
    );

    // The healthy document keeps working after the failure.
    insert(&mut session, healthy, 2, 10, " let c = undefined;");
    let healthy_diags = last_diagnostics(&log, healthy);
    assert!(healthy_diags.iter().all(|d| d.rule != "internal-error"));
    assert!(healthy_diags.iter().any(|d| d.rule == "unrecognized-term"));
}

#[test]
fn close_publishes_an_empty_diagnostic_set() {
    let (mut session, log) = session_with_log();
    open(&mut session, URI, "let x = undefined;");
    assert!(!last_diagnostics(&log, URI).is_empty());

    session.handle(ClientEvent::Close {
        uri: URI.to_string(),
    });
    assert!(last_diagnostics(&log, URI).is_empty());
}

#[test]
fn diagnostics_notification_carries_the_scanned_version() {
    let (mut session, log) = session_with_log();
    open(&mut session, URI, "let x = 1;");
    insert(&mut session, URI, 2, 10, " let y = undefined;");

    let version = log
        .borrow()
        .iter()
        .rev()
        .find_map(|n| match n {
            ServerNotification::Diagnostics { version, .. } => Some(*version),
            _ => None,
        })
        .unwrap();
    assert_eq!(version, 2);

    let value = log
        .borrow()
        .iter()
        .rev()
        .find_map(|n| match n {
            ServerNotification::Diagnostics { .. } => Some(n.to_json()),
            _ => None,
        })
        .unwrap();
    assert_eq!(value["diagnostics"][0]["severity"], 1);
    assert_eq!(value["diagnostics"][0]["source"], "unrecognized-term");
}

//! Session layer over the Ordo analysis kernel.
//!
//! `ordo-session` turns [`ordo_core`] into an event-driven language session: a
//! host feeds it [`ClientEvent`]s from its transport and receives
//! [`ServerNotification`]s through subscribers plus a direct response for
//! completion requests. Events for one document are handled strictly in
//! arrival order; failures never escape the document that caused them.
//!
//! ```
//! use ordo_session::{ClientEvent, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.handle(ClientEvent::Open {
//!     uri: "file:///pipeline.ordo".to_string(),
//!     text: "let x = 1;".to_string(),
//!     version: 1,
//! });
//!
//! let response = session.handle(ClientEvent::Completion {
//!     uri: "file:///pipeline.ordo".to_string(),
//!     offset: 0,
//! });
//! assert!(response.is_some());
//! ```

#![warn(missing_docs)]

pub mod events;
pub mod session;

pub use events::{ClientEvent, CompletionResponse, ServerNotification};
pub use session::{Session, SessionConfig};

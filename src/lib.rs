//! Anchors proposed grammar and word-choice edits in a live document,
//! keeps them valid while the document changes and applies or drops them
//! on request.

pub mod config;
pub mod document;
pub mod drafts;
pub mod editor;
pub mod error;
pub mod interaction;
pub mod locator;
pub mod markup;
pub mod oracle;
pub mod render;
pub mod session;
pub mod store;
pub mod suggestion;
pub mod text;
pub mod theme;

pub use document::{AnyDocument, PlainDocument, RangeableDocument};
pub use editor::StructuredDocument;
pub use error::{DraftError, OracleError};
pub use locator::{Locator, LocatorConfig};
pub use render::{MarkedDocument, MarkedSegment, mark_segments};
pub use session::{CheckOutcome, CheckTicket, SuggestionSession};
pub use store::SuggestionStore;
pub use suggestion::{
    MatchConfidence, ProposedEdit, Suggestion, SuggestionId, SuggestionKind, SuggestionState,
    TextEdit, TextRange,
};

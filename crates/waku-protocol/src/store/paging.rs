//! Pagination state machine for history queries.
//!
//! Pure: given what one round trip produced, decide whether to request
//! another page. Every terminal state is reached without further I/O, and
//! `Continue` is only produced when the server handed us a cursor for a
//! full page.

use crate::error::ErrorKind;

use super::rpc::Index;

/// State of a history query after a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// Full page with a cursor: ask for the next page.
    Continue(Index),
    /// Server returned no messages. Nothing left (or nothing stored).
    DoneEmpty,
    /// Page shorter than requested: this was the last page.
    DonePartial,
    /// Full page but no cursor. Stop rather than re-request the same page.
    DoneNoCursor,
    /// Round trip failed; the result holds whatever arrived before.
    Aborted(ErrorKind),
}

impl PageState {
    /// Transition after receiving `received` messages.
    ///
    /// `reported` is the page size the server claims to have returned
    /// (zero/missing is ignored). A short report can end the query; it
    /// never extends one past a short page.
    pub fn next(
        requested: u64,
        received: usize,
        reported: Option<u64>,
        cursor: Option<Index>,
    ) -> Self {
        if received == 0 {
            return PageState::DoneEmpty;
        }

        let received = received as u64;
        let page = reported
            .filter(|&n| n > 0)
            .map_or(received, |n| n.min(received));
        if page < requested {
            return PageState::DonePartial;
        }

        match cursor {
            Some(cursor) => PageState::Continue(cursor),
            None => PageState::DoneNoCursor,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PageState::Continue(_))
    }

    /// Whether the query stopped on an error rather than running out of pages.
    pub fn is_aborted(&self) -> bool {
        matches!(self, PageState::Aborted(_))
    }
}

use proptest::prelude::*;
use waku_protocol::{Index, PageState};

fn arb_index() -> impl Strategy<Value = Index> {
    (prop::collection::vec(any::<u8>(), 0..32), any::<u32>()).prop_map(|(digest, t)| Index {
        digest,
        received_time: t as f64,
        sender_time: t as f64,
        pubsub_topic: "/waku/2/default-waku/proto".into(),
    })
}

proptest! {
    /// A page with fewer messages than requested always ends the query,
    /// whatever page size the server claims.
    #[test]
    fn short_page_is_terminal(
        requested in 1..200u64,
        shortfall in 1..200u64,
        reported in prop::option::of(0..400u64),
        cursor in prop::option::of(arb_index()),
    ) {
        let received = requested.saturating_sub(shortfall) as usize;
        let state = PageState::next(requested, received, reported, cursor);
        prop_assert!(state.is_terminal());
        prop_assert!(!state.is_aborted());
    }

    /// Without a cursor there is never a next page.
    #[test]
    fn missing_cursor_is_terminal(
        requested in 1..200u64,
        received in 0..400usize,
        reported in prop::option::of(0..400u64),
    ) {
        let state = PageState::next(requested, received, reported, None);
        prop_assert!(state.is_terminal());
    }

    /// Continue echoes the server's cursor unchanged.
    #[test]
    fn continue_carries_cursor(
        requested in 1..200u64,
        extra in 0..50usize,
        cursor in arb_index(),
    ) {
        let received = requested as usize + extra;
        let state = PageState::next(requested, received, None, Some(cursor.clone()));
        prop_assert_eq!(state, PageState::Continue(cursor));
    }

    /// The server-reported size wins over the received count when non-zero.
    #[test]
    fn reported_size_takes_precedence(
        requested in 2..200u64,
        cursor in arb_index(),
    ) {
        // Full page received, but the server says it was short.
        let received = requested as usize;
        let state = PageState::next(requested, received, Some(requested - 1), Some(cursor));
        prop_assert_eq!(state, PageState::DonePartial);
    }
}

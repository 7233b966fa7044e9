use crate::models::{MatchStatus, SwipeAction};

/// What a swipe does to the pair's two directional match records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairChange {
    /// Both directions become mutual.
    Matched,
    /// Only swiper → target becomes pending.
    Pending,
    /// Both directions become rejected.
    Rejected,
    Unchanged,
}

/// Decide the pair transition for `action`, given the target's standing swipe
/// toward the swiper and the current status of both match directions.
pub fn decide(
    action: SwipeAction,
    reciprocal: Option<SwipeAction>,
    outgoing: Option<MatchStatus>,
    incoming: Option<MatchStatus>,
) -> PairChange {
    // Unmatched pairs stay unmatched; mutual pairs only end via an explicit unmatch.
    let settled = |s: Option<MatchStatus>| {
        matches!(s, Some(MatchStatus::Unmatched) | Some(MatchStatus::Mutual))
    };
    if settled(outgoing) || settled(incoming) {
        return PairChange::Unchanged;
    }

    let reciprocated = reciprocal.is_some_and(|r| r.is_positive());
    match (action.is_positive(), reciprocated) {
        (true, true) => PairChange::Matched,
        (true, false) => PairChange::Pending,
        (false, true) => PairChange::Rejected,
        (false, false) => PairChange::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use MatchStatus::*;
    use SwipeAction::*;

    #[test]
    fn reciprocal_likes_match() {
        assert_eq!(decide(Like, Some(Like), None, Some(Pending)), PairChange::Matched);
        assert_eq!(decide(Superlike, Some(Like), None, Some(Pending)), PairChange::Matched);
        assert_eq!(decide(Like, Some(Superlike), Some(Pending), Some(Pending)), PairChange::Matched);
    }

    #[test]
    fn unreciprocated_like_is_pending() {
        assert_eq!(decide(Like, None, None, None), PairChange::Pending);
        assert_eq!(decide(Like, Some(Pass), None, None), PairChange::Pending);
    }

    #[test]
    fn passing_on_an_admirer_rejects() {
        assert_eq!(decide(Pass, Some(Like), None, Some(Pending)), PairChange::Rejected);
        assert_eq!(decide(Pass, None, None, None), PairChange::Unchanged);
    }

    #[test]
    fn unmatched_pairs_are_never_revived() {
        assert_eq!(decide(Like, Some(Like), Some(Unmatched), Some(Unmatched)), PairChange::Unchanged);
        assert_eq!(decide(Like, Some(Like), None, Some(Unmatched)), PairChange::Unchanged);
    }

    #[test]
    fn swipes_on_a_mutual_match_change_nothing() {
        assert_eq!(decide(Pass, Some(Like), Some(Mutual), Some(Mutual)), PairChange::Unchanged);
        assert_eq!(decide(Like, Some(Like), Some(Mutual), Some(Mutual)), PairChange::Unchanged);
    }

    #[test]
    fn rejected_pair_can_rematch_after_new_likes() {
        assert_eq!(decide(Like, Some(Like), Some(Rejected), Some(Rejected)), PairChange::Matched);
    }
}

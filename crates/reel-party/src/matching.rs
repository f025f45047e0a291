//! Match detection. Always recomputed from the current document, so a like
//! toggled off undoes a match without any bookkeeping.

use std::collections::HashSet;

use uuid::Uuid;

use reel_types::api::MatchStatusResponse;

use crate::aggregate::Party;

/// True when the party has members and the people liking `movie_id` are
/// exactly its current members.
///
/// A like left by someone outside the member list (a former member, or a
/// user who never joined) keeps the sets apart and blocks the match.
pub fn is_match(party: &Party, movie_id: &str) -> bool {
    if party.members.is_empty() {
        return false;
    }
    let likers: HashSet<Uuid> = party.likers(movie_id).collect();
    let members: HashSet<Uuid> = party.members.iter().map(|m| m.user_id).collect();
    likers == members
}

/// Match state plus everyone who liked the movie, in like order.
pub fn match_status(party: &Party, movie_id: &str) -> MatchStatusResponse {
    let members_who_liked = party.likers(movie_id).collect();

    MatchStatusResponse {
        is_match: is_match(party, movie_id),
        members_who_liked,
        total_members: party.members.len(),
    }
}

#[cfg(test)]
mod tests {
    use reel_types::models::PartyMovie;

    use super::*;

    fn party_with(members: &[Uuid]) -> Party {
        let mut party = Party::new("ABC234".into(), "Friday", members[0], vec![]).unwrap();
        for m in &members[1..] {
            party.join(*m, vec![]);
        }
        party.track_movie(PartyMovie {
            movie_id: "550".into(),
            title: "Fight Club".into(),
            poster_path: None,
        });
        party
    }

    #[test]
    fn needs_every_member() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut party = party_with(&[a, b]);

        party.toggle_like("550", a).unwrap();
        assert!(!is_match(&party, "550"));

        party.toggle_like("550", b).unwrap();
        assert!(is_match(&party, "550"));

        party.toggle_like("550", b).unwrap();
        assert!(!is_match(&party, "550"));
    }

    #[test]
    fn unliked_movie_never_matches() {
        let party = party_with(&[Uuid::new_v4()]);
        assert!(!is_match(&party, "550"));
        assert!(!is_match(&party, "unknown"));
    }

    #[test]
    fn empty_party_never_matches() {
        let a = Uuid::new_v4();
        let mut party = party_with(&[a]);
        party.toggle_like("550", a).unwrap();
        party.members.clear();
        assert!(!is_match(&party, "550"));
    }

    #[test]
    fn former_member_like_blocks_the_match() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut party = party_with(&[a, b, c]);

        party.toggle_like("550", c).unwrap();
        party.leave(c).unwrap();
        party.toggle_like("550", a).unwrap();
        party.toggle_like("550", b).unwrap();
        assert!(!is_match(&party, "550"));

        let status = match_status(&party, "550");
        assert_eq!(status.members_who_liked, vec![c, a, b]);
        assert_eq!(status.total_members, 2);

        // Dropping the stray like makes the sets equal again
        party.toggle_like("550", c).unwrap();
        assert!(is_match(&party, "550"));
    }

    #[test]
    fn outsider_like_blocks_the_match() {
        let (a, outsider) = (Uuid::new_v4(), Uuid::new_v4());
        let mut party = party_with(&[a]);

        party.toggle_like("550", outsider).unwrap();
        party.toggle_like("550", a).unwrap();
        assert!(!is_match(&party, "550"));

        party.join(outsider, vec![]);
        assert!(is_match(&party, "550"));
    }

    #[test]
    fn status_counts_partial_likes() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut party = party_with(&[a, b]);
        party.toggle_like("550", b).unwrap();

        assert_eq!(
            match_status(&party, "550"),
            MatchStatusResponse {
                is_match: false,
                members_who_liked: vec![b],
                total_members: 2,
            }
        );
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reel_types::models::{MovieLike, PartyMember, PartyMovie};

use crate::error::{PartyError, PartyResult};

/// The stored party document. Every mutation goes through the methods
/// below so the membership, roster and like invariants hold on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: Uuid,
    pub short_code: String,
    pub title: String,
    pub host_id: Uuid,
    #[serde(default)]
    pub host_genres: Vec<String>,
    pub members: Vec<PartyMember>,
    #[serde(default)]
    pub movies: Vec<PartyMovie>,
    #[serde(default)]
    pub likes: Vec<MovieLike>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Other members remain; the party is saved without the leaver.
    Remaining,
    /// The member list is now empty and the party must be deleted.
    Emptied,
}

impl Party {
    /// A fresh party whose only member is the host.
    pub fn new(short_code: String, title: &str, host_id: Uuid, host_genres: Vec<String>) -> PartyResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PartyError::validation("party title is required"));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            short_code,
            title: title.to_string(),
            host_id,
            members: vec![PartyMember {
                user_id: host_id,
                selected_genres: host_genres.clone(),
            }],
            host_genres,
            movies: vec![],
            likes: vec![],
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn movie(&self, movie_id: &str) -> Option<&PartyMovie> {
        self.movies.iter().find(|m| m.movie_id == movie_id)
    }

    /// Add `user_id` with the given genres. Returns false, leaving the party
    /// untouched, when they already belong to it.
    pub fn join(&mut self, user_id: Uuid, selected_genres: Vec<String>) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(PartyMember {
            user_id,
            selected_genres,
        });
        self.touch();
        true
    }

    /// Remove a member. Their likes stay in place and count again if they
    /// rejoin.
    pub fn leave(&mut self, user_id: Uuid) -> PartyResult<LeaveOutcome> {
        let before = self.members.len();
        self.members.retain(|m| m.user_id != user_id);
        if self.members.len() == before {
            return Err(PartyError::NotAMember);
        }
        self.touch();

        if self.members.is_empty() {
            Ok(LeaveOutcome::Emptied)
        } else {
            Ok(LeaveOutcome::Remaining)
        }
    }

    /// Add a movie to the roster on behalf of a member.
    pub fn add_movie(&mut self, requester: Uuid, movie: PartyMovie) -> PartyResult<()> {
        if !self.is_member(requester) {
            return Err(PartyError::NotAMember);
        }
        if self.movie(&movie.movie_id).is_some() {
            return Err(PartyError::DuplicateMovie(movie.movie_id));
        }
        self.movies.push(movie);
        self.touch();
        Ok(())
    }

    /// Append a movie unless the roster already has it. Used when a like
    /// names a movie nobody added yet.
    pub fn track_movie(&mut self, movie: PartyMovie) -> bool {
        if self.movie(&movie.movie_id).is_some() {
            return false;
        }
        self.movies.push(movie);
        self.touch();
        true
    }

    /// Flip `user_id`'s like on a rostered movie. Returns whether the like
    /// is present afterwards.
    pub fn toggle_like(&mut self, movie_id: &str, user_id: Uuid) -> PartyResult<bool> {
        if self.movie(movie_id).is_none() {
            return Err(PartyError::MovieNotTracked(movie_id.to_string()));
        }

        let existing = self
            .likes
            .iter()
            .position(|l| l.movie_id == movie_id && l.user_id == user_id);
        let liked = match existing {
            Some(idx) => {
                self.likes.remove(idx);
                false
            }
            None => {
                self.likes.push(MovieLike {
                    movie_id: movie_id.to_string(),
                    user_id,
                });
                true
            }
        };
        self.touch();
        Ok(liked)
    }

    /// Everyone who currently has a like on `movie_id`, former members included.
    pub fn likers<'a>(&'a self, movie_id: &'a str) -> impl Iterator<Item = Uuid> + 'a {
        self.likes
            .iter()
            .filter(move |l| l.movie_id == movie_id)
            .map(|l| l.user_id)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(host: Uuid) -> Party {
        Party::new("ABC234".into(), "  Friday night ", host, vec!["Drama".into()]).unwrap()
    }

    fn movie(id: &str) -> PartyMovie {
        PartyMovie {
            movie_id: id.into(),
            title: format!("Movie {}", id),
            poster_path: None,
        }
    }

    #[test]
    fn host_is_the_first_member() {
        let host = Uuid::new_v4();
        let p = party(host);
        assert_eq!(p.title, "Friday night");
        assert_eq!(p.members.len(), 1);
        assert_eq!(p.members[0].user_id, host);
        assert_eq!(p.members[0].selected_genres, vec!["Drama"]);
    }

    #[test]
    fn blank_title_is_rejected() {
        let res = Party::new("ABC234".into(), "   ", Uuid::new_v4(), vec![]);
        assert!(matches!(res, Err(PartyError::Validation(_))));
    }

    #[test]
    fn join_is_idempotent() {
        let mut p = party(Uuid::new_v4());
        let guest = Uuid::new_v4();
        assert!(p.join(guest, vec!["Action".into()]));
        assert!(!p.join(guest, vec!["Horror".into()]));

        let entries: Vec<_> = p.members.iter().filter(|m| m.user_id == guest).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].selected_genres, vec!["Action"]);
    }

    #[test]
    fn toggling_alternates_presence() {
        let host = Uuid::new_v4();
        let mut p = party(host);
        p.track_movie(movie("550"));

        for n in 1..=5 {
            let liked = p.toggle_like("550", host).unwrap();
            assert_eq!(liked, n % 2 == 1);
            assert_eq!(p.likers("550").count(), usize::from(liked));
        }
    }

    #[test]
    fn likes_need_a_rostered_movie() {
        let host = Uuid::new_v4();
        let mut p = party(host);
        assert!(matches!(
            p.toggle_like("550", host),
            Err(PartyError::MovieNotTracked(_))
        ));
        assert!(p.likes.is_empty());
    }

    #[test]
    fn leaving_keeps_likes() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut p = party(host);
        p.join(guest, vec![]);
        p.track_movie(movie("550"));
        p.toggle_like("550", guest).unwrap();

        assert_eq!(p.leave(guest).unwrap(), LeaveOutcome::Remaining);
        assert!(!p.is_member(guest));
        assert_eq!(p.likers("550").collect::<Vec<_>>(), vec![guest]);
    }

    #[test]
    fn leaving_twice_is_not_a_member() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut p = party(host);
        p.join(guest, vec![]);
        p.leave(guest).unwrap();
        assert!(matches!(p.leave(guest), Err(PartyError::NotAMember)));
    }

    #[test]
    fn last_member_leaving_empties_the_party() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut p = party(host);
        p.join(guest, vec![]);

        assert_eq!(p.leave(host).unwrap(), LeaveOutcome::Remaining);
        assert_eq!(p.host_id, host);
        assert_eq!(p.leave(guest).unwrap(), LeaveOutcome::Emptied);
    }

    #[test]
    fn duplicate_movie_leaves_roster_unchanged() {
        let host = Uuid::new_v4();
        let mut p = party(host);
        p.add_movie(host, movie("550")).unwrap();
        assert!(matches!(
            p.add_movie(host, movie("550")),
            Err(PartyError::DuplicateMovie(_))
        ));
        assert_eq!(p.movies.len(), 1);
    }

    #[test]
    fn only_members_add_movies() {
        let mut p = party(Uuid::new_v4());
        assert!(matches!(
            p.add_movie(Uuid::new_v4(), movie("550")),
            Err(PartyError::NotAMember)
        ));
        assert!(p.movies.is_empty());
    }

    #[test]
    fn document_round_trips_through_json() {
        let host = Uuid::new_v4();
        let mut p = party(host);
        p.track_movie(movie("550"));
        p.toggle_like("550", host).unwrap();

        let doc = serde_json::to_string(&p).unwrap();
        let back: Party = serde_json::from_str(&doc).unwrap();
        assert_eq!(back, p);
    }
}

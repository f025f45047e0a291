use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use reel_catalog::{Catalog, DiscoverQuery, MovieList, MovieSummary, canonical_movie_id};
use reel_db::models::{PartyRow, UserRow};
use reel_db::{Database, DbError};
use reel_gateway::RoomPublisher;
use reel_types::api::{AddMovieRequest, MatchStatusResponse};
use reel_types::events::RoomEvent;
use reel_types::models::{MemberView, PartyMovie, PartyView, UserSummary};

use crate::aggregate::{LeaveOutcome, Party};
use crate::error::{PartyError, PartyResult};
use crate::matching;
use crate::short_code::{self, MAX_ATTEMPTS, RandomCodes, ShortCodeSource};

/// Load-mutate-save cycles attempted before a write is reported as a conflict.
const MAX_WRITE_ATTEMPTS: usize = 3;
const SUGGESTION_LIMIT: usize = 20;
const SUGGESTION_MIN_VOTES: u32 = 100;

/// Outcome of a leave request.
#[derive(Debug, Clone)]
pub struct LeaveResult {
    pub party_deleted: bool,
    /// The remaining party, absent when it was deleted.
    pub party: Option<PartyView>,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone)]
pub struct LikeResult {
    pub party: PartyView,
    pub is_match: bool,
    pub liked: bool,
}

/// A party document and the row version it was read at.
struct Stored {
    party: Party,
    version: i64,
}

impl Stored {
    fn decode(row: PartyRow) -> PartyResult<Self> {
        let party = serde_json::from_str(&row.doc).map_err(|e| PartyError::Storage(e.into()))?;
        Ok(Self {
            party,
            version: row.version,
        })
    }
}

/// What to do with a mutated document.
enum Write {
    Save,
    Delete,
    Unchanged,
}

/// Orchestrates party actions: load, validate, mutate, persist, detect
/// matches, then announce the change to the party's room.
pub struct PartyService {
    db: Arc<Database>,
    catalog: Arc<dyn Catalog>,
    rooms: Arc<dyn RoomPublisher>,
    codes: Arc<dyn ShortCodeSource>,
}

impl PartyService {
    pub fn new(db: Arc<Database>, catalog: Arc<dyn Catalog>, rooms: Arc<dyn RoomPublisher>) -> Self {
        Self {
            db,
            catalog,
            rooms,
            codes: Arc::new(RandomCodes),
        }
    }

    /// Replace the short-code generator.
    pub fn with_codes(mut self, codes: Arc<dyn ShortCodeSource>) -> Self {
        self.codes = codes;
        self
    }

    pub async fn create(
        &self,
        host_id: Uuid,
        title: &str,
        host_genres: Vec<String>,
        initial_movie: Option<&str>,
    ) -> PartyResult<PartyView> {
        if title.trim().is_empty() {
            return Err(PartyError::validation("party title is required"));
        }
        self.user(host_id).await?;

        let code = self.unique_code().await?;
        let mut party = Party::new(code, title, host_id, host_genres)?;

        if let Some(movie_id) = initial_movie {
            match self.catalog.movie(movie_id).await {
                Ok(details) => {
                    party.track_movie(PartyMovie {
                        movie_id: details.id().to_string(),
                        title: details.title().to_string(),
                        poster_path: details.summary.poster_path.clone(),
                    });
                }
                Err(e) => warn!(movie_id, error = %e, "Skipping initial movie"),
            }
        }

        let doc = encode(&party)?;
        let (id, code, host) = (party.id.to_string(), party.short_code.clone(), host_id.to_string());
        self.blocking(move |db| db.insert_party(&id, &code, &host, &doc))
            .await?;

        info!("Party {} ({}) created by {}", party.id, party.short_code, host_id);
        self.view(party).await
    }

    pub async fn get(&self, party_id: Uuid) -> PartyResult<PartyView> {
        let stored = self.load(party_id).await?;
        self.view(stored.party).await
    }

    pub async fn get_by_code(&self, short_code: &str) -> PartyResult<PartyView> {
        let stored = self.load_by_code(short_code).await?;
        self.view(stored.party).await
    }

    /// All parties, newest first.
    pub async fn list(&self) -> PartyResult<Vec<PartyView>> {
        let rows = self.blocking(|db| db.list_parties()).await?;
        let parties = rows
            .into_iter()
            .map(|row| Stored::decode(row).map(|s| s.party))
            .collect::<PartyResult<Vec<_>>>()?;
        self.populate(parties).await
    }

    /// Join by short code. Joining a party you already belong to returns it
    /// unchanged and announces nothing.
    pub async fn join(
        &self,
        short_code: &str,
        user_id: Uuid,
        requested_genres: Option<Vec<String>>,
    ) -> PartyResult<PartyView> {
        let stored = self.load_by_code(short_code).await?;
        if stored.party.is_member(user_id) {
            return self.view(stored.party).await;
        }

        let user = self.user(user_id).await?;
        let genres = requested_genres.unwrap_or_else(|| user.favorite_genres.clone());

        let (party, joined) = self
            .modify(stored, |party| {
                let joined = party.join(user_id, genres.clone());
                Ok((if joined { Write::Save } else { Write::Unchanged }, joined))
            })
            .await?;

        let view = self.view(party).await?;
        if joined {
            info!("{} joined party {}", user.name, view.id);
            self.rooms
                .publish(
                    &view.id.to_string(),
                    RoomEvent::Joined {
                        user_id,
                        user_name: user.name,
                        user_photo: user.photo,
                        party: view.clone(),
                    },
                )
                .await;
        }
        Ok(view)
    }

    /// Leave a party. The party is deleted once nobody is left in it.
    pub async fn leave(&self, party_id: Uuid, user_id: Uuid, user_name: &str) -> PartyResult<LeaveResult> {
        let stored = self.load(party_id).await?;
        let (party, outcome) = self
            .modify(stored, |party| {
                let outcome = party.leave(user_id)?;
                let write = match outcome {
                    LeaveOutcome::Remaining => Write::Save,
                    LeaveOutcome::Emptied => Write::Delete,
                };
                Ok((write, outcome))
            })
            .await?;

        let party_deleted = outcome == LeaveOutcome::Emptied;
        let view = if party_deleted {
            info!("{} left party {}, party deleted", user_name, party_id);
            None
        } else {
            info!("{} left party {}", user_name, party_id);
            Some(self.view(party).await?)
        };

        self.rooms
            .publish(
                &party_id.to_string(),
                RoomEvent::Left {
                    user_id,
                    user_name: user_name.to_string(),
                    party_id,
                    party_deleted,
                    party: view.clone(),
                },
            )
            .await;

        Ok(LeaveResult {
            party_deleted,
            party: view,
        })
    }

    pub async fn add_movie(&self, party_id: Uuid, requester: Uuid, req: AddMovieRequest) -> PartyResult<PartyView> {
        let movie_id = req
            .movie_id
            .ok_or_else(|| PartyError::validation("movie id is required"))
            .and_then(|id| movie_key(&id))?;
        let title = req
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PartyError::validation("movie title is required"))?;
        let movie = PartyMovie {
            movie_id,
            title,
            poster_path: req.poster_path.filter(|p| !p.is_empty()),
        };

        let stored = self.load(party_id).await?;
        let (party, ()) = self
            .modify(stored, |party| {
                party.add_movie(requester, movie.clone())?;
                Ok((Write::Save, ()))
            })
            .await?;

        debug!("Movie {} added to party {}", movie.movie_id, party_id);
        self.view(party).await
    }

    /// Flip the caller's like on a movie, pulling the movie from the catalog
    /// first if the party has not seen it yet.
    pub async fn toggle_like(&self, party_id: Uuid, movie_id: &str, user_id: Uuid) -> PartyResult<LikeResult> {
        let key = movie_key(movie_id)?;
        let movie_id = key.as_str();

        let stored = self.load(party_id).await?;
        let fetched = match stored.party.movie(movie_id) {
            Some(_) => None,
            None => {
                let details = self
                    .catalog
                    .movie(movie_id)
                    .await
                    .map_err(|e| PartyError::lookup(movie_id, e))?;
                Some(PartyMovie {
                    movie_id: movie_id.to_string(),
                    title: details.title().to_string(),
                    poster_path: details.summary.poster_path.clone(),
                })
            }
        };

        let (party, liked) = self
            .modify(stored, |party| {
                if let Some(movie) = &fetched {
                    party.track_movie(movie.clone());
                }
                let liked = party.toggle_like(movie_id, user_id)?;
                Ok((Write::Save, liked))
            })
            .await?;

        let is_match = matching::is_match(&party, movie_id);
        let matched_movie = party.movie(movie_id).cloned();
        let view = self.view(party).await?;

        if let Some(movie) = matched_movie.filter(|_| liked && is_match) {
            info!("Match found in party {} on {}", party_id, movie.title);
            self.rooms
                .publish(
                    &party_id.to_string(),
                    RoomEvent::MatchFound {
                        message: format!("It's a match! Everyone liked \"{}\"", movie.title),
                        matched_movie: movie,
                        party: view.clone(),
                    },
                )
                .await;
        }

        Ok(LikeResult {
            party: view,
            is_match,
            liked,
        })
    }

    /// Recompute the match state for a movie without changing anything.
    pub async fn match_status(&self, party_id: Uuid, movie_id: &str) -> PartyResult<MatchStatusResponse> {
        let movie_id = movie_key(movie_id)?;
        let stored = self.load(party_id).await?;
        Ok(matching::match_status(&stored.party, &movie_id))
    }

    /// Movies matching the genres picked by the host and the members. Falls
    /// back to the popular list when none of them resolve.
    pub async fn suggestions(&self, party_id: Uuid, page: u32) -> PartyResult<Vec<MovieSummary>> {
        let party = self.load(party_id).await?.party;

        let mut names: Vec<String> = Vec::new();
        let picked = party
            .host_genres
            .iter()
            .chain(party.members.iter().flat_map(|m| m.selected_genres.iter()));
        for name in picked {
            let name = name.trim().to_lowercase();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }

        let mut genre_ids = Vec::new();
        for name in &names {
            if let Some(id) = self.catalog.genre_id(name).await? {
                if !genre_ids.contains(&id) {
                    genre_ids.push(id);
                }
            }
        }

        let mut movies = if genre_ids.is_empty() {
            debug!("Party {} has no resolvable genres, suggesting popular movies", party_id);
            self.catalog.list(MovieList::Popular, page).await?
        } else {
            self.catalog
                .discover(&DiscoverQuery {
                    genre_ids,
                    page,
                    min_votes: Some(SUGGESTION_MIN_VOTES),
                })
                .await?
        };
        movies.truncate(SUGGESTION_LIMIT);
        Ok(movies)
    }

    // -- Internals --

    /// Run a blocking storage call off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> PartyResult<T>
    where
        F: FnOnce(&Database) -> reel_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        Ok(tokio::task::spawn_blocking(move || f(&db)).await??)
    }

    async fn load(&self, party_id: Uuid) -> PartyResult<Stored> {
        let id = party_id.to_string();
        let row = self
            .blocking(move |db| db.get_party(&id))
            .await?
            .ok_or(PartyError::PartyNotFound)?;
        Stored::decode(row)
    }

    async fn load_by_code(&self, short_code: &str) -> PartyResult<Stored> {
        let code = short_code::normalize(short_code);
        let row = self
            .blocking(move |db| db.get_party_by_code(&code))
            .await?
            .ok_or(PartyError::PartyNotFound)?;
        Stored::decode(row)
    }

    async fn user(&self, user_id: Uuid) -> PartyResult<UserRow> {
        let id = user_id.to_string();
        self.blocking(move |db| db.get_user_by_id(&id))
            .await?
            .ok_or(PartyError::UserNotFound)
    }

    async fn unique_code(&self) -> PartyResult<String> {
        for attempt in 1..=MAX_ATTEMPTS {
            let code = self.codes.generate();
            let candidate = code.clone();
            if !self.blocking(move |db| db.short_code_exists(&candidate)).await? {
                return Ok(code);
            }
            debug!(attempt, code, "Short code already taken");
        }
        warn!("Gave up generating a short code after {} attempts", MAX_ATTEMPTS);
        Err(PartyError::CodeGenerationExhausted(MAX_ATTEMPTS))
    }

    /// Apply `apply` to the document and write it back with a version check.
    /// A concurrent writer makes the whole cycle start over from a fresh read.
    async fn modify<T, F>(&self, mut stored: Stored, mut apply: F) -> PartyResult<(Party, T)>
    where
        F: FnMut(&mut Party) -> PartyResult<(Write, T)>,
    {
        let party_id = stored.party.id;
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut party = stored.party;
            let (write, out) = apply(&mut party)?;

            let id = party_id.to_string();
            let version = stored.version;
            let written = match write {
                Write::Unchanged => return Ok((party, out)),
                Write::Save => {
                    let doc = encode(&party)?;
                    self.blocking(move |db| db.update_party(&id, version, &doc).map(|_| ()))
                        .await
                }
                Write::Delete => self.blocking(move |db| db.delete_party(&id, version)).await,
            };

            match written {
                Ok(()) => return Ok((party, out)),
                Err(PartyError::Storage(DbError::StaleVersion(_))) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(attempt, "Party {} changed underneath us, reloading", party_id);
                    stored = self.load(party_id).await?;
                }
                Err(PartyError::Storage(DbError::StaleVersion(_))) => break,
                Err(e) => return Err(e),
            }
        }

        warn!("Party {} write lost {} races in a row", party_id, MAX_WRITE_ATTEMPTS);
        Err(PartyError::Conflict(party_id.to_string()))
    }

    async fn view(&self, party: Party) -> PartyResult<PartyView> {
        self.populate(vec![party])
            .await?
            .pop()
            .ok_or(PartyError::PartyNotFound)
    }

    /// Resolve host and member identities with one user query for the batch.
    async fn populate(&self, parties: Vec<Party>) -> PartyResult<Vec<PartyView>> {
        let mut ids: Vec<String> = parties
            .iter()
            .flat_map(|p| std::iter::once(p.host_id).chain(p.members.iter().map(|m| m.user_id)))
            .map(|id| id.to_string())
            .collect();
        ids.sort();
        ids.dedup();

        let rows = self.blocking(move |db| db.get_users_by_ids(&ids)).await?;
        let users: HashMap<Uuid, UserSummary> = rows
            .iter()
            .filter_map(user_summary)
            .map(|u| (u.id, u))
            .collect();

        Ok(parties.into_iter().map(|p| render(p, &users)).collect())
    }
}

/// The roster and like key for a movie. Only catalog ids are accepted so
/// one film never ends up under two spellings.
fn movie_key(raw: &str) -> PartyResult<String> {
    canonical_movie_id(raw).ok_or_else(|| PartyError::validation(format!("{:?} is not a valid movie id", raw.trim())))
}

fn encode(party: &Party) -> PartyResult<String> {
    serde_json::to_string(party).map_err(|e| PartyError::Storage(e.into()))
}

fn user_summary(row: &UserRow) -> Option<UserSummary> {
    let id = Uuid::parse_str(&row.id).ok()?;
    Some(UserSummary {
        id,
        name: row.name.clone(),
        email: row.email.clone(),
        photo: row.photo.clone(),
    })
}

fn render(party: Party, users: &HashMap<Uuid, UserSummary>) -> PartyView {
    PartyView {
        id: party.id,
        short_code: party.short_code,
        title: party.title,
        host_id: party.host_id,
        host: users.get(&party.host_id).cloned(),
        host_genres: party.host_genres,
        members: party
            .members
            .into_iter()
            .map(|m| MemberView {
                user: users.get(&m.user_id).cloned(),
                user_id: m.user_id,
                selected_genres: m.selected_genres,
            })
            .collect(),
        movies: party.movies,
        likes: party.likes,
        created_at: party.created_at,
        updated_at: party.updated_at,
    }
}

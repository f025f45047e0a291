use serde::{Deserialize, Serialize};

/// Curated catalog lists exposed by the proxy routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieList {
    Popular,
    Trending,
    NowPlaying,
    TopRated,
}

impl MovieList {
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Popular => "/movie/popular",
            Self::Trending => "/trending/movie/week",
            Self::NowPlaying => "/movie/now_playing",
            Self::TopRated => "/movie/top_rated",
        }
    }
}

/// Normalised movie card, image paths already expanded to URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    pub api_movie_id: String,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub year: Option<String>,
    pub rating: Option<f64>,
    pub vote_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub runtime: Option<u32>,
    /// Human readable runtime, e.g. "2h 16min", or "N/A".
    pub duration: String,
    pub genres: Vec<String>,
    pub cast: Vec<CastMember>,
    pub director: Option<String>,
    pub trailer_key: Option<String>,
}

impl MovieDetails {
    pub fn id(&self) -> &str {
        &self.summary.api_movie_id
    }

    pub fn title(&self) -> &str {
        &self.summary.title
    }
}

pub fn format_duration(runtime: Option<u32>) -> String {
    match runtime {
        Some(minutes) if minutes > 0 => format!("{}h {}min", minutes / 60, minutes % 60),
        _ => "N/A".to_string(),
    }
}

/// Canonical form of a catalog movie id: a positive decimal number with no
/// sign or leading zeros. Anything else is not a catalog id.
pub fn canonical_movie_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Some(136)), "2h 16min");
        assert_eq!(format_duration(Some(45)), "0h 45min");
        assert_eq!(format_duration(Some(0)), "N/A");
        assert_eq!(format_duration(None), "N/A");
    }

    #[test]
    fn movie_ids_are_canonicalised() {
        assert_eq!(canonical_movie_id(" 550 ").as_deref(), Some("550"));
        assert_eq!(canonical_movie_id("0550").as_deref(), Some("550"));
        assert_eq!(canonical_movie_id("0"), None);
        assert_eq!(canonical_movie_id(""), None);
        assert_eq!(canonical_movie_id("+550"), None);
        assert_eq!(canonical_movie_id("550-fight-club"), None);
        assert_eq!(canonical_movie_id("../550"), None);
        assert_eq!(canonical_movie_id("99999999999999999999999"), None);
    }
}

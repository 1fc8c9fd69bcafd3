use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{release_year, MovieId, MovieRef};

/// Catalog list entries carry the same fields as a cached movie snapshot
pub type MovieSummary = MovieRef;

/// Upper bound on the page count reported to callers
pub const MAX_TOTAL_PAGES: i64 = 500;

/// Curated movie lists offered by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Trending,
    TopRated,
    Upcoming,
}

impl ListKind {
    /// Catalog endpoint path for this list
    pub fn path(self) -> &'static str {
        match self {
            ListKind::Trending => "trending/movie/week",
            ListKind::TopRated => "movie/top_rated",
            ListKind::Upcoming => "movie/upcoming",
        }
    }
}

impl Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListKind::Trending => write!(f, "trending"),
            ListKind::TopRated => write!(f, "top_rated"),
            ListKind::Upcoming => write!(f, "upcoming"),
        }
    }
}

/// Optional sections embedded in a movie detail response
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Credits,
    Videos,
}

impl Include {
    pub fn as_str(self) -> &'static str {
        match self {
            Include::Credits => "credits",
            Include::Videos => "videos",
        }
    }

    /// Parses a comma separated list, ignoring unknown and blank entries
    pub fn parse_list(raw: &str) -> Vec<Include> {
        let mut includes: Vec<Include> = raw
            .split(',')
            .filter_map(|part| match part.trim().to_lowercase().as_str() {
                "credits" => Some(Include::Credits),
                "videos" => Some(Include::Videos),
                _ => None,
            })
            .collect();
        includes.sort();
        includes.dedup();
        includes
    }
}

/// One page of catalog results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: i64,
    pub total_pages: i64,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: String,
    pub profile_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: String,
    pub profile_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    pub official: bool,
}

/// Full movie record as returned by the catalog, with every field defaulted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetail {
    pub id: MovieId,
    pub title: String,
    pub tagline: String,
    pub overview: String,
    pub release_date: String,
    pub runtime: i64,
    pub poster_path: String,
    pub backdrop_path: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub genres: Vec<String>,
    pub origin_country: Vec<String>,
    pub original_language: String,
    pub production_companies: Vec<String>,
    pub spoken_languages: Vec<String>,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
    pub videos: Vec<Video>,
}

impl MovieDetail {
    pub fn release_year(&self) -> &str {
        release_year(&self.release_date)
    }

    /// Names of every crew member credited as director
    pub fn directors(&self) -> Vec<&str> {
        self.crew
            .iter()
            .filter(|member| member.job == "Director")
            .map(|member| member.name.as_str())
            .collect()
    }

    pub fn youtube_videos(&self) -> Vec<&Video> {
        self.videos
            .iter()
            .filter(|video| video.site == "YouTube")
            .collect()
    }

    /// Snapshot used when the movie is reviewed or added to a watchlist
    pub fn to_movie_ref(&self) -> MovieRef {
        MovieRef {
            id: self.id,
            poster_path: self.poster_path.clone(),
            title: self.title.clone(),
            release_date: self.release_date.clone(),
        }
    }
}

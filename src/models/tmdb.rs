//! Raw response shapes of the TMDB catalog API.
//!
//! Every field is optional on the wire. Conversions into domain types replace
//! missing values with empty strings, `-1` or empty lists so that no `null`
//! leaks past this module.

use serde::Deserialize;

use super::movie::{CastMember, CrewMember, MovieDetail, MovieSummary, Page, Video, MAX_TOTAL_PAGES};
use super::MovieRef;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovieList {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub results: Option<Vec<ApiMovieSummary>>,
    #[serde(default)]
    pub total_pages: Option<i64>,
}

impl From<ApiMovieList> for Page<MovieSummary> {
    fn from(list: ApiMovieList) -> Self {
        Page {
            page: list.page.unwrap_or(-1),
            total_pages: clamp_total_pages(list.total_pages.unwrap_or(-1)),
            results: list
                .results
                .unwrap_or_default()
                .into_iter()
                .map(MovieSummary::from)
                .collect(),
        }
    }
}

/// The catalog reports absurd page counts for broad queries but refuses to
/// serve anything past page 500.
pub fn clamp_total_pages(total_pages: i64) -> i64 {
    total_pages.min(MAX_TOTAL_PAGES)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovieSummary {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl From<ApiMovieSummary> for MovieRef {
    fn from(summary: ApiMovieSummary) -> Self {
        MovieRef {
            id: summary.id.unwrap_or(-1),
            poster_path: summary.poster_path.unwrap_or_default(),
            title: summary.title.unwrap_or_default(),
            release_date: summary.release_date.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiNamed {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCast {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCrew {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCredits {
    #[serde(default)]
    pub cast: Option<Vec<ApiCast>>,
    #[serde(default)]
    pub crew: Option<Vec<ApiCrew>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideo {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default, rename = "type")]
    pub video_type: Option<String>,
    #[serde(default)]
    pub official: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideos {
    #[serde(default)]
    pub results: Option<Vec<ApiVideo>>,
}

/// Response of `GET movie/{id}`, optionally with credits and videos appended
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovieDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genres: Option<Vec<ApiNamed>>,
    #[serde(default)]
    pub origin_country: Option<Vec<String>>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub production_companies: Option<Vec<ApiNamed>>,
    #[serde(default)]
    pub spoken_languages: Option<Vec<ApiNamed>>,
    #[serde(default)]
    pub credits: Option<ApiCredits>,
    #[serde(default)]
    pub videos: Option<ApiVideos>,
}

fn names(items: Option<Vec<ApiNamed>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(|item| item.name.unwrap_or_default())
        .collect()
}

impl From<ApiMovieDetail> for MovieDetail {
    fn from(detail: ApiMovieDetail) -> Self {
        let (cast, crew) = match detail.credits {
            Some(credits) => (
                credits.cast.unwrap_or_default(),
                credits.crew.unwrap_or_default(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        let videos = detail
            .videos
            .and_then(|videos| videos.results)
            .unwrap_or_default();

        MovieDetail {
            id: detail.id.unwrap_or(-1),
            title: detail.title.unwrap_or_default(),
            tagline: detail.tagline.unwrap_or_default(),
            overview: detail.overview.unwrap_or_default(),
            release_date: detail.release_date.unwrap_or_default(),
            runtime: detail.runtime.unwrap_or(-1),
            poster_path: detail.poster_path.unwrap_or_default(),
            backdrop_path: detail.backdrop_path.unwrap_or_default(),
            vote_average: detail.vote_average.unwrap_or(-1.0),
            vote_count: detail.vote_count.unwrap_or(-1),
            genres: names(detail.genres),
            origin_country: detail.origin_country.unwrap_or_default(),
            original_language: detail.original_language.unwrap_or_default(),
            production_companies: names(detail.production_companies),
            spoken_languages: names(detail.spoken_languages),
            cast: cast
                .into_iter()
                .map(|member| CastMember {
                    id: member.id.unwrap_or(-1),
                    name: member.name.unwrap_or_default(),
                    character: member.character.unwrap_or_default(),
                    profile_path: member.profile_path.unwrap_or_default(),
                })
                .collect(),
            crew: crew
                .into_iter()
                .map(|member| CrewMember {
                    id: member.id.unwrap_or(-1),
                    name: member.name.unwrap_or_default(),
                    job: member.job.unwrap_or_default(),
                    profile_path: member.profile_path.unwrap_or_default(),
                })
                .collect(),
            videos: videos
                .into_iter()
                .map(|video| Video {
                    key: video.key.unwrap_or_default(),
                    name: video.name.unwrap_or_default(),
                    site: video.site.unwrap_or_default(),
                    video_type: video.video_type.unwrap_or_default(),
                    official: video.official.unwrap_or(false),
                })
                .collect(),
        }
    }
}

use serde::{Deserialize, Serialize};

pub mod movie;
pub mod tmdb;

pub use movie::{
    CastMember, CrewMember, Include, ListKind, MovieDetail, MovieSummary, Page, Video,
};

/// External catalog key of a movie
pub type MovieId = i64;

/// Minimal snapshot of a movie as shown in lists and the watchlist
///
/// Written once per movie to the catalog cache and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRef {
    #[serde(rename = "movieId")]
    pub id: MovieId,
    #[serde(default)]
    pub poster_path: String,
    #[serde(default)]
    pub title: String,
    /// `YYYY-MM-DD` or empty
    #[serde(default)]
    pub release_date: String,
}

impl MovieRef {
    /// Four-digit release year, or an empty string when the date is unknown
    pub fn release_year(&self) -> &str {
        release_year(&self.release_date)
    }
}

pub(crate) fn release_year(release_date: &str) -> &str {
    if release_date.trim().is_empty() {
        return "";
    }
    release_date.get(..4).unwrap_or("")
}

/// A single user's star rating for a movie (0.0 to 5.0 in steps of 0.1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: String,
    pub movie_id: MovieId,
    pub value: f32,
}

/// Free-text review; a user may leave any number of these per movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: String,
    pub movie_id: MovieId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub rating: f32,
    /// Epoch milliseconds of the viewing, if the user supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewing_date: Option<i64>,
}

/// A review joined with its author's display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoredReview {
    #[serde(flatten)]
    pub review: Review,
    pub username: String,
}

/// Average and count over every rating of one movie, recomputed on each read
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub average: f32,
    pub count: i64,
}

impl RatingAggregate {
    /// Sentinel returned when a movie has no ratings at all
    pub const NO_RATINGS: RatingAggregate = RatingAggregate {
        average: -1.0,
        count: -1,
    };

    /// Averages in double precision, then narrows the result to `f32`
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::NO_RATINGS;
        }
        let total: f64 = values.iter().sum();
        Self {
            average: (total / values.len() as f64) as f32,
            count: values.len() as i64,
        }
    }
}

/// Stored user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserRecord {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub watchlist: Vec<MovieId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> MovieRef {
        MovieRef {
            id: 27205,
            poster_path: "/inception.jpg".to_string(),
            title: "Inception".to_string(),
            release_date: "2010-07-15".to_string(),
        }
    }

    #[test]
    fn test_movie_ref_document_shape() {
        let json = serde_json::to_value(inception()).unwrap();
        assert_eq!(json["movieId"], 27205);
        assert_eq!(json["posterPath"], "/inception.jpg");
        assert_eq!(json["releaseDate"], "2010-07-15");
    }

    #[test]
    fn test_movie_ref_missing_fields_default_to_empty() {
        let movie: MovieRef = serde_json::from_str(r#"{"movieId": 7}"#).unwrap();
        assert_eq!(movie.id, 7);
        assert_eq!(movie.title, "");
        assert_eq!(movie.poster_path, "");
        assert_eq!(movie.release_year(), "");
    }

    #[test]
    fn test_release_year() {
        assert_eq!(inception().release_year(), "2010");
        assert_eq!(release_year("  "), "");
        assert_eq!(release_year("19"), "");
    }

    #[test]
    fn test_aggregate_empty_is_sentinel() {
        let aggregate = RatingAggregate::from_values(&[]);
        assert_eq!(aggregate, RatingAggregate::NO_RATINGS);
    }

    #[test]
    fn test_aggregate_narrows_to_f32() {
        let values = [4.1, 3.3, 2.2];
        let aggregate = RatingAggregate::from_values(&values);
        let expected = ((4.1_f64 + 3.3 + 2.2) / 3.0) as f32;
        assert_eq!(aggregate.average, expected);
        assert_eq!(aggregate.count, 3);
    }

    #[test]
    fn test_review_without_viewing_date_omits_field() {
        let review = Review {
            user_id: "alice".to_string(),
            movie_id: 42,
            text: "Loved it".to_string(),
            rating: 4.5,
            viewing_date: None,
        };
        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["userId"], "alice");
        assert!(json.get("viewingDate").is_none());
    }

    #[test]
    fn test_user_record_without_watchlist() {
        let user: UserRecord = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(user.username, "bob");
        assert!(user.watchlist.is_empty());
    }
}

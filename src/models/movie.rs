use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default, alias = "genre", deserialize_with = "super::string_or_list")]
    pub genres: Vec<String>,
    /// Длительность в минутах
    #[serde(default)]
    pub duration: u32,
    #[serde(default, deserialize_with = "super::de_opt_date")]
    pub release_date: Option<NaiveDate>,
    // старые mock-данные называли поле ageRestriction
    #[serde(default, alias = "ageRestriction")]
    pub age_rating: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub backdrop: Option<String>,
    #[serde(default)]
    pub trailer: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    /// now-showing / coming-soon
    #[serde(default)]
    pub status: Option<String>,
}

impl Movie {
    pub fn display_title(&self) -> String {
        match &self.original_title {
            Some(original) if original != &self.title => format!("{} ({})", self.title, original),
            _ => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mock_era_field_names() {
        let json = r#"{
            "id": "movie1",
            "title": "Lật Mặt 7: Vòng Tay Nặng",
            "originalTitle": "Face Off 7",
            "genre": "Hành động, Hài",
            "duration": 132,
            "releaseDate": "2024-04-26",
            "ageRestriction": "13+"
        }"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.genres, vec!["Hành động", "Hài"]);
        assert_eq!(movie.age_rating.as_deref(), Some("13+"));
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(2024, 4, 26));
        assert_eq!(movie.display_title(), "Lật Mặt 7: Vòng Tay Nặng (Face Off 7)");
    }

    #[test]
    fn accepts_live_api_field_names() {
        let json = r#"{
            "id": "665f1",
            "title": "Inside Out 2",
            "originalTitle": "Inside Out 2",
            "genres": ["Hoạt hình", "Gia đình"],
            "duration": 110,
            "releaseDate": "2024-06-14T00:00:00.000Z",
            "ageRating": "P"
        }"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.genres.len(), 2);
        assert_eq!(movie.age_rating.as_deref(), Some("P"));
        assert_eq!(movie.display_title(), "Inside Out 2");
    }
}

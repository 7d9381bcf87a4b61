use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: String,
    pub movie_id: String,
    #[serde(alias = "theaterId")]
    pub cinema_id: String,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(deserialize_with = "super::de_datetime")]
    pub show_date_time: NaiveDateTime,
    /// 0, если backend не прислал цену
    #[serde(default, deserialize_with = "super::de_money_or_zero")]
    pub price: i64,
    #[serde(default)]
    pub available_seats: Option<u32>,
    #[serde(default)]
    pub total_seats: Option<u32>,
}

impl Showtime {
    pub fn date(&self) -> NaiveDate {
        self.show_date_time.date()
    }

    /// "19:30"
    pub fn start_time(&self) -> String {
        self.show_date_time.format("%H:%M").to_string()
    }
}

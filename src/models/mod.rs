pub mod booking;
pub mod concession;
pub mod movie;
pub mod payment;
pub mod seat;
pub mod showtime;
pub mod theater;

pub use booking::{
    Booking, BookingConcession, BookingStatus, ConcessionSelection, CreateBookingRequest,
    CustomerInfo, TicketTypeLine,
};
pub use concession::Concession;
pub use movie::Movie;
pub use payment::{PaymentSession, PaymentUrlRequest};
pub use seat::{HoldSeatsRequest, ReleaseSeatsRequest, Seat, SeatStatus, SeatType};
pub use showtime::Showtime;
pub use theater::{Cinema, GeoPoint, Room, RoomType};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Единый конверт ответа backend'а: `{ success, data, message }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn round(self) -> i64 {
        match self {
            Number::Int(v) => v,
            Number::Float(v) => v.round() as i64,
        }
    }
}

// Цены приходят то целыми, то с плавающей точкой (90000 vs 108000.0)
pub(crate) fn de_money<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Number::deserialize(deserializer).map(Number::round)
}

// Отсутствующая или null цена -> 0, дальше подставляется цена по умолчанию
pub(crate) fn de_money_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_money(deserializer)?.unwrap_or(0))
}

pub(crate) fn de_opt_money<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Number>::deserialize(deserializer)?.map(Number::round))
}

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub(crate) fn de_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date-time '{raw}'")))
}

// Дата релиза не критична: мусор превращаем в None
pub(crate) fn de_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let head = s.get(..10).unwrap_or(&s);
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    List(Vec<String>),
    One(String),
}

pub(crate) fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::List(items)) => items,
        Some(StringOrList::One(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    })
}

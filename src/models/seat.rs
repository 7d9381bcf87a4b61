use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    Standard,
    Vip,
    Couple,
    Disabled,
    #[serde(other)]
    Other,
}

/// Статус места. Переходами владеет backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    #[serde(alias = "held", alias = "reserved")]
    Holding,
    #[serde(alias = "sold", alias = "unavailable")]
    Booked,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seat {
    pub id: String,
    pub row: String,
    pub number: u32,
    #[serde(rename = "type", default = "default_seat_type")]
    pub seat_type: SeatType,
    pub status: SeatStatus,
    #[serde(default, deserialize_with = "super::de_opt_money")]
    pub price: Option<i64>,
}

fn default_seat_type() -> SeatType {
    SeatType::Standard
}

impl Seat {
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }
}

// POST /seats/hold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldSeatsRequest {
    pub showtime_id: String,
    pub seat_ids: Vec<String>,
    pub customer_phone: String,
}

// POST /seats/release
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSeatsRequest {
    pub showtime_id: String,
    pub seat_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_statuses_map_onto_backend_states() {
        let seats: Vec<Seat> = serde_json::from_str(
            r#"[
                {"id":"A1","row":"A","number":1,"type":"disabled","status":"reserved","price":90000},
                {"id":"A2","row":"A","number":2,"status":"unavailable"},
                {"id":"D4","row":"D","number":4,"type":"vip","status":"available","price":108000.0},
                {"id":"K1","row":"K","number":1,"type":"couple","status":"maintenance"}
            ]"#,
        )
        .unwrap();
        assert_eq!(seats[0].status, SeatStatus::Holding);
        assert_eq!(seats[1].status, SeatStatus::Booked);
        assert_eq!(seats[1].seat_type, SeatType::Standard);
        assert!(seats[2].is_available());
        assert_eq!(seats[2].price, Some(108000));
        assert_eq!(seats[3].status, SeatStatus::Unknown);
        assert!(!seats[3].is_available());
    }
}

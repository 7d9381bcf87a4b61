use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomType {
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
    #[serde(rename = "4DX")]
    FourDx,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RoomType::TwoD => "2D",
            RoomType::ThreeD => "3D",
            RoomType::FourDx => "4DX",
            RoomType::Other => "-",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(rename = "type", default = "default_room_type")]
    pub room_type: RoomType,
}

fn default_room_type() -> RoomType {
    RoomType::TwoD
}

/// Кинотеатр (в API — cinema).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cinema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    /// Расстояние в км, приходит только из nearby-запроса
    #[serde(default)]
    pub distance: Option<f64>,
}

impl Cinema {
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }
}

use serde::{Deserialize, Serialize};

/// Товар из бара (попкорн, напитки, комбо).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Concession {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "super::de_money")]
    pub price: i64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "Vui lòng nhập họ và tên"))]
    pub full_name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Email không hợp lệ"))]
    pub email: Option<String>,
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.trim_start_matches('+');
    let ok = (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("Số điện thoại không hợp lệ".into()))
    }
}

impl CustomerInfo {
    /// Обрезает пробелы; пустой email считается отсутствующим.
    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().replace([' ', '.', '-'], ""),
            email: self
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        }
    }
}

/// Строка разбивки билетов по типам.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeLine {
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub quantity: u32,
    #[serde(deserialize_with = "super::de_money")]
    pub price_per_ticket: i64,
}

impl TicketTypeLine {
    pub fn line_total(&self) -> i64 {
        self.price_per_ticket * i64::from(self.quantity)
    }
}

/// Выбор товара из бара в запросе на бронирование.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConcessionSelection {
    pub item_id: String,
    pub quantity: u32,
}

/// Строка бара в ответе backend'а.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingConcession {
    pub item_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: u32,
    #[serde(default, deserialize_with = "super::de_opt_money")]
    pub price: Option<i64>,
}

impl BookingConcession {
    pub fn line_total(&self) -> i64 {
        self.price.unwrap_or(0) * i64::from(self.quantity)
    }
}

// POST /bookings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub showtime_id: String,
    pub customer_info: CustomerInfo,
    pub seats: Vec<String>,
    pub ticket_types: Vec<TicketTypeLine>,
    pub concessions: Vec<ConcessionSelection>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    Failed,
    Cancelled,
    Expired,
    #[serde(other)]
    Other,
}

impl BookingStatus {
    /// Оплата подтверждена backend'ом.
    pub fn is_settled(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Paid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub confirmation_code: String,
    #[serde(default)]
    pub showtime_id: Option<String>,
    #[serde(default)]
    pub customer_info: Option<CustomerInfo>,
    #[serde(default, deserialize_with = "seat_refs")]
    pub seats: Vec<String>,
    #[serde(default)]
    pub ticket_types: Vec<TicketTypeLine>,
    #[serde(default)]
    pub concessions: Vec<BookingConcession>,
    #[serde(default, deserialize_with = "super::de_money")]
    pub total_price: i64,
    pub status: BookingStatus,
}

impl Booking {
    /// Сумма строк билетов и бара.
    pub fn computed_total(&self) -> i64 {
        let tickets: i64 = self.ticket_types.iter().map(TicketTypeLine::line_total).sum();
        let concessions: i64 = self.concessions.iter().map(BookingConcession::line_total).sum();
        tickets + concessions
    }

    pub fn totals_match(&self) -> bool {
        self.computed_total() == self.total_price
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeatRef {
    Id(String),
    Object { id: String },
}

// Места приходят либо строками "A1", либо объектами { id: "A1", ... }
fn seat_refs<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs = Vec::<SeatRef>::deserialize(deserializer)?;
    Ok(refs
        .into_iter()
        .map(|r| match r {
            SeatRef::Id(id) | SeatRef::Object { id } => id,
        })
        .collect())
}

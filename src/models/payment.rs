use serde::{Deserialize, Serialize};

// POST /payments/vnpay/create-url
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUrlRequest {
    pub booking_id: String,
    pub return_url: String,
}

/// Платёжная сессия: куда перенаправить браузер.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(alias = "paymentURL")]
    pub payment_url: String,
    #[serde(default)]
    pub payment_id: Option<String>,
}

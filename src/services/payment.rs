//! payment.rs
//!
//! Возврат браузера с платёжного шлюза.
//!
//! Параметры редиректа видны пользователю и легко подделываются, поэтому
//! успехом считается только сочетание:
//! 1.  код ответа шлюза равен коду успеха (по умолчанию `"00"`);
//! 2.  повторно запрошенная у backend'а бронь имеет статус confirmed/paid.
//!
//! Места и сумма на экране успеха берутся из записи backend'а, а не из URL.

use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::models::{Booking, BookingStatus};
use crate::services::backend::{BookingKey, TicketingBackend};

/// VNPay: клиент отменил оплату на странице шлюза.
const CODE_CUSTOMER_CANCELLED: &str = "24";

/// Параметры, с которыми шлюз возвращает браузер на return URL.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GatewayReturn {
    #[serde(rename = "vnp_ResponseCode", alias = "responseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "vnp_TransactionStatus")]
    pub transaction_status: Option<String>,
    #[serde(rename = "vnp_TxnRef")]
    pub txn_ref: Option<String>,
    /// Сумма ×100, как её присылает VNPay
    #[serde(rename = "vnp_Amount")]
    pub amount: Option<String>,
    #[serde(rename = "vnp_TransactionNo")]
    pub transaction_no: Option<String>,
    #[serde(rename = "bookingId")]
    pub booking_id: Option<String>,
    #[serde(rename = "confirmationCode")]
    pub confirmation_code: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl GatewayReturn {
    /// Разбирает query string. Принимает и полный URL, и строку с `?` в начале.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let query = match raw.split_once('?') {
            Some((_, q)) => q,
            None => raw,
        };
        let query = query.split('#').next().unwrap_or_default();
        serde_urlencoded::from_str(query)
            .map_err(|e| ApiError::Validation(format!("malformed gateway return: {e}")))
    }

    /// Ключ поиска брони: код подтверждения, затем id брони, затем TxnRef шлюза.
    pub fn lookup_key(&self) -> Option<BookingKey> {
        if let Some(code) = non_empty(&self.confirmation_code) {
            return Some(BookingKey::ConfirmationCode(code.to_string()));
        }
        non_empty(&self.booking_id)
            .or_else(|| non_empty(&self.txn_ref))
            .map(|id| BookingKey::Id(id.to_string()))
    }

    /// Ключ поиска указывает именно на эту бронь.
    pub fn refers_to(&self, booking: &Booking) -> bool {
        match self.lookup_key() {
            Some(BookingKey::ConfirmationCode(code)) => code == booking.confirmation_code,
            Some(BookingKey::Id(id)) => id == booking.id,
            None => false,
        }
    }

    /// Шлюз сообщает об успехе. Само по себе это ещё ничего не доказывает.
    pub fn gateway_approved(&self, success_code: &str) -> bool {
        let code_ok = non_empty(&self.response_code) == Some(success_code);
        let status_ok = match non_empty(&self.transaction_status) {
            Some(status) => status == success_code,
            None => true,
        };
        code_ok && status_ok
    }

    /// Шлюз явно сообщил об отказе или отмене.
    pub fn gateway_declined(&self, success_code: &str) -> bool {
        matches!(non_empty(&self.response_code), Some(code) if code != success_code)
    }

    /// Сумма в VND (VNPay передаёт её умноженной на 100).
    pub fn amount_vnd(&self) -> Option<i64> {
        non_empty(&self.amount)
            .and_then(|a| a.parse::<i64>().ok())
            .map(|a| a / 100)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    MissingReference,
    /// Возврат ссылается на чужую бронь.
    ForeignBooking,
    GatewayDeclined { code: String },
    NotSettled { status: BookingStatus },
    LookupFailed(ApiError),
}

/// Что показать пользователю после возврата со шлюза.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationView {
    Success { booking: Booking },
    Failure {
        reason: FailureReason,
        booking: Option<Booking>,
        message: String,
    },
}

impl ConfirmationView {
    pub fn is_success(&self) -> bool {
        matches!(self, ConfirmationView::Success { .. })
    }

    pub(crate) fn failure(reason: FailureReason, booking: Option<Booking>) -> Self {
        let message = match &reason {
            FailureReason::MissingReference => {
                "Không tìm thấy mã đặt vé trong kết quả thanh toán.".to_string()
            }
            FailureReason::ForeignBooking => {
                "Kết quả thanh toán không khớp với đơn đặt vé hiện tại.".to_string()
            }
            FailureReason::GatewayDeclined { code } if code == CODE_CUSTOMER_CANCELLED => {
                "Bạn đã hủy giao dịch thanh toán.".to_string()
            }
            FailureReason::GatewayDeclined { code } => {
                format!("Thanh toán không thành công (mã lỗi {code}).")
            }
            FailureReason::NotSettled { .. } => {
                "Thanh toán chưa được hệ thống xác nhận. Vui lòng kiểm tra lại sau.".to_string()
            }
            FailureReason::LookupFailed(e) => e.user_message(),
        };
        ConfirmationView::Failure {
            reason,
            booking,
            message,
        }
    }
}

/// Решает, какой экран показать после редиректа со шлюза.
pub async fn resolve_return<B>(backend: &B, ret: &GatewayReturn, success_code: &str) -> ConfirmationView
where
    B: TicketingBackend + ?Sized,
{
    let Some(key) = ret.lookup_key() else {
        warn!("Gateway return without booking reference: {:?}", ret);
        return ConfirmationView::failure(FailureReason::MissingReference, None);
    };

    let fetched = backend.fetch_booking(&key).await;

    if !ret.gateway_approved(success_code) {
        let code = non_empty(&ret.response_code).unwrap_or("").to_string();
        info!("Gateway reported failure for booking {}: code '{}'", key, code);
        return ConfirmationView::failure(FailureReason::GatewayDeclined { code }, fetched.ok());
    }

    let booking = match fetched {
        Ok(booking) => booking,
        Err(e) => {
            warn!("Could not re-fetch booking {} after payment: {}", key, e);
            return ConfirmationView::failure(FailureReason::LookupFailed(e), None);
        }
    };

    if !booking.status.is_settled() {
        warn!(
            "Gateway says success but backend booking {} is {:?}",
            booking.confirmation_code, booking.status
        );
        let status = booking.status;
        return ConfirmationView::failure(FailureReason::NotSettled { status }, Some(booking));
    }

    if !booking.totals_match() {
        warn!(
            "Booking {} total {} differs from line sum {}",
            booking.confirmation_code,
            booking.total_price,
            booking.computed_total()
        );
    }
    if let Some(amount) = ret.amount_vnd() {
        if amount != booking.total_price {
            warn!(
                "Gateway amount {} differs from booking total {} for {}",
                amount, booking.total_price, booking.confirmation_code
            );
        }
    }

    info!("Payment confirmed for booking {}", booking.confirmation_code);
    ConfirmationView::Success { booking }
}

/// Return URL с идентификаторами брони, чтобы страница возврата могла
/// перезапросить бронь независимо от того, что добавит шлюз.
pub fn build_return_url(base: &str, booking: &Booking) -> Result<String, ApiError> {
    let mut url = Url::parse(base)
        .map_err(|e| ApiError::Validation(format!("invalid return url '{base}': {e}")))?;
    url.query_pairs_mut()
        .append_pair("bookingId", &booking.id)
        .append_pair("confirmationCode", &booking.confirmation_code);
    Ok(url.into())
}

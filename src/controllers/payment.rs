use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::services::payment::GatewayReturn;

/// Состояние приёмника возврата со шлюза.
pub struct CallbackState {
    pub returns: mpsc::Sender<GatewayReturn>,
}

const RECEIVED_PAGE: &str = "<!doctype html><html><body>\
<h2>Đã nhận kết quả thanh toán</h2>\
<p>Vui lòng quay lại cửa sổ dòng lệnh để xem trạng thái đặt vé.</p>\
</body></html>";

/// GET <return path>
///
/// Здесь только разбор и пересылка. Решение об успехе принимает
/// [`crate::services::payment::resolve_return`] после перезапроса брони.
pub async fn gateway_return(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let query = query.unwrap_or_default();
    let ret = match GatewayReturn::parse(&query) {
        Ok(ret) => ret,
        Err(e) => {
            tracing::warn!("Malformed gateway return '{}': {}", query, e);
            return (StatusCode::BAD_REQUEST, Html("<p>Kết quả thanh toán không hợp lệ.</p>")).into_response();
        }
    };

    tracing::info!(
        "Gateway return: code={:?}, booking={:?}",
        ret.response_code,
        ret.confirmation_code.as_ref().or(ret.booking_id.as_ref())
    );

    if let Err(e) = state.returns.send(ret).await {
        tracing::error!("Checkout is no longer waiting for the gateway return: {}", e);
        return (StatusCode::GONE, Html("<p>Phiên đặt vé đã kết thúc.</p>")).into_response();
    }

    (StatusCode::OK, Html(RECEIVED_PAGE)).into_response()
}

//! Нормализованная ошибка доступа к данным.
//!
//! Все сетевые и серверные сбои приводятся к [`ApiError`] на границе
//! `services::api_client`, поэтому вызывающий код никогда не видит `reqwest::Error`.

/// Ошибка обращения к backend'у кинотеатра или к платёжному шлюзу.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Нет соединения, таймаут, DNS, TLS.
    #[error("network error: {0}")]
    Network(String),

    /// Не заполнены обязательные поля или сервер вернул 400/422.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Место уже удерживается или продано (409/423).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Оплата отклонена или отменена на стороне шлюза.
    #[error("payment gateway: {0}")]
    Gateway(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Ответ 2xx, но конверт содержит `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Circuit breaker разомкнут, запрос не отправлялся.
    #[error("backend temporarily unavailable")]
    Unavailable,

    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Строит ошибку по HTTP-статусу и сообщению из конверта (или телу ответа).
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => ApiError::Validation(message),
            404 => ApiError::NotFound(message),
            409 | 423 => ApiError::Conflict(message),
            400..=499 => ApiError::Rejected(message),
            _ => ApiError::Server { status, message },
        }
    }

    /// HTTP-статус, если он известен.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation(_) => Some(400),
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Unavailable => Some(503),
            _ => None,
        }
    }

    /// Сбой, который имеет смысл повторить и засчитать в circuit breaker.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }

    /// Сообщение сервера без технического префикса.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network(m)
            | ApiError::Validation(m)
            | ApiError::Conflict(m)
            | ApiError::NotFound(m)
            | ApiError::Gateway(m)
            | ApiError::Rejected(m)
            | ApiError::Decode(m) => m,
            ApiError::Server { message, .. } => message,
            ApiError::Unavailable => "",
        }
    }

    /// Локализованное сообщение для пользователя.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Không thể kết nối tới máy chủ. Vui lòng kiểm tra mạng và thử lại.".to_string()
            }
            ApiError::Validation(m) if !m.is_empty() => format!("Thông tin không hợp lệ: {m}"),
            ApiError::Validation(_) => "Vui lòng nhập đầy đủ thông tin.".to_string(),
            ApiError::Conflict(_) => {
                "Ghế bạn chọn không còn trống. Vui lòng chọn ghế khác.".to_string()
            }
            ApiError::NotFound(_) => "Không tìm thấy dữ liệu yêu cầu.".to_string(),
            ApiError::Gateway(_) => "Thanh toán không thành công hoặc đã bị hủy.".to_string(),
            ApiError::Rejected(m) if !m.is_empty() => m.clone(),
            ApiError::Rejected(_) | ApiError::Server { .. } | ApiError::Decode(_) => {
                "Hệ thống đang bận. Vui lòng thử lại sau.".to_string()
            }
            ApiError::Unavailable => {
                "Dịch vụ tạm thời gián đoạn. Vui lòng thử lại sau ít phút.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_status(status.as_u16(), e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

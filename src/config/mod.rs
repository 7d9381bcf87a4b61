use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub api: ApiConfig,
    pub payment: PaymentConfig,
    pub hold: HoldConfig,
    pub booking: BookingDefaults,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub rust_log: String,
    /// "pretty" или "json"
    pub log_format: String,
}

// Настройки REST backend'а кинотеатра
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

// Настройки платежного шлюза (со стороны клиента)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Куда шлюз вернёт браузер после оплаты
    pub return_url: String,
    /// Адрес локального слушателя возврата
    pub callback_addr: SocketAddr,
    /// Код ответа шлюза, означающий успех
    pub success_code: String,
}

// Окно удержания мест
#[derive(Debug, Clone, Deserialize)]
pub struct HoldConfig {
    pub seconds: u64,
}

// Значения по умолчанию для состава заказа
#[derive(Debug, Clone, Deserialize)]
pub struct BookingDefaults {
    pub ticket_type: String,
    pub fallback_ticket_price: i64,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(key, default);
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

// Return URL должен быть абсолютным http(s): из него строится маршрут приёмника
fn parse_return_url(value: String) -> Result<String, ConfigError> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.into()),
        _ => Err(ConfigError::Invalid {
            key: "PAYMENT_RETURN_URL",
            value,
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "cinema_booking=debug,tower_http=info"),
                log_format: var_or("LOG_FORMAT", "pretty"),
            },
            api: ApiConfig {
                base_url: var_or("CINEMA_API_URL", "http://localhost:8080/api")
                    .trim_end_matches('/')
                    .to_string(),
                timeout_seconds: parse_or("API_TIMEOUT_SECONDS", "15")?,
                max_retries: parse_or("API_MAX_RETRIES", "2")?,
            },
            payment: PaymentConfig {
                return_url: parse_return_url(var_or(
                    "PAYMENT_RETURN_URL",
                    "http://127.0.0.1:5173/payment/return",
                ))?,
                callback_addr: parse_or("PAYMENT_CALLBACK_ADDR", "127.0.0.1:5173")?,
                success_code: var_or("PAYMENT_SUCCESS_CODE", "00"),
            },
            hold: HoldConfig {
                seconds: parse_or("HOLD_SECONDS", "300")?,
            },
            booking: BookingDefaults {
                ticket_type: var_or("DEFAULT_TICKET_TYPE", "Người lớn"),
                fallback_ticket_price: parse_or("FALLBACK_TICKET_PRICE", "90000")?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parse_or("CIRCUIT_BREAKER_FAILURE_THRESHOLD", "5")?,
                timeout_seconds: parse_or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", "60")?,
            },
        })
    }

    /// Путь, на который шлюз редиректит браузер (например `/payment/return`).
    pub fn return_path(&self) -> String {
        Url::parse(&self.payment.return_url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }
}

//! api_client.rs
//!
//! HTTP-клиент REST backend'а кинотеатра.
//!
//! Ключевые моменты:
//! 1.  Каждый ответ разворачивается из конверта `{ success, data, message }`.
//!     Не-2xx и `success: false` одинаково превращаются в [`ApiError`].
//! 2.  Все вызовы проходят через [`CircuitBreaker`].
//! 3.  Идемпотентные запросы (GET, hold, release) повторяются при сетевых
//!     и 5xx сбоях. Создание брони и платёжной ссылки не повторяется никогда.

use chrono::NaiveDate;
use reqwest::{RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    ApiResponse, Booking, Cinema, Concession, CreateBookingRequest, GeoPoint, HoldSeatsRequest,
    Movie, PaymentSession, PaymentUrlRequest, ReleaseSeatsRequest, Room, Seat, Showtime,
};
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const RETRY_BACKOFF_MS: u64 = 200;

/// Фильтры списка фильмов.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MovieQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Фильтры списка сеансов.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cinema_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct CinemaQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConcessionQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cinema_id: Option<&'a str>,
}

#[derive(Serialize)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    distance: f64,
}

/// Клиент REST API кинотеатра.
#[derive(Clone)]
pub struct CinemaApiClient {
    base_url: Url,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
}

impl CinemaApiClient {
    /// Создает и конфигурирует клиент на основе настроек приложения.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .build()?;
        let circuit_breaker = Arc::new(CircuitBreaker::new(
            config.circuit_breaker.failure_threshold,
            config.circuit_breaker.timeout_seconds,
        ));
        Self::new(&config.api.base_url, http_client, circuit_breaker, config.api.max_retries)
    }

    pub fn new(
        base_url: &str,
        http_client: reqwest::Client,
        circuit_breaker: Arc<CircuitBreaker>,
        max_retries: u32,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Validation(format!("invalid base url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Validation(format!("base url '{base_url}' cannot be a base")));
        }
        Ok(Self {
            base_url,
            http_client,
            circuit_breaker,
            max_retries,
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    // --- Каталог ---

    pub async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<Movie>, ApiError> {
        self.get(&["movies"], query).await
    }

    pub async fn get_movie(&self, movie_id: &str) -> Result<Movie, ApiError> {
        self.get(&["movies", movie_id], &()).await
    }

    pub async fn list_cinemas(&self, city: Option<&str>) -> Result<Vec<Cinema>, ApiError> {
        self.get(&["cinemas"], &CinemaQuery { city }).await
    }

    pub async fn get_cinema(&self, cinema_id: &str) -> Result<Cinema, ApiError> {
        self.get(&["cinemas", cinema_id], &()).await
    }

    /// Кинотеатры в радиусе `radius_km` от точки. Сортирует backend.
    pub async fn nearby_cinemas(&self, origin: GeoPoint, radius_km: f64) -> Result<Vec<Cinema>, ApiError> {
        let query = NearbyQuery {
            lat: origin.lat,
            lng: origin.lng,
            distance: radius_km,
        };
        self.get(&["cinemas", "nearby"], &query).await
    }

    pub async fn get_room(&self, room_id: &str) -> Result<Room, ApiError> {
        self.get(&["rooms", room_id], &()).await
    }

    pub async fn list_showtimes(&self, query: &ShowtimeQuery) -> Result<Vec<Showtime>, ApiError> {
        self.get(&["showtimes"], query).await
    }

    pub async fn get_showtime(&self, showtime_id: &str) -> Result<Showtime, ApiError> {
        self.get(&["showtimes", showtime_id], &()).await
    }

    /// Карта мест сеанса со статусами.
    pub async fn get_seats(&self, showtime_id: &str) -> Result<Vec<Seat>, ApiError> {
        self.get(&["showtimes", showtime_id, "seats"], &()).await
    }

    pub async fn list_concessions(&self, cinema_id: Option<&str>) -> Result<Vec<Concession>, ApiError> {
        self.get(&["concessions"], &ConcessionQuery { cinema_id }).await
    }

    // --- Удержание мест ---

    /// Удерживает места за покупателем. Повтор с тем же ключом идемпотентности
    /// безопасен; отказ backend'а трактуется как конфликт.
    pub async fn hold_seats(&self, request: &HoldSeatsRequest) -> Result<(), ApiError> {
        let key = Uuid::new_v4().to_string();
        info!(
            "Holding seats {:?} for showtime {} (key {})",
            request.seat_ids, request.showtime_id, key
        );
        self.post_unit(&["seats", "hold"], request, Some(&key))
            .await
            .map_err(into_conflict)
    }

    pub async fn release_seats(&self, request: &ReleaseSeatsRequest) -> Result<(), ApiError> {
        info!("Releasing seats {:?} for showtime {}", request.seat_ids, request.showtime_id);
        self.post_unit(&["seats", "release"], request, None)
            .await
            .map_err(into_conflict)
    }

    // --- Бронирование и оплата ---

    pub async fn create_booking(&self, request: &CreateBookingRequest) -> Result<Booking, ApiError> {
        info!(
            "Creating booking for showtime {}: {} seats",
            request.showtime_id,
            request.seats.len()
        );
        let url = self.endpoint(&["bookings"])?;
        self.execute(|| self.http_client.post(url.clone()).json(request), false)
            .await
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<Booking, ApiError> {
        self.get(&["bookings", booking_id], &()).await
    }

    pub async fn get_booking_by_code(&self, code: &str) -> Result<Booking, ApiError> {
        self.get(&["bookings", "code", code], &()).await
    }

    /// Получает ссылку на платёжный шлюз. Браузер уходит туда полной навигацией.
    pub async fn create_payment_url(&self, request: &PaymentUrlRequest) -> Result<PaymentSession, ApiError> {
        info!("Creating payment url for booking {}", request.booking_id);
        let url = self.endpoint(&["payments", "vnpay", "create-url"])?;
        let session: PaymentSession = self
            .execute(|| self.http_client.post(url.clone()).json(request), false)
            .await?;
        if session.payment_url.trim().is_empty() {
            return Err(ApiError::Gateway("empty payment url".to_string()));
        }
        Ok(session)
    }

    // --- Внутренние помощники ---

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation("base url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T, Q>(&self, segments: &[&str], query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        self.execute(|| self.http_client.get(url.clone()).query(query), true)
            .await
    }

    async fn post_unit<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
        idempotency_key: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(segments)?;
        let build = || {
            let request = self.http_client.post(url.clone()).json(body);
            match idempotency_key {
                Some(key) => request.header(IDEMPOTENCY_HEADER, key),
                None => request,
            }
        };
        self.execute_with(build, true, |data: Option<serde_json::Value>| {
            debug!("unit response data: {:?}", data);
            Ok(())
        })
        .await
    }

    /// Выполняет запрос и требует наличия `data` в конверте.
    async fn execute<T, F>(&self, build: F, retryable: bool) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        self.execute_with(build, retryable, |data: Option<T>| {
            data.ok_or_else(|| ApiError::Decode("response envelope has no data".to_string()))
        })
        .await
    }

    async fn execute_with<T, R, F, M>(&self, build: F, retryable: bool, map: M) -> Result<R, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
        M: Fn(Option<T>) -> Result<R, ApiError>,
    {
        let attempts = if retryable { self.max_retries + 1 } else { 1 };
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.circuit_breaker.call(Self::send::<T>(build())).await;
            match result {
                Ok(data) => return map(data),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        status = ?e.status(),
                        "Backend request failed (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Одна попытка: отправка, чтение тела, разбор конверта.
    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<Option<T>, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.message)
                .unwrap_or_else(|| fallback_message(status, &body));
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(ApiError::Rejected(envelope.message.unwrap_or_default()));
        }
        Ok(envelope.data)
    }
}

fn fallback_message(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('<') {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

fn into_conflict(e: ApiError) -> ApiError {
    match e {
        ApiError::Rejected(message) => ApiError::Conflict(message),
        other => other,
    }
}

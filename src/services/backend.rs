//! Шов между оркестратором оформления заказа и транспортом.
//!
//! [`TicketingBackend`] описывает ровно те операции, которые нужны
//! checkout-последовательности. Реальная реализация — [`CinemaApiClient`].

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{
    Booking, CreateBookingRequest, HoldSeatsRequest, PaymentSession, PaymentUrlRequest,
    ReleaseSeatsRequest, Seat,
};
use crate::services::api_client::CinemaApiClient;

/// Как искать бронь после возврата со шлюза.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingKey {
    ConfirmationCode(String),
    Id(String),
}

impl std::fmt::Display for BookingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingKey::ConfirmationCode(code) => write!(f, "code {code}"),
            BookingKey::Id(id) => write!(f, "id {id}"),
        }
    }
}

pub trait TicketingBackend: Send + Sync {
    fn seat_map<'a>(&'a self, showtime_id: &'a str) -> BoxFuture<'a, Result<Vec<Seat>, ApiError>>;

    fn hold_seats<'a>(&'a self, request: &'a HoldSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>>;

    fn release_seats<'a>(&'a self, request: &'a ReleaseSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>>;

    fn create_booking<'a>(&'a self, request: &'a CreateBookingRequest) -> BoxFuture<'a, Result<Booking, ApiError>>;

    fn create_payment_url<'a>(
        &'a self,
        request: &'a PaymentUrlRequest,
    ) -> BoxFuture<'a, Result<PaymentSession, ApiError>>;

    fn fetch_booking<'a>(&'a self, key: &'a BookingKey) -> BoxFuture<'a, Result<Booking, ApiError>>;
}

impl TicketingBackend for CinemaApiClient {
    fn seat_map<'a>(&'a self, showtime_id: &'a str) -> BoxFuture<'a, Result<Vec<Seat>, ApiError>> {
        self.get_seats(showtime_id).boxed()
    }

    fn hold_seats<'a>(&'a self, request: &'a HoldSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>> {
        CinemaApiClient::hold_seats(self, request).boxed()
    }

    fn release_seats<'a>(&'a self, request: &'a ReleaseSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>> {
        CinemaApiClient::release_seats(self, request).boxed()
    }

    fn create_booking<'a>(&'a self, request: &'a CreateBookingRequest) -> BoxFuture<'a, Result<Booking, ApiError>> {
        CinemaApiClient::create_booking(self, request).boxed()
    }

    fn create_payment_url<'a>(
        &'a self,
        request: &'a PaymentUrlRequest,
    ) -> BoxFuture<'a, Result<PaymentSession, ApiError>> {
        CinemaApiClient::create_payment_url(self, request).boxed()
    }

    fn fetch_booking<'a>(&'a self, key: &'a BookingKey) -> BoxFuture<'a, Result<Booking, ApiError>> {
        match key {
            BookingKey::ConfirmationCode(code) => self.get_booking_by_code(code).boxed(),
            BookingKey::Id(id) => self.get_booking(id).boxed(),
        }
    }
}

impl<T: TicketingBackend + ?Sized> TicketingBackend for Arc<T> {
    fn seat_map<'a>(&'a self, showtime_id: &'a str) -> BoxFuture<'a, Result<Vec<Seat>, ApiError>> {
        (**self).seat_map(showtime_id)
    }

    fn hold_seats<'a>(&'a self, request: &'a HoldSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>> {
        (**self).hold_seats(request)
    }

    fn release_seats<'a>(&'a self, request: &'a ReleaseSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>> {
        (**self).release_seats(request)
    }

    fn create_booking<'a>(&'a self, request: &'a CreateBookingRequest) -> BoxFuture<'a, Result<Booking, ApiError>> {
        (**self).create_booking(request)
    }

    fn create_payment_url<'a>(
        &'a self,
        request: &'a PaymentUrlRequest,
    ) -> BoxFuture<'a, Result<PaymentSession, ApiError>> {
        (**self).create_payment_url(request)
    }

    fn fetch_booking<'a>(&'a self, key: &'a BookingKey) -> BoxFuture<'a, Result<Booking, ApiError>> {
        (**self).fetch_booking(key)
    }
}

/// In-memory backend для модульных тестов checkout/payment.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::models::{BookingConcession, BookingStatus, SeatStatus, SeatType};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Inner {
        pub seats: Vec<Seat>,
        /// seat id -> телефон держателя
        pub holders: HashMap<String, String>,
        pub bookings: HashMap<String, Booking>,
        pub calls: Vec<&'static str>,
        pub released: Vec<Vec<String>>,
        pub fail_booking: Option<ApiError>,
        pub fail_payment: Option<ApiError>,
        pub fail_release: Option<ApiError>,
        pub fail_seat_map: Option<ApiError>,
        pub concession_prices: HashMap<String, i64>,
        pub next_code: u32,
    }

    #[derive(Default)]
    pub struct FakeBackend {
        pub inner: Mutex<Inner>,
    }

    pub fn seat(id: &str, status: SeatStatus) -> Seat {
        let (row, number) = id.split_at(1);
        Seat {
            id: id.to_string(),
            row: row.to_string(),
            number: number.parse().unwrap_or(0),
            seat_type: SeatType::Standard,
            status,
            price: Some(90000),
        }
    }

    impl FakeBackend {
        pub fn with_seats(ids: &[&str]) -> Self {
            let backend = FakeBackend::default();
            backend.inner.lock().unwrap().seats =
                ids.iter().map(|id| seat(id, SeatStatus::Available)).collect();
            backend
        }

        /// Место удерживает другой покупатель.
        pub fn hold_by_other(&self, id: &str) {
            let mut inner = self.inner.lock().unwrap();
            inner.holders.insert(id.to_string(), "0999999999".to_string());
            if let Some(s) = inner.seats.iter_mut().find(|s| s.id == id) {
                s.status = SeatStatus::Holding;
            }
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.inner.lock().unwrap().calls.clone()
        }

        pub fn set_booking_status(&self, code: &str, status: BookingStatus) {
            let mut inner = self.inner.lock().unwrap();
            if let Some(b) = inner.bookings.get_mut(code) {
                b.status = status;
            }
        }
    }

    impl TicketingBackend for FakeBackend {
        fn seat_map<'a>(&'a self, _showtime_id: &'a str) -> BoxFuture<'a, Result<Vec<Seat>, ApiError>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("seat_map");
            let result = match inner.fail_seat_map.clone() {
                Some(e) => Err(e),
                None => Ok(inner.seats.clone()),
            };
            async move { result }.boxed()
        }

        fn hold_seats<'a>(&'a self, request: &'a HoldSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("hold");
            let taken: Vec<String> = request
                .seat_ids
                .iter()
                .filter(|id| {
                    inner
                        .holders
                        .get(*id)
                        .map_or(false, |phone| phone != &request.customer_phone)
                })
                .cloned()
                .collect();
            let result = if taken.is_empty() {
                for id in &request.seat_ids {
                    inner.holders.insert(id.clone(), request.customer_phone.clone());
                    if let Some(s) = inner.seats.iter_mut().find(|s| &s.id == id) {
                        s.status = SeatStatus::Holding;
                    }
                }
                Ok(())
            } else {
                Err(ApiError::Conflict(format!("Ghế {} đã được giữ", taken.join(", "))))
            };
            async move { result }.boxed()
        }

        fn release_seats<'a>(&'a self, request: &'a ReleaseSeatsRequest) -> BoxFuture<'a, Result<(), ApiError>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("release");
            inner.released.push(request.seat_ids.clone());
            let result = match inner.fail_release.clone() {
                Some(e) => Err(e),
                None => {
                    for id in &request.seat_ids {
                        inner.holders.remove(id);
                        if let Some(s) = inner.seats.iter_mut().find(|s| &s.id == id) {
                            s.status = SeatStatus::Available;
                        }
                    }
                    Ok(())
                }
            };
            async move { result }.boxed()
        }

        fn create_booking<'a>(&'a self, request: &'a CreateBookingRequest) -> BoxFuture<'a, Result<Booking, ApiError>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("create_booking");
            let result = match inner.fail_booking.clone() {
                Some(e) => Err(e),
                None => {
                    inner.next_code += 1;
                    let code = if inner.next_code == 1 {
                        "BK123".to_string()
                    } else {
                        format!("BK{}", 122 + inner.next_code)
                    };
                    let concessions: Vec<BookingConcession> = request
                        .concessions
                        .iter()
                        .map(|c| BookingConcession {
                            item_id: c.item_id.clone(),
                            name: None,
                            quantity: c.quantity,
                            price: inner.concession_prices.get(&c.item_id).copied(),
                        })
                        .collect();
                    let mut booking = Booking {
                        id: format!("booking-{}", inner.next_code),
                        confirmation_code: code.clone(),
                        showtime_id: Some(request.showtime_id.clone()),
                        customer_info: Some(request.customer_info.clone()),
                        seats: request.seats.clone(),
                        ticket_types: request.ticket_types.clone(),
                        concessions,
                        total_price: 0,
                        status: BookingStatus::Pending,
                    };
                    booking.total_price = booking.computed_total();
                    inner.bookings.insert(code, booking.clone());
                    Ok(booking)
                }
            };
            async move { result }.boxed()
        }

        fn create_payment_url<'a>(
            &'a self,
            request: &'a PaymentUrlRequest,
        ) -> BoxFuture<'a, Result<PaymentSession, ApiError>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("create_payment_url");
            let result = match inner.fail_payment.clone() {
                Some(e) => Err(e),
                None => Ok(PaymentSession {
                    booking_id: Some(request.booking_id.clone()),
                    payment_url: format!(
                        "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?vnp_TxnRef={}",
                        request.booking_id
                    ),
                    payment_id: Some("pay-1".to_string()),
                }),
            };
            async move { result }.boxed()
        }

        fn fetch_booking<'a>(&'a self, key: &'a BookingKey) -> BoxFuture<'a, Result<Booking, ApiError>> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("fetch_booking");
            let found = match key {
                BookingKey::ConfirmationCode(code) => inner.bookings.get(code).cloned(),
                BookingKey::Id(id) => inner.bookings.values().find(|b| &b.id == id).cloned(),
            };
            let result = found.ok_or_else(|| ApiError::NotFound(format!("booking {key}")));
            async move { result }.boxed()
        }
    }
}

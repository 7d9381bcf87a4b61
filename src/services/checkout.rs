//! checkout.rs
//!
//! Оформление заказа: удержание мест -> бронь -> ссылка на оплату -> подтверждение.
//!
//! Шаги строго последовательны, каждый зависит от результата предыдущего.
//! Если после успешного удержания падает создание брони или платёжной ссылки,
//! места всё равно освобождаются явным вызовом release. Конфликт при удержании
//! прерывает оформление без создания брони.

use tracing::{error, info, warn};
use validator::Validate;

use crate::config::BookingDefaults;
use crate::error::ApiError;
use crate::models::{
    Booking, Concession, CreateBookingRequest, CustomerInfo, HoldSeatsRequest, PaymentUrlRequest,
    ReleaseSeatsRequest, Seat, Showtime,
};
use crate::services::backend::TicketingBackend;
use crate::services::catalog::BookingPage;
use crate::services::order::{ConcessionCart, OrderSummary};
use crate::services::payment::{self, ConfirmationView, FailureReason, GatewayReturn};
use crate::services::selection::{SeatSelection, Toggle};

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    SelectingSeats,
    InfoEntry,
    SeatsHeld,
    BookingCreated,
    RedirectedToGateway { payment_url: String },
    PaymentConfirmed,
    PaymentFailed { message: String },
    HoldExpired,
}

impl CheckoutState {
    fn name(&self) -> &'static str {
        match self {
            CheckoutState::SelectingSeats => "selecting-seats",
            CheckoutState::InfoEntry => "info-entry",
            CheckoutState::SeatsHeld => "seats-held",
            CheckoutState::BookingCreated => "booking-created",
            CheckoutState::RedirectedToGateway { .. } => "redirected-to-gateway",
            CheckoutState::PaymentConfirmed => "payment-confirmed",
            CheckoutState::PaymentFailed { .. } => "payment-failed",
            CheckoutState::HoldExpired => "hold-expired",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no seats selected")]
    EmptySelection,

    #[error("seat {0} is not available")]
    SeatUnavailable(String),

    #[error("invalid customer info: {0}")]
    InvalidCustomer(String),

    /// Удержание отклонено: места заняты другим покупателем.
    #[error("seats already taken: {message}")]
    SeatsTaken { seats: Vec<String>, message: String },

    #[error("cannot {action} while {state}")]
    InvalidStep { action: &'static str, state: &'static str },

    #[error("seat hold expired")]
    HoldExpired,
}

impl CheckoutError {
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Api(e) => e.user_message(),
            CheckoutError::EmptySelection => "Vui lòng chọn ít nhất một ghế.".to_string(),
            CheckoutError::SeatUnavailable(id) => format!("Ghế {id} không còn trống."),
            CheckoutError::InvalidCustomer(m) => m.clone(),
            CheckoutError::SeatsTaken { seats, .. } if !seats.is_empty() => format!(
                "Ghế {} vừa được người khác giữ. Vui lòng chọn ghế khác.",
                seats.join(", ")
            ),
            CheckoutError::SeatsTaken { .. } => {
                "Ghế bạn chọn không còn trống. Vui lòng chọn ghế khác.".to_string()
            }
            CheckoutError::InvalidStep { .. } => {
                "Thao tác không hợp lệ ở bước hiện tại.".to_string()
            }
            CheckoutError::HoldExpired => {
                "Đã hết thời gian giữ ghế. Vui lòng thực hiện lại việc đặt vé.".to_string()
            }
        }
    }
}

/// Места, удерживаемые за этим оформлением.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldSeats {
    pub showtime_id: String,
    pub seat_ids: Vec<String>,
    pub customer_phone: String,
}

/// Куда отправить браузер.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRedirect {
    pub payment_url: String,
    pub booking_id: String,
    pub confirmation_code: String,
    pub total: i64,
}

pub struct CheckoutFlow<B> {
    backend: B,
    showtime: Showtime,
    selection: SeatSelection,
    ticket_type: String,
    state: CheckoutState,
    hold: Option<HeldSeats>,
    booking: Option<Booking>,
}

impl<B: TicketingBackend> CheckoutFlow<B> {
    pub fn new(backend: B, showtime: Showtime, seats: Vec<Seat>, ticket_type: impl Into<String>) -> Self {
        Self {
            backend,
            showtime,
            selection: SeatSelection::new(seats),
            ticket_type: ticket_type.into(),
            state: CheckoutState::SelectingSeats,
            hold: None,
            booking: None,
        }
    }

    pub fn from_page(backend: B, page: &BookingPage, defaults: &BookingDefaults) -> Self {
        let mut showtime = page.showtime.clone();
        showtime.price = page.ticket_price(defaults.fallback_ticket_price);
        Self::new(backend, showtime, page.seats.clone(), defaults.ticket_type.clone())
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn selection(&self) -> &SeatSelection {
        &self.selection
    }

    pub fn showtime(&self) -> &Showtime {
        &self.showtime
    }

    pub fn held(&self) -> Option<&HeldSeats> {
        self.hold.as_ref()
    }

    pub fn booking(&self) -> Option<&Booking> {
        self.booking.as_ref()
    }

    fn invalid(&self, action: &'static str) -> CheckoutError {
        CheckoutError::InvalidStep {
            action,
            state: self.state.name(),
        }
    }

    // --- Локальные шаги (без backend'а) ---

    pub fn toggle_seat(&mut self, seat_id: &str) -> Result<Toggle, CheckoutError> {
        if self.state != CheckoutState::SelectingSeats {
            return Err(self.invalid("change seats"));
        }
        match self.selection.toggle(seat_id) {
            Toggle::Rejected => Err(CheckoutError::SeatUnavailable(seat_id.to_string())),
            other => Ok(other),
        }
    }

    pub fn proceed_to_info(&mut self) -> Result<(), CheckoutError> {
        if self.state != CheckoutState::SelectingSeats {
            return Err(self.invalid("proceed to customer info"));
        }
        if self.selection.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }
        self.state = CheckoutState::InfoEntry;
        Ok(())
    }

    pub fn back_to_seats(&mut self) -> Result<(), CheckoutError> {
        if self.state != CheckoutState::InfoEntry {
            return Err(self.invalid("go back to seats"));
        }
        self.state = CheckoutState::SelectingSeats;
        Ok(())
    }

    pub fn summary(&self, catalog: &[Concession], cart: &ConcessionCart) -> OrderSummary {
        OrderSummary::build(
            &self.selection.selected_seats(),
            self.showtime.price,
            &self.ticket_type,
            catalog,
            cart,
        )
    }

    // --- Hold -> Booking -> Payment URL ---

    /// Удерживает места, создаёт бронь и получает ссылку на оплату.
    pub async fn submit(
        &mut self,
        customer: CustomerInfo,
        catalog: &[Concession],
        cart: &ConcessionCart,
        return_url: &str,
    ) -> Result<PaymentRedirect, CheckoutError> {
        match self.state {
            CheckoutState::InfoEntry => {}
            CheckoutState::HoldExpired => return Err(CheckoutError::HoldExpired),
            _ => return Err(self.invalid("submit order")),
        }
        if self.selection.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }

        let customer = customer.normalized();
        if let Err(errors) = customer.validate() {
            return Err(CheckoutError::InvalidCustomer(first_validation_message(&errors)));
        }

        let summary = self.summary(catalog, cart);
        let held = HeldSeats {
            showtime_id: self.showtime.id.clone(),
            seat_ids: summary.seat_ids.clone(),
            customer_phone: customer.phone.clone(),
        };

        // 1. Удержание мест
        let hold_request = HoldSeatsRequest {
            showtime_id: held.showtime_id.clone(),
            seat_ids: held.seat_ids.clone(),
            customer_phone: held.customer_phone.clone(),
        };
        if let Err(e) = self.backend.hold_seats(&hold_request).await {
            return Err(self.on_hold_failed(e).await);
        }
        info!("Seats {:?} held for showtime {}", held.seat_ids, held.showtime_id);
        self.hold = Some(held);
        self.state = CheckoutState::SeatsHeld;

        // 2. Бронь
        let booking_request = CreateBookingRequest {
            showtime_id: self.showtime.id.clone(),
            customer_info: customer,
            seats: summary.seat_ids.clone(),
            ticket_types: summary.ticket_lines.clone(),
            concessions: summary.concession_selections(),
        };
        let booking = match self.backend.create_booking(&booking_request).await {
            Ok(b) if b.id.trim().is_empty() || b.confirmation_code.trim().is_empty() => {
                let e = ApiError::Decode("booking response without id or confirmation code".into());
                return Err(self.compensate(e).await);
            }
            Ok(b) => b,
            Err(e) => return Err(self.compensate(e).await),
        };
        info!("Booking {} created ({})", booking.confirmation_code, booking.id);
        self.state = CheckoutState::BookingCreated;

        // 3. Ссылка на шлюз
        let return_url = match payment::build_return_url(return_url, &booking) {
            Ok(url) => url,
            Err(e) => return Err(self.compensate(e).await),
        };
        let payment_request = PaymentUrlRequest {
            booking_id: booking.id.clone(),
            return_url,
        };
        let session = match self.backend.create_payment_url(&payment_request).await {
            Ok(session) => session,
            Err(e) => return Err(self.compensate(e).await),
        };

        let redirect = PaymentRedirect {
            payment_url: session.payment_url.clone(),
            booking_id: booking.id.clone(),
            confirmation_code: booking.confirmation_code.clone(),
            total: summary.total(),
        };
        self.booking = Some(booking);
        self.state = CheckoutState::RedirectedToGateway {
            payment_url: session.payment_url,
        };
        Ok(redirect)
    }

    async fn on_hold_failed(&mut self, e: ApiError) -> CheckoutError {
        if !matches!(e, ApiError::Conflict(_)) {
            warn!("Seat hold failed: {}", e);
            return e.into();
        }
        let message = e.message().to_string();

        warn!("Seat hold conflict: {}", message);
        self.state = CheckoutState::SelectingSeats;
        match self.backend.seat_map(&self.showtime.id).await {
            Ok(seats) => {
                let taken = self.selection.replace_seat_map(seats);
                CheckoutError::SeatsTaken {
                    seats: taken,
                    message,
                }
            }
            Err(refresh_err) => {
                // карта недоступна: снимаем хотя бы места, названные в ответе
                warn!("Could not refresh seat map after conflict: {}", refresh_err);
                let named: Vec<String> = self
                    .selection
                    .selected_ids()
                    .iter()
                    .filter(|id| message.split(|c: char| !c.is_alphanumeric()).any(|w| w == id.as_str()))
                    .cloned()
                    .collect();
                self.selection.mark_unavailable(&named);
                CheckoutError::SeatsTaken {
                    seats: named,
                    message,
                }
            }
        }
    }

    /// Частичный сбой после удержания: освобождаем места и возвращаем исходную ошибку.
    async fn compensate(&mut self, cause: ApiError) -> CheckoutError {
        error!("Checkout step failed after seats were held: {}", cause);
        self.release_held("checkout failure").await;
        self.booking = None;
        self.state = CheckoutState::InfoEntry;
        cause.into()
    }

    /// Освобождает удержанные места. Удержание забывается только после
    /// успешного release, чтобы повторная отмена могла попробовать снова.
    async fn release_held(&mut self, reason: &str) -> bool {
        let Some(held) = self.hold.as_ref() else {
            return false;
        };
        let request = ReleaseSeatsRequest {
            showtime_id: held.showtime_id.clone(),
            seat_ids: held.seat_ids.clone(),
        };
        match self.backend.release_seats(&request).await {
            Ok(()) => {
                info!("Released seats {:?} ({})", request.seat_ids, reason);
                self.hold = None;
                true
            }
            Err(e) => {
                error!("Failed to release seats {:?} ({}): {}", request.seat_ids, reason, e);
                false
            }
        }
    }

    // --- Таймаут, отмена, подтверждение ---

    /// Окно удержания истекло до завершения оплаты.
    pub async fn expire_hold(&mut self) -> bool {
        if matches!(self.state, CheckoutState::PaymentConfirmed) {
            return false;
        }
        let released = self.release_held("hold expired").await;
        self.booking = None;
        self.state = CheckoutState::HoldExpired;
        released
    }

    /// Возврат к выбору мест со свежей картой зала.
    pub async fn back_to_seat_selection(&mut self) -> Result<Vec<String>, CheckoutError> {
        if matches!(self.state, CheckoutState::PaymentConfirmed) {
            return Err(self.invalid("return to seat selection"));
        }
        if self.hold.is_some() {
            self.release_held("back to seat selection").await;
        }
        let seats = self.backend.seat_map(&self.showtime.id).await?;
        let dropped = self.selection.replace_seat_map(seats);
        self.booking = None;
        self.state = CheckoutState::SelectingSeats;
        Ok(dropped)
    }

    /// Отмена пользователем до оплаты. Повторный вызов ничего не делает.
    pub async fn cancel(&mut self) -> Result<bool, CheckoutError> {
        if matches!(self.state, CheckoutState::PaymentConfirmed) {
            return Err(self.invalid("cancel"));
        }
        let released = self.release_held("cancelled by user").await;
        self.booking = None;
        self.state = CheckoutState::SelectingSeats;
        Ok(released)
    }

    /// Обрабатывает возврат браузера со шлюза.
    ///
    /// Если бронь уже создана этим оформлением, возврат обязан ссылаться на неё;
    /// иначе показывается экран ошибки, а удержание остаётся за нами.
    pub async fn confirm(&mut self, ret: &GatewayReturn, success_code: &str) -> ConfirmationView {
        if let Some(own) = &self.booking {
            if ret.lookup_key().is_some() && !ret.refers_to(own) {
                warn!(
                    "Gateway return {:?} does not match booking {} ({})",
                    ret.lookup_key(),
                    own.confirmation_code,
                    own.id
                );
                let view = ConfirmationView::failure(FailureReason::ForeignBooking, None);
                if let ConfirmationView::Failure { message, .. } = &view {
                    self.state = CheckoutState::PaymentFailed {
                        message: message.clone(),
                    };
                }
                return view;
            }
        }

        let view = payment::resolve_return(&self.backend, ret, success_code).await;
        match &view {
            ConfirmationView::Success { booking } => {
                // места проданы, освобождать нечего
                self.hold = None;
                self.selection.clear();
                self.booking = Some(booking.clone());
                self.state = CheckoutState::PaymentConfirmed;
            }
            ConfirmationView::Failure { message, .. } => {
                if ret.gateway_declined(success_code) {
                    self.release_held("payment declined").await;
                }
                self.state = CheckoutState::PaymentFailed {
                    message: message.clone(),
                };
            }
        }
        view
    }
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Vui lòng nhập đầy đủ thông tin khách hàng.".to_string())
}

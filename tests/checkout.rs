mod common;

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cinema_booking::config::BookingDefaults;
use cinema_booking::controllers::serve_callback;
use cinema_booking::error::ApiError;
use cinema_booking::models::CustomerInfo;
use cinema_booking::services::api_client::CinemaApiClient;
use cinema_booking::services::catalog;
use cinema_booking::services::checkout::{CheckoutError, CheckoutFlow, CheckoutState};
use cinema_booking::services::order::ConcessionCart;
use cinema_booking::services::payment::{ConfirmationView, GatewayReturn};
use common::{booking_json, client, ok, seats_json, showtime_json};

const RETURN_URL: &str = "http://127.0.0.1:5173/payment/return";

fn defaults() -> BookingDefaults {
    BookingDefaults {
        ticket_type: "Người lớn".into(),
        fallback_ticket_price: 90000,
    }
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        full_name: "Nguyễn Văn A".into(),
        phone: "0901234567".into(),
        email: Some("a@example.com".into()),
    }
}

async fn mount(server: &MockServer, http_method: &str, route: &str, body: Value) {
    Mock::given(method(http_method))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Всё для страницы сеанса, кроме карты мест.
async fn mount_page(server: &MockServer) {
    mount(server, "GET", "/api/showtimes/S", ok(showtime_json())).await;
    mount(
        server,
        "GET",
        "/api/movies/m1",
        ok(json!({ "id": "m1", "title": "Lật Mặt 7", "duration": 138 })),
    )
    .await;
    mount(
        server,
        "GET",
        "/api/cinemas/c1",
        ok(json!({
            "id": "c1",
            "name": "Galaxy Nguyễn Du",
            "address": "116 Nguyễn Du, Quận 1",
            "rooms": [{ "id": "r1", "name": "Phòng 1", "capacity": 120, "type": "2D" }]
        })),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/concessions"))
        .and(query_param("cinemaId", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([
            { "id": "pop", "name": "Bắp rang bơ", "price": 55000 }
        ]))))
        .mount(server)
        .await;
}

async fn open_flow(server: &MockServer, seats: &[&str]) -> CheckoutFlow<CinemaApiClient> {
    let api = client(server);
    let page = catalog::booking_page(&api, "S").await.unwrap();
    assert_eq!(page.room.as_ref().map(|r| r.name.as_str()), Some("Phòng 1"));
    let mut flow = CheckoutFlow::from_page(api, &page, &defaults());
    for id in seats {
        flow.toggle_seat(id).unwrap();
    }
    flow.proceed_to_info().unwrap();
    flow
}

async fn post_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| r.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn books_two_seats_and_confirms_from_backend_record() {
    let server = MockServer::start().await;
    mount_page(&server).await;
    mount(&server, "GET", "/api/showtimes/S/seats", ok(seats_json(&[]))).await;
    mount(&server, "POST", "/api/seats/hold", json!({ "success": true })).await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .and(body_partial_json(json!({
            "showtimeId": "S",
            "seats": ["A1", "A2"],
            "ticketTypes": [{ "type": "Người lớn", "quantity": 2, "pricePerTicket": 90000 }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(ok(booking_json("pending"))))
        .expect(1)
        .mount(&server)
        .await;
    mount(
        &server,
        "POST",
        "/api/payments/vnpay/create-url",
        ok(json!({ "paymentUrl": "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?vnp_TxnRef=booking-1" })),
    )
    .await;
    mount(&server, "GET", "/api/bookings/code/BK123", ok(booking_json("confirmed"))).await;

    let mut flow = open_flow(&server, &["A1", "A2"]).await;
    let redirect = flow
        .submit(customer(), &[], &ConcessionCart::default(), RETURN_URL)
        .await
        .unwrap();
    assert_eq!(redirect.confirmation_code, "BK123");
    assert_eq!(redirect.total, 180000);
    assert!(redirect.payment_url.starts_with("https://sandbox.vnpayment.vn/"));

    assert_eq!(
        post_paths(&server).await,
        ["/api/seats/hold", "/api/bookings", "/api/payments/vnpay/create-url"]
    );
    let payment_request = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/api/payments/vnpay/create-url")
        .unwrap();
    let body: Value = serde_json::from_slice(&payment_request.body).unwrap();
    assert_eq!(body["bookingId"], "booking-1");
    assert_eq!(
        body["returnUrl"],
        "http://127.0.0.1:5173/payment/return?bookingId=booking-1&confirmationCode=BK123"
    );

    let ret = GatewayReturn::parse(
        "/payment/return?bookingId=booking-1&confirmationCode=BK123&vnp_ResponseCode=00&vnp_Amount=18000000",
    )
    .unwrap();
    match flow.confirm(&ret, "00").await {
        ConfirmationView::Success { booking } => {
            assert_eq!(booking.seats, vec!["A1", "A2"]);
            assert_eq!(booking.total_price, 180000);
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(flow.state(), &CheckoutState::PaymentConfirmed);
}

#[tokio::test]
async fn hold_conflict_returns_to_seat_selection_without_booking() {
    let server = MockServer::start().await;
    mount_page(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/showtimes/S/seats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(seats_json(&[]))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(&server, "GET", "/api/showtimes/S/seats", ok(seats_json(&["A1"]))).await;
    Mock::given(method("POST"))
        .and(path("/api/seats/hold"))
        .respond_with(ResponseTemplate::new(409).set_body_json(common::fail("Ghế A1 đã được giữ")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut flow = open_flow(&server, &["A1", "A2"]).await;
    let err = flow
        .submit(customer(), &[], &ConcessionCart::default(), RETURN_URL)
        .await
        .unwrap_err();

    match err {
        CheckoutError::SeatsTaken { seats, .. } => assert_eq!(seats, vec!["A1".to_string()]),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(flow.state(), &CheckoutState::SelectingSeats);
    assert!(!flow.selection().seat("A1").unwrap().is_available());
    assert_eq!(flow.selection().selected_ids(), ["A2"]);
    assert_eq!(post_paths(&server).await, ["/api/seats/hold"]);
}

#[tokio::test]
async fn failed_booking_releases_held_seats() {
    let server = MockServer::start().await;
    mount_page(&server).await;
    mount(&server, "GET", "/api/showtimes/S/seats", ok(seats_json(&[]))).await;
    mount(&server, "POST", "/api/seats/hold", json!({ "success": true })).await;
    Mock::given(method("POST"))
        .and(path("/api/bookings"))
        .respond_with(ResponseTemplate::new(500).set_body_json(common::fail("db down")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/seats/release"))
        .and(body_partial_json(json!({ "showtimeId": "S", "seatIds": ["A1"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut flow = open_flow(&server, &["A1"]).await;
    let err = flow
        .submit(customer(), &[], &ConcessionCart::default(), RETURN_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Api(ApiError::Server { status: 500, .. })));
    assert!(flow.held().is_none());
    assert_eq!(
        post_paths(&server).await,
        ["/api/seats/hold", "/api/bookings", "/api/seats/release"]
    );

    // ничего не удержано: отмена не шлёт второй release
    assert!(!flow.cancel().await.unwrap());
}

#[tokio::test]
async fn showtime_without_price_uses_fallback() {
    for price in [None, Some(Value::Null)] {
        let server = MockServer::start().await;
        let mut showtime = showtime_json();
        let fields = showtime.as_object_mut().unwrap();
        fields.remove("price");
        if let Some(price) = price {
            fields.insert("price".into(), price);
        }
        mount(&server, "GET", "/api/showtimes/S", ok(showtime)).await;
        mount(&server, "GET", "/api/movies/m1", ok(json!({ "id": "m1", "title": "Lật Mặt 7" }))).await;
        mount(&server, "GET", "/api/cinemas/c1", ok(json!({ "id": "c1", "name": "Galaxy Nguyễn Du" }))).await;
        mount(&server, "GET", "/api/concessions", ok(json!([]))).await;
        mount(&server, "GET", "/api/showtimes/S/seats", ok(seats_json(&[]))).await;

        let page = catalog::booking_page(&client(&server), "S").await.unwrap();
        assert_eq!(page.showtime.price, 0);
        assert_eq!(page.ticket_price(90000), 90000);

        let flow = CheckoutFlow::from_page(client(&server), &page, &defaults());
        assert_eq!(flow.showtime().price, 90000);
    }
}

#[tokio::test]
async fn unknown_showtime_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/showtimes/nope"))
        .respond_with(ResponseTemplate::new(400).set_body_json(common::fail("Invalid showtime id")))
        .mount(&server)
        .await;

    let err = catalog::booking_page(&client(&server), "nope").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn callback_listener_forwards_gateway_return() {
    let mut listener = serve_callback("127.0.0.1:0".parse().unwrap(), "/payment/return")
        .await
        .unwrap();
    let base = format!("http://{}", listener.local_addr);
    let http = reqwest::Client::new();

    let health = http.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    let response = http
        .get(format!(
            "{base}/payment/return?bookingId=booking-1&confirmationCode=BK123&vnp_ResponseCode=24"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let ret = listener.returns.recv().await.unwrap();
    assert_eq!(ret.confirmation_code.as_deref(), Some("BK123"));
    assert!(ret.gateway_declined("00"));

    listener.shutdown().await;
}

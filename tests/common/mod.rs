#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

use cinema_booking::services::api_client::CinemaApiClient;
use cinema_booking::services::circuit_breaker::CircuitBreaker;

pub fn client(server: &MockServer) -> CinemaApiClient {
    client_with(server, 2, 5)
}

pub fn client_with(server: &MockServer, max_retries: u32, breaker_threshold: u32) -> CinemaApiClient {
    CinemaApiClient::new(
        &format!("{}/api", server.uri()),
        reqwest::Client::new(),
        Arc::new(CircuitBreaker::new(breaker_threshold, 60)),
        max_retries,
    )
    .expect("valid base url")
}

pub fn ok(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

pub fn fail(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

pub fn showtime_json() -> Value {
    json!({
        "id": "S",
        "movieId": "m1",
        "cinemaId": "c1",
        "roomId": "r1",
        "showDateTime": "2024-05-16T19:30:00.000Z",
        "price": 90000
    })
}

pub fn seats_json(held: &[&str]) -> Value {
    let seats: Vec<Value> = ["A1", "A2", "A3"]
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "row": "A",
                "number": id[1..].parse::<u32>().unwrap(),
                "type": "standard",
                "status": if held.contains(id) { "holding" } else { "available" },
                "price": 90000
            })
        })
        .collect();
    Value::Array(seats)
}

pub fn booking_json(status: &str) -> Value {
    json!({
        "_id": "booking-1",
        "confirmationCode": "BK123",
        "showtimeId": "S",
        "seats": ["A1", "A2"],
        "ticketTypes": [{ "type": "Người lớn", "quantity": 2, "pricePerTicket": 90000 }],
        "concessions": [],
        "totalPrice": 180000,
        "status": status
    })
}

use mockwebserver::prelude::*;
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

#[test]
fn stop_waits_for_in_flight_request_test() {
    // Arrange
    let _ = env_logger::try_init();
    let server = Arc::new(MockServer::new());
    let url = server.start().unwrap();
    server.enqueue_response(
        MockResponse::new()
            .body("slow")
            .delay(Duration::from_millis(800)),
    );

    let client = thread::spawn(move || {
        let response = reqwest::blocking::get(url).unwrap();
        (response.status().as_u16(), response.text().unwrap())
    });

    // The request is recorded before its response is written, so it is in flight now.
    server.take_request();

    // Act
    let start = Instant::now();
    server.stop().unwrap();
    let stop_duration = start.elapsed();

    // Assert
    let (status, body) = client.join().unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, "slow");
    assert!(stop_duration >= Duration::from_millis(500));
}

#[test]
fn requests_after_stop_are_refused_test() {
    // Arrange
    let server = MockServer::new();
    let url = server.start().unwrap();

    // Act
    server.stop().unwrap();

    // Assert
    assert!(reqwest::blocking::get(&url).is_err());
    assert!(server.address().is_none());
    assert_eq!(server.received_requests(), 0);
}

#[test]
fn drop_stops_server_test() {
    // Arrange
    let url = {
        let server = MockServer::new();
        server.start().unwrap()
    };

    // Act & Assert
    assert!(reqwest::blocking::get(&url).is_err());
}

#[test]
fn stop_closes_idle_keep_alive_connections_test() {
    // Arrange
    let server = MockServer::new();
    server.start().unwrap();
    let client = reqwest::blocking::Client::new();

    // Act: leaves an idle keep-alive connection in the client's pool
    let response = client.get(server.url("/")).send().unwrap();
    assert_eq!(response.status(), 200);
    response.text().unwrap();

    let start = Instant::now();
    server.stop().unwrap();

    // Assert
    assert!(start.elapsed() < Duration::from_secs(5));
}

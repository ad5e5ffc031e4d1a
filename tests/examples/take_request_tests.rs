use mockwebserver::prelude::*;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::{
    sync::{mpsc, Arc},
    thread,
    time::{Duration, Instant},
};

#[test]
fn no_recorded_requests_with_timeout_test() {
    // Arrange
    let server = MockServer::new();
    server.start().unwrap();
    let timeout = Duration::from_secs(1);
    let start = Instant::now();

    // Act
    let request = server.take_request_with_timeout(timeout);

    // Assert
    assert!(request.is_none());
    assert!(start.elapsed() >= timeout);
}

#[test]
fn try_take_request_does_not_block_test() {
    // Arrange
    let server = MockServer::new();
    server.start().unwrap();

    // Act & Assert
    assert!(server.try_take_request().is_none());

    reqwest::blocking::get(server.url("/ping")).unwrap();

    assert_eq!(server.try_take_request().unwrap().path(), "/ping");
    assert!(server.try_take_request().is_none());
}

#[test]
fn take_request_blocks_until_request_arrives_test() {
    // Arrange
    let server = Arc::new(MockServer::new());
    server.start().unwrap();

    let (sender, receiver) = mpsc::channel();
    let taker = {
        let server = server.clone();
        thread::spawn(move || {
            let request = server.take_request();
            sender.send(request.path().to_string()).unwrap();
        })
    };

    // Assert: nothing has been received, so the taking thread is still blocked
    assert!(receiver.recv_timeout(Duration::from_millis(300)).is_err());

    // Act
    reqwest::blocking::get(server.url("/unblock")).unwrap();

    // Assert
    let path = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(path, "/unblock");
    taker.join().unwrap();
}

#[test]
fn take_request_drains_requests_in_arrival_order_test() {
    // Arrange
    let server = MockServer::new();
    server.start().unwrap();

    // Act
    for i in 0..5 {
        reqwest::blocking::get(server.url(format!("/{}", i))).unwrap();
    }

    // Assert
    for i in 0..5 {
        let request = server.take_request();
        assert_eq!(request.path(), format!("/{}", i));
        assert_eq!(request.index(), i);
    }
    assert!(server.try_take_request().is_none());
    assert_eq!(server.received_requests(), 5);
}

#[test]
fn recorded_request_details_test() {
    // Arrange
    let server = MockServer::new();
    server.start().unwrap();

    // Act
    Client::new()
        .post(server.url("/users?active=true&name=Fred%20Flintstone"))
        .header("Content-Type", "application/json")
        .header("X-Request-Id", "42")
        .body(json!({ "name": "Fred" }).to_string())
        .send()
        .unwrap();

    // Assert
    let request = server.take_request();
    assert_eq!(request.method(), "POST");
    assert_eq!(request.path(), "/users");
    assert_eq!(request.query(), Some("active=true&name=Fred%20Flintstone"));
    assert_eq!(
        request.query_params(),
        vec![
            ("active".to_string(), "true".to_string()),
            ("name".to_string(), "Fred Flintstone".to_string())
        ]
    );
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-request-id"), Some("42"));
    assert_eq!(request.version(), "HTTP/1.1");
    assert_eq!(request.body_json::<Value>().unwrap(), json!({ "name": "Fred" }));
    assert_eq!(
        request.remote_addr().unwrap().ip(),
        server.address().unwrap().ip()
    );
}

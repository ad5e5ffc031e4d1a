use mockwebserver::prelude::*;
use std::{
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};

fn rendezvous_server() -> Arc<MockServer> {
    let server = MockServer::builder()
        .dispatch_policy(DispatchPolicy::Rendezvous)
        .build();
    server.start().unwrap();
    Arc::new(server)
}

fn get_in_background(url: String) -> mpsc::Receiver<(u16, String)> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let response = reqwest::blocking::get(url).unwrap();
        let status = response.status().as_u16();
        sender.send((status, response.text().unwrap())).unwrap();
    });
    receiver
}

#[test]
fn request_waits_for_handler_test() {
    // Arrange
    let _ = env_logger::try_init();
    let server = rendezvous_server();

    // Act
    let response = get_in_background(server.url("/early"));

    // Assert: the request has been recorded but has no response yet
    let request = server
        .take_request_with_timeout(Duration::from_secs(5))
        .unwrap();
    assert_eq!(request.path(), "/early");
    assert!(response.recv_timeout(Duration::from_millis(300)).is_err());

    // Act
    server.enqueue(|_| MockResponse::new().status(201).body("late"));

    // Assert
    let (status, body) = response.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(status, 201);
    assert_eq!(body, "late");
}

#[test]
fn queued_handler_is_used_right_away_test() {
    // Arrange
    let server = rendezvous_server();
    server.enqueue(|_| MockResponse::new().status(204));

    // Act
    let response = reqwest::blocking::get(server.url("/")).unwrap();

    // Assert
    assert_eq!(response.status(), 204);
    assert_eq!(server.pending_handlers(), 0);
}

#[test]
fn waiting_requests_are_served_in_arrival_order_test() {
    // Arrange
    let server = rendezvous_server();

    let first = get_in_background(server.url("/first"));
    assert_eq!(server.take_request().path(), "/first");
    let second = get_in_background(server.url("/second"));
    assert_eq!(server.take_request().path(), "/second");

    // Act
    server.enqueue(|req| MockResponse::new().body(format!("one for {}", req.path())));
    server.enqueue(|req| MockResponse::new().body(format!("two for {}", req.path())));

    // Assert
    let (_, first_body) = first.recv_timeout(Duration::from_secs(5)).unwrap();
    let (_, second_body) = second.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first_body, "one for /first");
    assert_eq!(second_body, "two for /second");
}

#[test]
fn stop_releases_waiting_requests_test() {
    // Arrange
    let server = rendezvous_server();
    let response = get_in_background(server.url("/never-served"));
    assert_eq!(server.take_request().path(), "/never-served");

    // Act
    server.stop().unwrap();

    // Assert
    let (status, body) = response.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(status, 503);
    assert_eq!(body, "");
    assert!(!server.is_running());
}

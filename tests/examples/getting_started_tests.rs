use mockwebserver::prelude::*;
use std::time::Duration;

#[test]
fn getting_started_test() {
    // Arrange
    let _ = env_logger::try_init();
    let server = MockServer::new();
    let url = server.start().unwrap();

    server.enqueue(|_| {
        MockResponse::new()
            .status(500)
            .body("https://giphy.com/gifs/sloth-WVLZLE4yGCQFi\n")
    });
    server.enqueue(|_| MockResponse::new().body("This is the response you are looking for.\n"));

    // Act: Send the first HTTP request
    let response = reqwest::blocking::get(&url).unwrap();

    // Assert
    assert_eq!(response.status(), 500);
    assert_eq!(
        response.text().unwrap(),
        "https://giphy.com/gifs/sloth-WVLZLE4yGCQFi\n"
    );
    assert_eq!(server.take_request().uri(), "/");

    // Act: Send the second HTTP request
    let response = reqwest::blocking::get(format!("{}/foo", url)).unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().unwrap(),
        "This is the response you are looking for.\n"
    );
    let request = server
        .take_request_with_timeout(Duration::from_secs(1))
        .unwrap();
    assert_eq!(request.uri(), "/foo");

    server.stop().unwrap();
}

#[test]
fn handlers_are_used_in_order_regardless_of_path_test() {
    // Arrange
    let server = MockServer::new();
    let url = server.start().unwrap();

    server.enqueue(|_| MockResponse::new().status(500).body("err"));
    server.enqueue(|_| MockResponse::new().status(200).body("ok\n"));

    // Act
    let first = reqwest::blocking::get(&url).unwrap();
    let first_status = first.status();
    let first_body = first.text().unwrap();

    let second = reqwest::blocking::get(server.url("/foo")).unwrap();
    let second_status = second.status();
    let second_body = second.text().unwrap();

    // Assert
    assert_eq!(first_status, 500);
    assert_eq!(first_body, "err");
    assert_eq!(second_status, 200);
    assert_eq!(second_body, "ok\n");

    assert_eq!(server.take_request().path(), "/");
    assert_eq!(server.take_request().path(), "/foo");
    assert_eq!(server.pending_handlers(), 0);
}

#[tokio::test]
async fn async_getting_started_test() {
    // Arrange
    let server = MockServer::new();
    let url = server.start_async().await.unwrap();

    server.enqueue(|req| MockResponse::new().body(format!("Hello from {}!", req.path())));

    // Act
    let response = reqwest::get(format!("{}/hello", url)).await.unwrap();
    let status = response.status();
    let body = response.text().await.unwrap();

    // Assert
    assert_eq!(status, 200);
    assert_eq!(body, "Hello from /hello!");

    let request = server.take_request_async().await;
    assert_eq!(request.method(), "GET");
    assert_eq!(request.path(), "/hello");

    let none = server
        .take_request_with_timeout_async(Duration::from_millis(100))
        .await;
    assert!(none.is_none());
}

use mockwebserver::prelude::*;
use reqwest::blocking::Client;

#[test]
fn large_body_test() {
    // Arrange
    let server = MockServer::new();
    server.start().unwrap();
    let body = "wow so large".repeat(1000000); // ~12 MB body

    server.enqueue(|req| MockResponse::new().status(202).body(req.body().len().to_string()));

    // Act: Send the HTTP request
    let response = Client::new()
        .post(server.url("/search"))
        .body(body.clone())
        .send()
        .unwrap();

    // Assert
    assert_eq!(response.status(), 202);
    assert_eq!(response.text().unwrap(), body.len().to_string());
    assert_eq!(server.take_request().body_string(), body);
}

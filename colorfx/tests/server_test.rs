use colorfx::{ColorServer, Config, codec, handler::ProcessResponse};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use std::{io::Cursor, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Notify,
    time::timeout,
};

const BOUNDARY: &str = "colorfx-test-boundary";

async fn start_server(config: Config) -> (SocketAddr, Arc<Notify>) {
    let exit_notify = Arc::new(Notify::new());
    let server = ColorServer::new(
        config.with_address("127.0.0.1".to_string()).with_port(0),
        exit_notify.clone(),
    );

    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));

    (addr, exit_notify)
}

async fn send(addr: SocketAddr, request: Vec<u8>) -> (u16, Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&request).await.unwrap();

    let mut response = vec![];
    stream.read_to_end(&mut response).await.unwrap();
    parse_response(&response)
}

fn parse_response(response: &[u8]) -> (u16, Value) {
    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap();
    let head = String::from_utf8_lossy(&response[..split]).to_string();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    let body = &response[split + 4..];

    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).unwrap()
    };
    (status, json)
}

fn request(method: &str, path: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut data = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    data.extend_from_slice(body);
    data
}

fn chunked_request(path: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut data = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: {content_type}\r\nTransfer-Encoding: chunked\r\n\r\n"
    )
    .into_bytes();
    for part in body.chunks(1000) {
        data.extend_from_slice(format!("{:x}\r\n", part.len()).as_bytes());
        data.extend_from_slice(part);
        data.extend_from_slice(b"\r\n");
    }
    data.extend_from_slice(b"0\r\n\r\n");
    data
}

fn multipart(filename: Option<&str>, image: &[u8], effect: Option<&str>) -> Vec<u8> {
    let mut body = vec![];
    if let Some(filename) = filename {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(effect) = effect {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"effect\"\r\n\r\n{effect}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(body: &[u8]) -> Vec<u8> {
    request(
        "POST",
        "/process",
        &format!("multipart/form-data; boundary={BOUNDARY}"),
        body,
    )
}

fn test_png() -> Vec<u8> {
    let image = RgbImage::from_fn(16, 8, |x, y| Rgb([(x * 16) as u8, (y * 32) as u8, 100]));
    let mut bytes = vec![];
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn decode_result(json: Value) -> (ProcessResponse, DynamicImage) {
    let response: ProcessResponse = serde_json::from_value(json).unwrap();
    let jpeg = codec::decode_base64(&response.processed_image).unwrap();
    assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    let image = image::load_from_memory(&jpeg).unwrap();
    (response, image)
}

#[tokio::test]
async fn test_index() {
    let (addr, _) = start_server(Config::default()).await;
    let (status, json) = send(addr, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec()).await;

    assert_eq!(status, 200);
    assert_eq!(json["status"], "running");
    assert_eq!(json["message"], "Photo Color Processing Service");
    assert_eq!(
        json["available_effects"],
        json!(["enhance", "vintage", "cool", "warm", "grayscale", "vibrant"])
    );
}

#[tokio::test]
async fn test_process_upload() {
    let (addr, _) = start_server(Config::default()).await;
    let body = multipart(Some("photo.PNG"), &test_png(), Some("vintage"));
    let (status, json) = send(addr, upload(&body)).await;

    assert_eq!(status, 200);
    let (response, image) = decode_result(json);
    assert_eq!(response.status, "success");
    assert_eq!(response.message, "Image processed with vintage effect");
    assert_eq!(response.effect_applied, "vintage");
    assert_eq!((image.width(), image.height()), (16, 8));
}

#[tokio::test]
async fn test_process_upload_default_effect() {
    let (addr, _) = start_server(Config::default()).await;
    let body = multipart(Some("photo.png"), &test_png(), None);
    let (status, json) = send(addr, upload(&body)).await;

    assert_eq!(status, 200);
    assert_eq!(json["effect_applied"], "enhance");
}

#[tokio::test]
async fn test_process_upload_client_errors() {
    let (addr, _) = start_server(Config::default()).await;
    let png = test_png();

    let (status, json) = send(addr, upload(&multipart(None, &[], Some("warm")))).await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "No image file provided");

    let (status, json) = send(addr, upload(&multipart(Some(""), &[], None))).await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "No file selected");

    let (status, json) = send(addr, upload(&multipart(Some("photo.bmp"), &png, None))).await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "Invalid file format");

    let (status, json) = send(addr, upload(&multipart(Some("a.png"), &png, Some("sparkle")))).await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "Unsupported effect: sparkle");

    let (status, json) = send(addr, upload(&multipart(Some("a.png"), b"not a png", None))).await;
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().starts_with("Invalid image data"));

    let (status, json) = send(addr, request("POST", "/process", "text/plain", b"hi")).await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "No image file provided");
}

#[tokio::test]
async fn test_process_url_base64() {
    let (addr, _) = start_server(Config::default()).await;
    let payload = json!({
        "image_data": codec::encode_base64(&test_png()),
        "effect": "grayscale",
    });
    let (status, json) = send(
        addr,
        request("POST", "/process-url", "application/json", payload.to_string().as_bytes()),
    )
    .await;

    assert_eq!(status, 200);
    let (response, image) = decode_result(json);
    assert_eq!(response.effect_applied, "grayscale");
    assert_eq!((image.width(), image.height()), (16, 8));
}

#[tokio::test]
async fn test_process_url_byte_array() {
    let (addr, _) = start_server(Config::default()).await;
    let payload = json!({ "image_data": test_png() });
    let (status, json) = send(
        addr,
        request("POST", "/process-url", "application/json", payload.to_string().as_bytes()),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(json["effect_applied"], "enhance");
}

#[tokio::test]
async fn test_process_url_client_errors() {
    let (addr, _) = start_server(Config::default()).await;

    let (status, json) = send(addr, request("POST", "/process-url", "application/json", b"")).await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "No image data provided");

    let (status, json) = send(
        addr,
        request("POST", "/process-url", "application/json", br#"{"effect":"cool"}"#),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "No image data provided");

    let (status, json) = send(
        addr,
        request("POST", "/process-url", "application/json", br#"{"image_data":"%%%"}"#),
    )
    .await;
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().starts_with("Invalid image data"));

    let (status, _) = send(addr, request("POST", "/process-url", "application/json", b"{")).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_routing_errors() {
    let (addr, _) = start_server(Config::default()).await;

    let (status, json) = send(addr, b"GET /missing HTTP/1.1\r\n\r\n".to_vec()).await;
    assert_eq!(status, 404);
    assert_eq!(json["error"], "Not found");

    let (status, json) = send(addr, b"GET /process HTTP/1.1\r\n\r\n".to_vec()).await;
    assert_eq!(status, 405);
    assert_eq!(json["error"], "Method not allowed");

    let (status, json) = send(addr, b"OPTIONS /process HTTP/1.1\r\n\r\n".to_vec()).await;
    assert_eq!(status, 200);
    assert_eq!(json, Value::Null);
}

#[tokio::test]
async fn test_body_too_large() {
    let (addr, _) = start_server(Config::default().with_max_body_size(16)).await;
    let (status, _) = send(
        addr,
        request("POST", "/process-url", "application/json", &[b' '; 64]),
    )
    .await;
    assert_eq!(status, 413);
}

#[tokio::test]
async fn test_body_too_large_while_uploading() {
    let (addr, _) = start_server(Config::default().with_max_body_size(16)).await;
    let body = vec![b' '; 256 * 1024];

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let write = stream
        .write_all(&request("POST", "/process-url", "application/json", &body))
        .await;
    assert!(write.is_ok());
    stream.shutdown().await.unwrap();

    let mut response = vec![];
    stream.read_to_end(&mut response).await.unwrap();
    assert_eq!(parse_response(&response).0, 413);
}

#[tokio::test]
async fn test_chunked_process_url() {
    let (addr, _) = start_server(Config::default()).await;
    let payload = json!({
        "image_data": codec::encode_base64(&test_png()),
        "effect": "warm",
    });
    let (status, json) = send(
        addr,
        chunked_request("/process-url", "application/json", payload.to_string().as_bytes()),
    )
    .await;

    assert_eq!(status, 200);
    let (response, image) = decode_result(json);
    assert_eq!(response.effect_applied, "warm");
    assert_eq!((image.width(), image.height()), (16, 8));
}

#[tokio::test]
async fn test_chunked_process_upload() {
    let (addr, _) = start_server(Config::default()).await;
    let body = multipart(Some("photo.png"), &test_png(), Some("cool"));
    let (status, json) = send(
        addr,
        chunked_request(
            "/process",
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            &body,
        ),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(json["effect_applied"], "cool");
}

#[tokio::test]
async fn test_unsupported_transfer_encoding() {
    let (addr, _) = start_server(Config::default()).await;
    let (status, json) = send(
        addr,
        b"POST /process-url HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n".to_vec(),
    )
    .await;

    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("transfer-encoding"));
}

#[tokio::test]
async fn test_expect_continue() {
    let (addr, _) = start_server(Config::default()).await;
    let payload = json!({ "image_data": codec::encode_base64(&test_png()) }).to_string();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!(
        "POST /process-url HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nExpect: 100-continue\r\nContent-Length: {}\r\n\r\n",
        payload.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();

    let interim = b"HTTP/1.1 100 Continue\r\n\r\n";
    let mut buf = vec![0u8; interim.len()];
    timeout(Duration::from_secs(3), stream.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(buf, interim);

    stream.write_all(payload.as_bytes()).await.unwrap();
    let mut response = vec![];
    stream.read_to_end(&mut response).await.unwrap();

    let (status, json) = parse_response(&response);
    assert_eq!(status, 200);
    assert_eq!(json["effect_applied"], "enhance");
}

#[tokio::test]
async fn test_read_timeout() {
    let (addr, _) = start_server(Config::default().with_read_timeout_ms(200)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /process-url HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
        .await
        .unwrap();

    let mut response = vec![];
    timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();

    let (status, json) = parse_response(&response);
    assert_eq!(status, 408);
    assert_eq!(json["error"], "Request timeout");
}

#[tokio::test]
async fn test_exit_notify_stops_server() {
    let exit_notify = Arc::new(Notify::new());
    let server = ColorServer::new(
        Config::default().with_address("127.0.0.1".to_string()).with_port(0),
        exit_notify.clone(),
    );
    let listener = server.bind().await.unwrap();
    let task = tokio::spawn(server.serve(listener));

    exit_notify.notify_one();
    assert!(task.await.unwrap().is_ok());
}

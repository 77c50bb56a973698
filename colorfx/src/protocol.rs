use crate::{ServiceError, ServiceResult};
use http::{Method, StatusCode};
use serde::Serialize;
use std::collections::HashMap;

pub const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    // lowercased names
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Parses the request line and headers, everything before the blank line.
    pub fn parse_head(head: &str) -> ServiceResult<Self> {
        let mut lines = head.split("\r\n");
        let request_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("empty request".to_string()))?;

        let mut fields = request_line.split_whitespace();
        let (Some(method), Some(target), Some(version)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(ServiceError::BadRequest(format!(
                "malformed request line: {request_line}"
            )));
        };

        if !version.starts_with("HTTP/1.") {
            return Err(ServiceError::BadRequest(format!(
                "unsupported http version: {version}"
            )));
        }

        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| ServiceError::BadRequest(format!("invalid method: {method}")))?;

        // query strings carry nothing the routes read
        let path = target
            .split_once('?')
            .map_or(target, |(path, _)| path)
            .to_string();

        let mut headers = HashMap::new();
        for line in lines.filter(|line| !line.is_empty()) {
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ServiceError::BadRequest(format!("malformed header: {line}")))?;
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(Self {
            method,
            path,
            headers,
            body: vec![],
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|value| value.as_str())
    }

    pub fn content_length(&self) -> ServiceResult<Option<usize>> {
        self.header("content-length")
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|e| ServiceError::BadRequest(format!("content-length: {e}")))
            })
            .transpose()
    }

    /// Whether the body is sent with `Transfer-Encoding: chunked`. Other
    /// transfer codings are rejected.
    pub fn is_chunked(&self) -> ServiceResult<bool> {
        let Some(value) = self.header("transfer-encoding") else {
            return Ok(false);
        };

        let last = value.rsplit(',').next().unwrap_or_default().trim();
        if last.eq_ignore_ascii_case("chunked") {
            Ok(true)
        } else {
            Err(ServiceError::BadRequest(format!(
                "unsupported transfer-encoding: {value}"
            )))
        }
    }

    pub fn expects_continue(&self) -> bool {
        self.header("expect")
            .is_some_and(|value| value.eq_ignore_ascii_case("100-continue"))
    }
}

/// Index just past the `\r\n\r\n` that ends the request head.
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(HEADER_END.len())
        .position(|window| window == HEADER_END)
        .map(|i| i + HEADER_END.len())
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![
                ("Access-Control-Allow-Origin".to_owned(), "*".to_owned()),
                (
                    "Access-Control-Allow-Headers".to_owned(),
                    "content-type".to_owned(),
                ),
                (
                    "Access-Control-Allow-Methods".to_owned(),
                    "GET, POST, OPTIONS".to_owned(),
                ),
            ],
            body: vec![],
        }
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> ServiceResult<Self> {
        let mut response = Self::new(status);
        response.body = serde_json::to_vec(value)?;
        response
            .headers
            .push(("Content-Type".to_owned(), "application/json".to_owned()));
        Ok(response)
    }

    pub fn error(err: &ServiceError) -> Self {
        let status = err.status_code();
        let mut response = Self::new(status);
        response.body = serde_json::json!({ "error": err.message() })
            .to_string()
            .into_bytes();
        response
            .headers
            .push(("Content-Type".to_owned(), "application/json".to_owned()));
        response
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        );

        for (key, value) in &self.headers {
            head.push_str(&format!("{key}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Connection: close\r\n\r\n");

        let mut data = head.into_bytes();
        data.extend_from_slice(&self.body);
        data
    }
}

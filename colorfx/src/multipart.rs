use crate::{ServiceError, ServiceResult};

/// One part of a `multipart/form-data` body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Extracts the boundary from a `multipart/form-data; boundary=...` content type.
pub fn boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse(body: &[u8], boundary: &str) -> ServiceResult<Vec<Part>> {
    let delimiter = format!("--{boundary}").into_bytes();
    let separator = format!("\r\n--{boundary}").into_bytes();

    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| ServiceError::BadRequest("multipart boundary not found".to_string()))?
        + delimiter.len();

    let mut parts = vec![];
    loop {
        if body[pos..].starts_with(b"--") {
            break;
        }

        if !body[pos..].starts_with(b"\r\n") {
            return Err(ServiceError::BadRequest(
                "malformed multipart delimiter".to_string(),
            ));
        }
        pos += 2;

        let head_end = find(body, b"\r\n\r\n", pos).ok_or_else(|| {
            ServiceError::BadRequest("unterminated multipart headers".to_string())
        })?;
        let head = std::str::from_utf8(&body[pos..head_end])
            .map_err(|e| ServiceError::BadRequest(format!("multipart headers: {e}")))?;

        let data_start = head_end + 4;
        let data_end = find(body, &separator, data_start).ok_or_else(|| {
            ServiceError::BadRequest("unterminated multipart part".to_string())
        })?;

        let mut part = parse_part_headers(head)?;
        part.data = body[data_start..data_end].to_vec();
        parts.push(part);

        pos = data_end + separator.len();
    }

    Ok(parts)
}

fn parse_part_headers(head: &str) -> ServiceResult<Part> {
    let mut part = Part::default();
    let mut has_disposition = false;

    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                has_disposition = true;
                for param in value.split(';').skip(1) {
                    let Some((k, v)) = param.trim().split_once('=') else {
                        continue;
                    };
                    let v = v.trim().trim_matches('"').to_string();
                    match k.trim() {
                        "name" => part.name = v,
                        "filename" => part.filename = Some(v),
                        _ => (),
                    }
                }
            }
            "content-type" => part.content_type = Some(value.trim().to_string()),
            _ => (),
        }
    }

    if !has_disposition {
        return Err(ServiceError::BadRequest(
            "multipart part without Content-Disposition".to_string(),
        ));
    }

    Ok(part)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| i + from)
}

use crate::{
    Config, ServiceError, ServiceResult, codec, multipart,
    protocol::{HttpRequest, HttpResponse},
};
use color_engine::ColorEffect;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Serialize, Debug)]
pub struct IndexResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub available_effects: Vec<&'static str>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessResponse {
    pub status: String,
    pub message: String,
    pub processed_image: String,
    pub effect_applied: String,
}

#[derive(Deserialize, Debug)]
struct ProcessPayload {
    image_data: Option<Value>,
    effect: Option<String>,
}

/// Routes `request` and turns every failure into a JSON error response.
pub async fn handle(request: HttpRequest, config: Arc<Config>) -> HttpResponse {
    let (method, path) = (request.method.clone(), request.path.clone());

    match route(request, config).await {
        Ok(response) => {
            log::info!("{method} {path} -> {}", response.status.as_u16());
            response
        }
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                log::error!("{method} {path} -> {}: {e}", status.as_u16());
            } else {
                log::warn!("{method} {path} -> {}: {e}", status.as_u16());
            }
            HttpResponse::error(&e)
        }
    }
}

async fn route(request: HttpRequest, config: Arc<Config>) -> ServiceResult<HttpResponse> {
    if request.method == Method::OPTIONS {
        return Ok(HttpResponse::new(StatusCode::OK));
    }

    match (request.path.as_str(), &request.method) {
        ("/", &Method::GET) => index(),
        ("/process", &Method::POST) => process_upload(request, config).await,
        ("/process-url", &Method::POST) => process_payload(request, config).await,
        ("/" | "/process" | "/process-url", _) => Err(ServiceError::MethodNotAllowed),
        _ => Err(ServiceError::NotFound),
    }
}

fn index() -> ServiceResult<HttpResponse> {
    HttpResponse::json(
        StatusCode::OK,
        &IndexResponse {
            status: "running",
            message: "Photo Color Processing Service",
            available_effects: ColorEffect::names(),
        },
    )
}

async fn process_upload(request: HttpRequest, config: Arc<Config>) -> ServiceResult<HttpResponse> {
    let boundary = request
        .header("content-type")
        .and_then(multipart::boundary)
        .ok_or(ServiceError::NoImageFile)?;

    let parts = multipart::parse(&request.body, &boundary)?;

    let effect_name = parts
        .iter()
        .find(|part| part.name == "effect" && !part.is_file())
        .map(|part| part.text());

    let image = parts
        .into_iter()
        .find(|part| part.name == "image" && part.is_file())
        .ok_or(ServiceError::NoImageFile)?;

    let filename = image.filename.as_deref().unwrap_or_default();
    if filename.is_empty() {
        return Err(ServiceError::NoFileSelected);
    }

    if !codec::allowed_file(filename, &config.allowed_extensions) {
        return Err(ServiceError::InvalidFileFormat);
    }

    log::debug!("upload `{filename}` with {} bytes", image.data.len());

    let effect = resolve_effect(effect_name.as_deref(), &config)?;
    processed_response(image.data, effect, config.jpeg_quality).await
}

async fn process_payload(request: HttpRequest, config: Arc<Config>) -> ServiceResult<HttpResponse> {
    if request.body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServiceError::NoImageData);
    }

    let payload: ProcessPayload = serde_json::from_slice(&request.body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid JSON body: {e}")))?;

    let image_data = match payload.image_data {
        None | Some(Value::Null) => return Err(ServiceError::NoImageData),
        Some(Value::String(text)) => codec::decode_base64(&text)?,
        Some(Value::Array(values)) => byte_array(&values)?,
        Some(other) => {
            return Err(ServiceError::InvalidImageData(format!(
                "unexpected image_data type: {}",
                json_type_name(&other)
            )));
        }
    };

    let effect = resolve_effect(payload.effect.as_deref(), &config)?;
    processed_response(image_data, effect, config.jpeg_quality).await
}

/// Missing effect falls back to the configured default, unknown names are rejected.
fn resolve_effect(name: Option<&str>, config: &Config) -> ServiceResult<ColorEffect> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(name.parse::<ColorEffect>()?),
        _ => Ok(config.default_effect.parse::<ColorEffect>()?),
    }
}

async fn processed_response(
    data: Vec<u8>,
    effect: ColorEffect,
    quality: u8,
) -> ServiceResult<HttpResponse> {
    let jpeg =
        tokio::task::spawn_blocking(move || codec::process(&data, effect, quality)).await??;

    HttpResponse::json(
        StatusCode::OK,
        &ProcessResponse {
            status: "success".to_string(),
            message: format!("Image processed with {effect} effect"),
            processed_image: codec::encode_base64(&jpeg),
            effect_applied: effect.name().to_string(),
        },
    )
}

fn byte_array(values: &[Value]) -> ServiceResult<Vec<u8>> {
    values
        .iter()
        .map(|value| {
            value
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| {
                    ServiceError::InvalidImageData(format!("{value} is not a byte value"))
                })
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

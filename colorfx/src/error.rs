use color_engine::ColorEngineError;
use http::StatusCode;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("No image file provided")]
    NoImageFile,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file format")]
    InvalidFileFormat,

    #[error("No image data provided")]
    NoImageData,

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("{0}")]
    UnsupportedEffect(#[from] ColorEngineError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request body of {0} bytes is too large")]
    BodyTooLarge(usize),

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NoImageFile
            | ServiceError::NoFileSelected
            | ServiceError::InvalidFileFormat
            | ServiceError::NoImageData
            | ServiceError::InvalidImageData(_)
            | ServiceError::UnsupportedEffect(_)
            | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::Io(_)
            | ServiceError::Json(_)
            | ServiceError::Image(_)
            | ServiceError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `error` field of the JSON response
    pub fn message(&self) -> String {
        if self.status_code().is_server_error() {
            format!("Processing failed: {self}")
        } else {
            self.to_string()
        }
    }
}

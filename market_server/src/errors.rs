use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use market_engine::OrderFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
}

impl ServerError {
    /// The message shown to the client. Detail of internal failures stays in the server log.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::OrderFlow(e) => match e {
                OrderFlowError::NotFound(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::InvalidPurchase(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::ValidationError(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
                OrderFlowError::VendorNotPayable(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::SignatureInvalid(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::Forbidden => StatusCode::FORBIDDEN,
                OrderFlowError::GatewayError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                OrderFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ Request failed with an internal error. {self}");
        }
        let body = serde_json::json!({ "error": { "code": status.as_u16(), "message": self.public_message() } });
        HttpResponse::build(status).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No vendor session was provided.")]
    MissingToken,
    #[error("The session token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("The session token is invalid or has expired. {0}")]
    ValidationError(String),
}

use axum::http::StatusCode;

/// Handler error: status plus a user-facing message.
pub type ApiError = (StatusCode, String);

pub fn e401<T: Into<String>>(msg: T) -> ApiError {
    (StatusCode::UNAUTHORIZED, msg.into())
}

pub fn e403<T: Into<String>>(msg: T) -> ApiError {
    (StatusCode::FORBIDDEN, msg.into())
}

pub fn e404<T: Into<String>>(msg: T) -> ApiError {
    (StatusCode::NOT_FOUND, msg.into())
}

pub fn e422<T: Into<String>>(msg: T) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, msg.into())
}

pub fn e500<E: std::fmt::Display>(e: E) -> ApiError {
    tracing::error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

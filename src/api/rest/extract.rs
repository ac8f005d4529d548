use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use tracing::warn;

use crate::error::AppError;

/// `Json<T>` whose rejections surface as `AppError::BadRequest`, so malformed
/// bodies and unknown keys get the same structured failure as every other
/// error.
pub struct StrictJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for StrictJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(StrictJson(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                warn!(error = %message, "request body rejected");
                Err(AppError::BadRequest(message))
            }
        }
    }
}

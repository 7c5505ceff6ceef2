use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

/// Caller identity for the HR endpoints.
///
/// The upstream gateway authenticates the session and forwards the caller's
/// employee code in the `X-Employee-ID` header; this service treats that
/// value as an opaque, already-verified reference.
#[derive(Debug, Clone)]
pub struct CallerEmployeeId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CallerEmployeeId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let employee_id = parts
            .headers
            .get("X-Employee-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing X-Employee-ID header"))
            })?;

        tracing::Span::current().record("employee_id", employee_id);

        Ok(CallerEmployeeId(employee_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn extracts_header_value() {
        let request = Request::builder()
            .header("X-Employee-ID", "ENG1234ABC")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let caller = CallerEmployeeId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(caller.0, "ENG1234ABC");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let result = CallerEmployeeId::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}

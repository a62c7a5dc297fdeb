use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

/// Failures surfaced by the dashboard.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// No valid session; answered with a redirect to the login page.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated, but the role does not allow the operation.
    #[error("access denied")]
    Forbidden,

    /// Unknown username or wrong password, deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => Redirect::to("/").into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            Self::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password").into_response()
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            Self::Internal(e) => {
                tracing::error!("Dashboard request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn unauthenticated_redirects_to_login() {
        let resp = DashboardError::Unauthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/");
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            DashboardError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DashboardError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DashboardError::Internal(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

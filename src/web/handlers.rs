use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tower_sessions::Session;

use super::export;
use super::session::{self, CurrentUser};
use super::WebState;
use crate::db::models::{RequestFilter, RequestUpdate};
use crate::error::DashboardError;

const LOGIN_FAILED: &str = "Invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Filter form as submitted; blank fields mean "no filter".
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DashboardQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub site_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_from: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_to: Option<String>,
}

impl DashboardQuery {
    pub fn to_filter(&self) -> Result<RequestFilter, DashboardError> {
        Ok(RequestFilter {
            site_id: self.site_id.clone(),
            status: self.status.clone(),
            date_from: parse_date("date_from", self.date_from.as_deref())?,
            date_to: parse_date("date_to", self.date_to.as_deref())?,
        })
    }
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, DashboardError> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| {
                DashboardError::BadRequest(format!("{} must be a YYYY-MM-DD date", field))
            })
        })
        .transpose()
}

fn empty_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(de)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    )
        .into_response()
}

// ── Authentication ─────────────────────────────────────────────

/// GET /
pub async fn login_page(State(state): State<WebState>) -> Result<Html<String>, DashboardError> {
    Ok(Html(state.templates.login(None)?))
}

/// POST /login
pub async fn login(
    State(state): State<WebState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, DashboardError> {
    match state.service.login(&form.username, &form.password).await {
        Ok(actor) => {
            session::sign_in(&session, &actor).await?;
            Ok(Redirect::to("/dashboard").into_response())
        }
        Err(DashboardError::InvalidCredentials) => {
            let html = state.templates.login(Some(LOGIN_FAILED))?;
            Ok((StatusCode::UNAUTHORIZED, Html(html)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// GET /logout
pub async fn logout(session: Session) -> Result<Redirect, DashboardError> {
    session::sign_out(&session).await?;
    Ok(Redirect::to("/"))
}

// ── Requests ───────────────────────────────────────────────────

/// GET /dashboard
pub async fn dashboard(
    State(state): State<WebState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, DashboardError> {
    let filter = query.to_filter()?;
    let rows = state.service.list(&actor, &filter).await?;
    Ok(Html(state.templates.dashboard(&actor, &rows, &query)?))
}

/// POST /edit/{id}
pub async fn edit(
    State(state): State<WebState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Form(update): Form<RequestUpdate>,
) -> Result<Redirect, DashboardError> {
    state.service.edit(&actor, id, &update).await?;
    Ok(Redirect::to("/dashboard"))
}

/// GET /delete/{id}
pub async fn delete(
    State(state): State<WebState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, DashboardError> {
    state.service.delete(&actor, id).await?;
    Ok(Redirect::to("/dashboard"))
}

// ── Exports ────────────────────────────────────────────────────

/// GET /export
pub async fn export_csv(
    State(state): State<WebState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Response, DashboardError> {
    let rows = state.service.export(&actor).await?;
    let body = export::to_csv(&rows)?;
    Ok(attachment(export::CSV_CONTENT_TYPE, export::CSV_FILENAME, body))
}

/// GET /export-excel
pub async fn export_excel(
    State(state): State<WebState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Response, DashboardError> {
    let rows = state.service.export(&actor).await?;
    let body = tokio::task::spawn_blocking(move || export::to_xlsx(&rows))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(attachment(export::XLSX_CONTENT_TYPE, export::XLSX_FILENAME, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_ignored() {
        let query: DashboardQuery =
            parse_query("site_id=&status=open&date_from=&date_to=2024-05-31");
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.site_id, None);
        assert_eq!(filter.status.as_deref(), Some("open"));
        assert_eq!(filter.date_from, None);
        assert_eq!(filter.date_to, NaiveDate::from_ymd_opt(2024, 5, 31));
    }

    #[test]
    fn malformed_date_is_a_bad_request() {
        let query: DashboardQuery = parse_query("date_from=31.05.2024");
        assert!(matches!(query.to_filter(), Err(DashboardError::BadRequest(_))));
    }

    fn parse_query(qs: &str) -> DashboardQuery {
        let uri: axum::http::Uri = format!("/dashboard?{}", qs).parse().unwrap();
        Query::<DashboardQuery>::try_from_uri(&uri).unwrap().0
    }
}

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, Managed, PageRequest, PagedResult, ServiceError};
use crate::employee::{Employee, EmployeeRequest};
use crate::validation::ValidationOutcome;
use crate::web::context::RequestContext;
use crate::web::problem::ApiResult;
use crate::web::{AppState, WebSettings};

const EMPLOYEES_PATH: &str = "/api/v1/employees";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Raw query values; parsed by hand so bad input is reported per field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page_number: Option<String>,
    pub page_size: Option<String>,
}

impl PaginationQuery {
    pub fn into_page(self, settings: &WebSettings) -> Result<PageRequest, ServiceError> {
        let mut outcome = ValidationOutcome::new();

        let page_number = match self.page_number.as_deref().map(str::trim) {
            None | Some("") => Some(1),
            Some(raw) => match raw.parse::<u32>() {
                Ok(value) if value >= 1 => Some(value),
                _ => {
                    outcome.add("pageNumber", "Page number must be an integer greater than or equal to 1");
                    None
                }
            },
        };

        let page_size = match self.page_size.as_deref().map(str::trim) {
            None | Some("") => Some(settings.default_page_size),
            Some(raw) => match raw.parse::<u32>() {
                Ok(value) if (1..=settings.max_page_size).contains(&value) => Some(value),
                _ => {
                    outcome.add(
                        "pageSize",
                        format!("Page size must be between 1 and {}", settings.max_page_size),
                    );
                    None
                }
            },
        };

        match (page_number, page_size) {
            (Some(number), Some(size)) if outcome.is_valid() => Ok(PageRequest::new(number, size)),
            _ => Err(ServiceError::ValidationFailed(outcome)),
        }
    }
}

fn parse_id(raw: &str) -> Result<EntityId, ServiceError> {
    match raw.trim().parse::<EntityId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ServiceError::ValidationFailed(ValidationOutcome::single(
            "id",
            "Id must be a positive integer",
        ))),
    }
}

fn read_body(
    payload: Result<Json<EmployeeRequest>, JsonRejection>,
) -> Result<EmployeeRequest, ServiceError> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        ServiceError::ValidationFailed(ValidationOutcome::single("body", rejection.body_text()))
    })
}

pub async fn list_employees(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Json<PagedResult<Managed<Employee>>>> {
    let page = query.into_page(&state.settings).map_err(|err| ctx.problem(err))?;
    let result = state
        .employees
        .lifecycle()
        .get_paged(page, &ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;
    Ok(Json(result))
}

pub async fn list_all_employees(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Json<Vec<Managed<Employee>>>> {
    let employees = state
        .employees
        .lifecycle()
        .get_all(&ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;
    Ok(Json(employees))
}

pub async fn get_employee(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Managed<Employee>>> {
    let id = parse_id(&id).map_err(|err| ctx.problem(err))?;
    let employee = state
        .employees
        .lifecycle()
        .get_by_id(id, &ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;
    Ok(Json(employee))
}

pub async fn get_employee_by_email(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(email): Path<String>,
) -> ApiResult<Json<Managed<Employee>>> {
    let employee = state
        .employees
        .get_by_email(&email, &ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;
    Ok(Json(employee))
}

pub async fn list_employees_by_department(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(department): Path<String>,
) -> ApiResult<Json<Vec<Managed<Employee>>>> {
    let employees = state
        .employees
        .get_by_department(&department, &ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;
    Ok(Json(employees))
}

pub async fn create_employee(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<EmployeeRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = read_body(payload).map_err(|err| ctx.problem(err))?;
    let created = state
        .employees
        .lifecycle()
        .create(request, &ctx.actor, &ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;

    let mut response = (StatusCode::CREATED, Json(&created)).into_response();
    if let Ok(location) = HeaderValue::from_str(&format!("{EMPLOYEES_PATH}/{}", created.id)) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    Ok(response)
}

pub async fn update_employee(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<EmployeeRequest>, JsonRejection>,
) -> ApiResult<Json<Managed<Employee>>> {
    let id = parse_id(&id).map_err(|err| ctx.problem(err))?;
    let request = read_body(payload).map_err(|err| ctx.problem(err))?;
    let updated = state
        .employees
        .lifecycle()
        .update(id, request, &ctx.actor, &ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;
    Ok(Json(updated))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id).map_err(|err| ctx.problem(err))?;
    state
        .employees
        .lifecycle()
        .delete(id, &ctx.actor, &ctx.cancel)
        .await
        .map_err(|err| ctx.problem(err))?;
    Ok(StatusCode::NO_CONTENT)
}

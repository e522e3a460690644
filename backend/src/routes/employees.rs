use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use records_storage::{
    employee::{Employee, EmployeeCreateRequest, EmployeeRepository},
    store::CreateOutcome,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{AppError, Created, NoContent, ValidatedJson};

use super::not_blank;

/// Request to create a new employee
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    /// Business-facing employee code, unique across all departments
    #[validate(length(min = 1, max = 20), custom(function = "not_blank"))]
    pub employee_id: String,

    /// Full name
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,

    /// Department the employee belongs to
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub department: String,

    /// Email address
    #[validate(email, length(max = 100))]
    pub email: String,
}

/// Request to replace the mutable fields of an employee
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    /// Full name
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,

    /// Department the employee belongs to; changing it moves the employee
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub department: String,

    /// Email address
    #[validate(email, length(max = 100))]
    pub email: String,
}

/// Employee as returned by the API
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    /// Unique record ID
    pub id: String,
    /// Business-facing employee code
    pub employee_id: String,
    /// Full name
    pub name: String,
    /// Department
    pub department: String,
    /// Email address
    pub email: String,
    /// Creation timestamp
    pub created_date: DateTime<Utc>,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            employee_id: employee.employee_id,
            name: employee.name,
            department: employee.department,
            email: employee.email,
            created_date: employee.created_date,
        }
    }
}

/// Path addressing one department
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DepartmentPath {
    /// Department name
    pub department: String,
}

/// Path addressing a single employee record
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmployeePath {
    /// Department of the employee
    pub department: String,
    /// Unique record ID
    pub id: String,
}

/// Path addressing an employee by business code
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCodePath {
    /// Business-facing employee code
    pub employee_id: String,
}

fn employee_exists() -> AppError {
    AppError::new(
        StatusCode::CONFLICT,
        "employee_exists",
        "Employee already exists",
        false,
    )
}

/// List all employees
///
/// Reads every department, so the cost grows with the whole collection.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn list_employees(
    Extension(employee_repository): Extension<Arc<EmployeeRepository>>,
) -> Result<Json<Vec<EmployeeResponse>>, AppError> {
    let employees = employee_repository.list_all().await?;

    Ok(Json(
        employees.into_iter().map(EmployeeResponse::from).collect(),
    ))
}

/// List the employees of a department
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn list_by_department(
    Extension(employee_repository): Extension<Arc<EmployeeRepository>>,
    Path(path): Path<DepartmentPath>,
) -> Result<Json<Vec<EmployeeResponse>>, AppError> {
    let employees = employee_repository
        .list_by_department(&path.department)
        .await?;

    Ok(Json(
        employees.into_iter().map(EmployeeResponse::from).collect(),
    ))
}

/// Get an employee
///
/// # Errors
///
/// - `404 NOT_FOUND` - No employee with this ID in the department
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn get_employee(
    Extension(employee_repository): Extension<Arc<EmployeeRepository>>,
    Path(path): Path<EmployeePath>,
) -> Result<Json<EmployeeResponse>, AppError> {
    let employee = employee_repository
        .get_by_id(&path.id, &path.department)
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(employee.into()))
}

/// Get an employee by business code
///
/// # Errors
///
/// - `404 NOT_FOUND` - No employee holds this code
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn get_by_employee_id(
    Extension(employee_repository): Extension<Arc<EmployeeRepository>>,
    Path(path): Path<EmployeeCodePath>,
) -> Result<Json<EmployeeResponse>, AppError> {
    let employee = employee_repository
        .get_by_employee_id(&path.employee_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(Json(employee.into()))
}

/// Create a new employee
///
/// The employee code is checked for uniqueness with a read before the write. Two
/// concurrent creates with the same code can both pass the check.
///
/// # Returns
///
/// Returns `201 CREATED` with the stored employee and a `Location` header on success
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid request body
/// - `409 CONFLICT` - Employee code is already taken
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn create_employee(
    Extension(employee_repository): Extension<Arc<EmployeeRepository>>,
    ValidatedJson(payload): ValidatedJson<CreateEmployeeRequest>,
) -> Result<Created<EmployeeResponse>, AppError> {
    if employee_repository
        .get_by_employee_id(&payload.employee_id)
        .await?
        .is_some()
    {
        tracing::info!(employee_id = %payload.employee_id, "Employee code already taken");
        return Err(employee_exists());
    }

    let create_request = EmployeeCreateRequest {
        employee_id: payload.employee_id,
        name: payload.name,
        department: payload.department,
        email: payload.email,
    };

    match employee_repository.create(create_request).await? {
        CreateOutcome::Created(employee) => {
            let location = [
                "api",
                "employees",
                employee.department.as_str(),
                employee.id.as_str(),
            ];
            Ok(Created::at(&location, EmployeeResponse::from(employee.clone())))
        }
        CreateOutcome::Conflict => Err(employee_exists()),
    }
}

/// Update an employee
///
/// Replaces the name, department and email. When the department changes the employee
/// is moved to the new department and is no longer readable under the old one.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Invalid request body
/// - `404 NOT_FOUND` - No employee with this ID in the department
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn update_employee(
    Extension(employee_repository): Extension<Arc<EmployeeRepository>>,
    Path(path): Path<EmployeePath>,
    ValidatedJson(payload): ValidatedJson<UpdateEmployeeRequest>,
) -> Result<Json<EmployeeResponse>, AppError> {
    let mut employee = employee_repository
        .get_by_id(&path.id, &path.department)
        .await?
        .ok_or_else(AppError::not_found)?;

    employee.name = payload.name;
    employee.department = payload.department;
    employee.email = payload.email;

    let employee = employee_repository
        .relocate(&employee, &path.department)
        .await?;

    Ok(Json(employee.into()))
}

/// Delete an employee
///
/// Deleting an employee that does not exist also succeeds.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
/// - `503 SERVICE_UNAVAILABLE` - Store is rate limiting requests
pub async fn delete_employee(
    Extension(employee_repository): Extension<Arc<EmployeeRepository>>,
    Path(path): Path<EmployeePath>,
) -> Result<NoContent, AppError> {
    employee_repository
        .delete(&path.id, &path.department)
        .await?;

    Ok(NoContent)
}

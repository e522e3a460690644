mod docs;
/// Employee routes, partitioned by department
pub mod employees;
mod health;
/// Item routes, partitioned by owner
pub mod items;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};

use crate::types::Environment;

/// Creates the router with all handler routes
#[must_use]
pub fn handler(environment: &Environment) -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler(environment.show_api_docs()))
        .api_route("/health", get(health::handler))
        .api_route("/api/items", post(items::create_item))
        .api_route("/api/items/{userId}", get(items::list_items))
        .api_route(
            "/api/items/{userId}/{id}",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .api_route(
            "/api/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        // Static segments win over `{department}`, so these two shadow departments
        // literally named "department" or "employee"
        .api_route(
            "/api/employees/department/{department}",
            get(employees::list_by_department),
        )
        .api_route(
            "/api/employees/employee/{employeeId}",
            get(employees::get_by_employee_id),
        )
        .api_route(
            "/api/employees/{department}/{id}",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
}

/// Rejects strings made only of whitespace
fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }

    Ok(())
}

//! Employee storage, partitioned by department

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::error::RepositoryResult;
use crate::store::{
    from_document, to_document, Collection, CreateOutcome, Filter, PartitionedStore,
};

/// Employee record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Unique record ID (UUID v4)
    pub id: String,
    /// Business-facing employee code
    pub employee_id: String,
    /// Full name
    pub name: String,
    /// Department (partition attribute)
    pub department: String,
    /// Email address
    pub email: String,
    /// Creation timestamp
    pub created_date: DateTime<Utc>,
    /// Concurrency token assigned by the store on every write
    #[serde(rename = "_etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Request to create a new employee
#[derive(Debug, Clone)]
pub struct EmployeeCreateRequest {
    /// Business-facing employee code
    pub employee_id: String,
    /// Full name
    pub name: String,
    /// Department
    pub department: String,
    /// Email address
    pub email: String,
}

/// Attribute names of employee records
#[derive(Debug, Clone, Copy, Display, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum EmployeeAttribute {
    /// Record ID
    Id,
    /// Business-facing employee code
    EmployeeId,
    /// Full name
    Name,
    /// Department (partition attribute)
    Department,
    /// Email address
    Email,
    /// Creation timestamp
    CreatedDate,
    /// Concurrency token
    #[strum(serialize = "_etag")]
    ETag,
}

/// Repository for employees
pub struct EmployeeRepository {
    store: Arc<dyn PartitionedStore>,
    collection: Collection,
}

impl EmployeeRepository {
    /// Creates a new repository
    ///
    /// # Arguments
    ///
    /// * `store` - Shared store client
    /// * `table_name` - Name of the employees collection
    #[must_use]
    pub fn new(store: Arc<dyn PartitionedStore>, table_name: String) -> Self {
        Self {
            store,
            collection: Collection::new(table_name, EmployeeAttribute::Department.into())
                .with_concurrency_token(),
        }
    }

    /// Collection the repository reads and writes
    #[must_use]
    pub const fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Creates a new employee with a generated record ID and creation timestamp
    ///
    /// Uniqueness of the employee code is not checked here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip_all, fields(employee_id = %request.employee_id, department = %request.department))]
    pub async fn create(
        &self,
        request: EmployeeCreateRequest,
    ) -> RepositoryResult<CreateOutcome<Employee>> {
        let employee = Employee {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: request.employee_id,
            name: request.name,
            department: request.department,
            email: request.email,
            created_date: Utc::now(),
            etag: None,
        };

        let outcome = self
            .store
            .create_record(
                &self.collection,
                to_document(&employee)?,
                &employee.department,
            )
            .await?;

        match outcome {
            CreateOutcome::Created(document) => {
                let employee: Employee = from_document(document)?;
                tracing::info!(id = %employee.id, "Employee created");
                Ok(CreateOutcome::Created(employee))
            }
            CreateOutcome::Conflict => {
                tracing::warn!(id = %employee.id, "Employee record ID already taken in partition");
                Ok(CreateOutcome::Conflict)
            }
        }
    }

    /// Gets a single employee by record ID within a department
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str, department: &str) -> RepositoryResult<Option<Employee>> {
        let document = self
            .store
            .read_record(&self.collection, id, department)
            .await?;

        Ok(document.map(from_document::<Employee>).transpose()?)
    }

    /// Finds the employee holding a business-facing employee code
    ///
    /// This scans departments until a match turns up, so its cost grows with the whole
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn get_by_employee_id(&self, employee_id: &str) -> RepositoryResult<Option<Employee>> {
        let filter = Filter::equals(EmployeeAttribute::EmployeeId.into(), employee_id);
        let document = self
            .store
            .query_first(&self.collection, &filter, None)
            .await?;

        Ok(document.map(from_document::<Employee>).transpose()?)
    }

    /// Lists the employees of one department
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn list_by_department(&self, department: &str) -> RepositoryResult<Vec<Employee>> {
        let documents = self
            .store
            .query_records(&self.collection, &Filter::All, Some(department))
            .await?;

        Ok(documents
            .into_iter()
            .map(from_document)
            .collect::<Result<Vec<Employee>, _>>()?)
    }

    /// Lists every employee across all departments, in no particular order
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> RepositoryResult<Vec<Employee>> {
        let documents = self
            .store
            .query_records(&self.collection, &Filter::All, None)
            .await?;

        Ok(documents
            .into_iter()
            .map(from_document)
            .collect::<Result<Vec<Employee>, _>>()?)
    }

    /// Replaces an employee with the given state within its department
    ///
    /// No fields are merged; the caller supplies the complete record. The concurrency token
    /// is carried along but not checked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip_all, fields(id = %employee.id, department = %employee.department))]
    pub async fn update(&self, employee: &Employee) -> RepositoryResult<Employee> {
        let document = self
            .store
            .upsert_record(
                &self.collection,
                to_document(employee)?,
                &employee.department,
            )
            .await?;

        Ok(from_document(document)?)
    }

    /// Moves an employee into the department set on `employee`
    ///
    /// Writes the record under its new department, then removes the copy left in
    /// `previous_department`. If that removal fails, the new copy is deleted again so the
    /// employee stays in `previous_department` unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if either store operation fails
    #[tracing::instrument(skip_all, fields(id = %employee.id, from = %previous_department, to = %employee.department))]
    pub async fn relocate(
        &self,
        employee: &Employee,
        previous_department: &str,
    ) -> RepositoryResult<Employee> {
        let moved = self.update(employee).await?;

        if previous_department != employee.department {
            if let Err(err) = self.delete(&employee.id, previous_department).await {
                if let Err(rollback_err) = self.delete(&employee.id, &employee.department).await {
                    tracing::error!(
                        error = %rollback_err,
                        "Employee left in both departments after failed move"
                    );
                }
                return Err(err);
            }
            tracing::info!("Employee moved to another department");
        }

        Ok(moved)
    }

    /// Deletes an employee. Deleting a missing employee succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store operation fails
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str, department: &str) -> RepositoryResult<()> {
        self.store
            .delete_record(&self.collection, id, department)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(etag: Option<&str>) -> Employee {
        Employee {
            id: "rec-1".to_string(),
            employee_id: "E1".to_string(),
            name: "A".to_string(),
            department: "Eng".to_string(),
            email: "a@x.com".to_string(),
            created_date: Utc::now(),
            etag: etag.map(ToString::to_string),
        }
    }

    #[test]
    fn test_etag_omitted_when_absent() {
        let document = to_document(&employee(None)).unwrap();

        assert!(!document.contains_key("_etag"));
        assert!(document.contains_key("createdDate"));
        assert!(document.contains_key("employeeId"));
    }

    #[test]
    fn test_etag_round_trips() {
        let original = employee(Some("token-1"));
        let document = to_document(&original).unwrap();

        assert!(document.contains_key("_etag"));
        assert_eq!(from_document::<Employee>(document).unwrap(), original);
    }

    #[test]
    fn test_attribute_names() {
        let etag: &'static str = EmployeeAttribute::ETag.into();
        let code: &'static str = EmployeeAttribute::EmployeeId.into();
        assert_eq!(etag, "_etag");
        assert_eq!(code, "employeeId");
    }
}

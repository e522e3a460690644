use std::sync::Arc;

use pretty_assertions::assert_eq;
use records_storage::{
    employee::{Employee, EmployeeCreateRequest, EmployeeRepository},
    error::RepositoryError,
    store::{CreateOutcome, MemoryStore, StoreError},
};

struct TestContext {
    store: Arc<MemoryStore>,
    repository: Arc<EmployeeRepository>,
}

fn setup_test() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let repository = Arc::new(EmployeeRepository::new(
        store.clone(),
        "test-employees".to_string(),
    ));

    TestContext { store, repository }
}

fn create_request(employee_id: &str, department: &str) -> EmployeeCreateRequest {
    EmployeeCreateRequest {
        employee_id: employee_id.to_string(),
        name: format!("Employee {employee_id}"),
        department: department.to_string(),
        email: format!("{}@example.com", employee_id.to_lowercase()),
    }
}

async fn create_employee(
    repository: &EmployeeRepository,
    employee_id: &str,
    department: &str,
) -> Employee {
    match repository
        .create(create_request(employee_id, department))
        .await
        .expect("Failed to create employee")
    {
        CreateOutcome::Created(employee) => employee,
        CreateOutcome::Conflict => panic!("Unexpected conflict"),
    }
}

#[tokio::test]
async fn test_create_returns_concurrency_token() {
    let ctx = setup_test();
    let employee = create_employee(&ctx.repository, "E1", "Eng").await;

    assert!(!employee.id.is_empty());
    assert!(employee.etag.is_some());

    let stored = ctx
        .repository
        .get_by_id(&employee.id, "Eng")
        .await
        .expect("Failed to get employee");
    assert_eq!(stored, Some(employee));
}

#[tokio::test]
async fn test_get_by_id_with_other_department_is_not_found() {
    let ctx = setup_test();
    let employee = create_employee(&ctx.repository, "E1", "Eng").await;

    let found = ctx
        .repository
        .get_by_id(&employee.id, "Sales")
        .await
        .expect("Failed to get employee");
    assert_eq!(found, None);
}

#[tokio::test]
async fn test_get_by_employee_id_searches_all_departments() {
    let ctx = setup_test();
    create_employee(&ctx.repository, "E1", "Eng").await;
    let sales = create_employee(&ctx.repository, "E2", "Sales").await;

    let found = ctx
        .repository
        .get_by_employee_id("E2")
        .await
        .expect("Failed to look up employee");
    assert_eq!(found, Some(sales));

    let missing = ctx
        .repository
        .get_by_employee_id("E404")
        .await
        .expect("Failed to look up employee");
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_list_by_department_and_list_all() {
    let ctx = setup_test();
    create_employee(&ctx.repository, "E1", "Eng").await;
    create_employee(&ctx.repository, "E2", "Eng").await;
    create_employee(&ctx.repository, "E3", "Sales").await;

    let eng = ctx
        .repository
        .list_by_department("Eng")
        .await
        .expect("Failed to list department");
    assert_eq!(eng.len(), 2);
    assert!(eng.iter().all(|e| e.department == "Eng"));

    let all = ctx
        .repository
        .list_all()
        .await
        .expect("Failed to list employees");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_update_issues_new_concurrency_token() {
    let ctx = setup_test();
    let employee = create_employee(&ctx.repository, "E1", "Eng").await;

    let changed = Employee {
        name: "Renamed".to_string(),
        ..employee.clone()
    };
    let updated = ctx
        .repository
        .update(&changed)
        .await
        .expect("Failed to update employee");

    assert_eq!(updated.name, "Renamed");
    assert!(updated.etag.is_some());
    assert_ne!(updated.etag, employee.etag);
}

#[tokio::test]
async fn test_relocate_leaves_no_copy_behind() {
    let ctx = setup_test();
    let employee = create_employee(&ctx.repository, "E1", "Eng").await;

    let moved = Employee {
        department: "Sales".to_string(),
        ..employee.clone()
    };
    ctx.repository
        .relocate(&moved, "Eng")
        .await
        .expect("Failed to relocate employee");

    assert_eq!(
        ctx.repository
            .get_by_id(&employee.id, "Eng")
            .await
            .expect("Failed to get employee"),
        None
    );
    let relocated = ctx
        .repository
        .get_by_id(&employee.id, "Sales")
        .await
        .expect("Failed to get employee")
        .expect("Employee should exist in new department");
    assert_eq!(relocated.employee_id, "E1");
    assert_eq!(ctx.store.len().await, 1);
}

#[tokio::test]
async fn test_failed_relocate_keeps_employee_in_previous_department() {
    let ctx = setup_test();
    let employee = create_employee(&ctx.repository, "E1", "Eng").await;

    let moved = Employee {
        name: "Renamed".to_string(),
        department: "Sales".to_string(),
        ..employee.clone()
    };

    // The write under "Sales" succeeds, removing the "Eng" copy fails
    ctx.store
        .fail_after(1, StoreError::Backend("connection reset".to_string()))
        .await;
    let result = ctx.repository.relocate(&moved, "Eng").await;
    assert!(matches!(result, Err(RepositoryError::Fatal(_))));

    let kept = ctx
        .repository
        .get_by_id(&employee.id, "Eng")
        .await
        .expect("Failed to get employee")
        .expect("Employee should remain in previous department");
    assert_eq!(kept.name, employee.name);
    assert_eq!(
        ctx.repository
            .get_by_id(&employee.id, "Sales")
            .await
            .expect("Failed to get employee"),
        None
    );
    assert_eq!(ctx.store.len().await, 1);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let ctx = setup_test();
    let employee = create_employee(&ctx.repository, "E1", "Eng").await;

    for _ in 0..2 {
        ctx.repository
            .delete(&employee.id, "Eng")
            .await
            .expect("Delete failed");
    }

    assert!(ctx.store.is_empty().await);
}

/// The code check is a read followed by an independent write, so two concurrent creates
/// with the same code may both pass it. Both writes must still leave consistent records.
#[tokio::test]
async fn test_concurrent_creates_with_same_code_stay_consistent() {
    let ctx = setup_test();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let repository = ctx.repository.clone();
            tokio::spawn(async move {
                if repository.get_by_employee_id("E1").await?.is_some() {
                    return Ok(None);
                }
                repository
                    .create(create_request("E1", "Eng"))
                    .await
                    .map(Some)
            })
        })
        .collect();

    let mut created = 0;
    for task in futures::future::join_all(tasks).await {
        let outcome = task.expect("Task panicked").expect("Repository failed");
        if matches!(outcome, Some(CreateOutcome::Created(_))) {
            created += 1;
        }
    }

    assert!(created >= 1);
    let all = ctx
        .repository
        .list_all()
        .await
        .expect("Failed to list employees");
    assert_eq!(all.len(), created);
    assert!(all.iter().all(|e| e.employee_id == "E1" && e.etag.is_some()));
}

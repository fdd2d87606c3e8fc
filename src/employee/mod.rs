//! Employee records: the concrete entity served by the HTTP API.

use std::sync::Arc;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{Actor, CancelSignal, EntityData, Managed, Result, ServiceError};
use crate::service::{CreateRequest, LifecycleService, UpdateRequest};
use crate::store::{EntityStore, InMemoryEntityStore, UniqueKey};
use crate::validation::{RuleSet, Validate, ValidationOutcome};

pub const MAX_SALARY: f64 = 9_999_999.99;

lazy_static! {
    static ref NAME_PATTERN: Regex = Regex::new(r"^[a-zA-Z\s'-]+$").expect("valid name pattern");
    static ref PHONE_PATTERN: Regex = Regex::new(r"^[\d\s\-+()]+$").expect("valid phone pattern");
    static ref EMPLOYEE_RULES: RuleSet<EmployeeRequest> = employee_rules();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub department: String,
    pub position: String,
    pub salary: f64,
    pub hire_date: NaiveDate,
    pub is_active: bool,
}

impl EntityData for Employee {
    const KIND: &'static str = "Employee";
}

/// Body of both `POST` and `PUT`. Absent fields deserialize to empty values so
/// that the rule set reports all of them at once.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub salary: f64,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

fn employee_rules() -> RuleSet<EmployeeRequest> {
    RuleSet::<EmployeeRequest>::new()
        .text("firstName", |r| &r.first_name, |f| {
            f.not_empty("First name is required")
                .max_len(100, "First name must not exceed 100 characters")
                .matches(&NAME_PATTERN, "First name contains invalid characters")
        })
        .text("lastName", |r| &r.last_name, |f| {
            f.not_empty("Last name is required")
                .max_len(100, "Last name must not exceed 100 characters")
                .matches(&NAME_PATTERN, "Last name contains invalid characters")
        })
        .text("email", |r| &r.email, |f| {
            f.not_empty("Email is required")
                .email("Invalid email format")
                .max_len(255, "Email must not exceed 255 characters")
        })
        .optional_text("phoneNumber", |r| r.phone_number.as_deref().unwrap_or(""), |f| {
            f.matches(&PHONE_PATTERN, "Invalid phone number format")
        })
        .text("department", |r| &r.department, |f| {
            f.not_empty("Department is required")
                .max_len(100, "Department must not exceed 100 characters")
        })
        .text("position", |r| &r.position, |f| {
            f.not_empty("Position is required")
                .max_len(100, "Position must not exceed 100 characters")
        })
        .number("salary", |r| r.salary, |f| {
            f.greater_than(0.0, "Salary must be greater than 0")
                .at_most(MAX_SALARY, "Salary exceeds maximum allowed value")
        })
        .date("hireDate", |r| r.hire_date, |f| {
            f.required("Hire date is required")
                .not_in_future("Hire date cannot be in the future")
        })
}

impl Validate for EmployeeRequest {
    fn validate(&self) -> ValidationOutcome {
        EMPLOYEE_RULES.evaluate(self)
    }
}

impl From<EmployeeRequest> for Employee {
    fn from(request: EmployeeRequest) -> Self {
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();

        Self {
            full_name: format!("{first_name} {last_name}"),
            first_name,
            last_name,
            email: request.email.trim().to_string(),
            phone_number: request
                .phone_number
                .map(|phone| phone.trim().to_string())
                .filter(|phone| !phone.is_empty()),
            department: request.department.trim().to_string(),
            position: request.position.trim().to_string(),
            salary: request.salary,
            // Validation rejects a missing hire date before mapping.
            hire_date: request.hire_date.unwrap_or(NaiveDate::MIN),
            is_active: request.is_active,
        }
    }
}

impl CreateRequest<Employee> for EmployeeRequest {
    fn into_entity(self) -> Employee {
        Employee::from(self)
    }
}

impl UpdateRequest<Employee> for EmployeeRequest {
    fn apply_to(self, entity: &mut Employee) {
        *entity = Employee::from(self);
    }
}

/// Email uniqueness, case-insensitive, among live employees.
pub fn email_key() -> UniqueKey<Employee> {
    UniqueKey::new(
        "email",
        |employee: &Employee| normalize_email(&employee.email),
        |employee: &Employee| format!("Employee with email '{}' already exists", employee.email),
    )
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub type EmployeeLifecycle = LifecycleService<Employee, EmployeeRequest, EmployeeRequest>;

/// Employee lifecycle plus the employee-specific lookups.
#[derive(Clone)]
pub struct EmployeeService {
    lifecycle: EmployeeLifecycle,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn EntityStore<Employee>>) -> Self {
        Self {
            lifecycle: LifecycleService::new(store).with_unique_key(email_key()),
        }
    }

    /// Service backed by a fresh in-process store that enforces the email key.
    pub fn in_memory() -> Self {
        let store: Arc<dyn EntityStore<Employee>> =
            Arc::new(InMemoryEntityStore::new().with_unique_key(email_key()));
        Self::new(store)
    }

    pub fn lifecycle(&self) -> &EmployeeLifecycle {
        &self.lifecycle
    }

    pub async fn get_by_email(&self, email: &str, cancel: &CancelSignal) -> Result<Managed<Employee>> {
        let wanted = normalize_email(email);
        let matches = |row: &Managed<Employee>| normalize_email(&row.data.email) == wanted;

        self.lifecycle
            .store()
            .find_where(&matches, cancel)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found_by(Employee::KIND, "email", email))
    }

    /// Live employees of a department ordered by last name, then first name.
    pub async fn get_by_department(
        &self,
        department: &str,
        cancel: &CancelSignal,
    ) -> Result<Vec<Managed<Employee>>> {
        let matches = |row: &Managed<Employee>| row.data.department == department;

        let mut employees = self.lifecycle.store().find_where(&matches, cancel).await?;
        employees.sort_by(|left, right| {
            left.data
                .last_name
                .cmp(&right.data.last_name)
                .then_with(|| left.data.first_name.cmp(&right.data.first_name))
        });
        Ok(employees)
    }

    /// Inserts a handful of sample employees through the regular lifecycle.
    pub async fn seed_demo(&self, cancel: &CancelSignal) -> Result<usize> {
        let actor = Actor::system();
        let samples = [
            ("Ada", "Lovelace", "Engineering", "Principal Engineer", 185_000.0, (2019, 3, 4)),
            ("Grace", "Hopper", "Engineering", "Staff Engineer", 172_500.0, (2020, 9, 14)),
            ("Alan", "Turing", "Research", "Research Scientist", 164_000.0, (2021, 1, 11)),
            ("Katherine", "Johnson", "Research", "Analyst", 121_000.0, (2022, 6, 1)),
        ];

        let mut inserted = 0;
        for (first, last, department, position, salary, (year, month, day)) in samples {
            let request = EmployeeRequest {
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: format!("{}.{}@example.com", first, last).to_lowercase(),
                phone_number: None,
                department: department.to_string(),
                position: position.to_string(),
                salary,
                hire_date: NaiveDate::from_ymd_opt(year, month, day),
                is_active: true,
            };

            match self.lifecycle.create(request, &actor, cancel).await {
                Ok(_) => inserted += 1,
                Err(ServiceError::BusinessRuleViolation(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(inserted)
    }
}

use chrono::{NaiveDate, Utc};
use regex::Regex;

use super::ValidationOutcome;

type Check<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

struct FieldRules<T> {
    field: &'static str,
    checks: Vec<Check<T>>,
}

/// Ordered per-field rules for a payload type.
///
/// Every field is evaluated, and within a field every rule runs in
/// declaration order; each failing rule contributes its message.
pub struct RuleSet<T> {
    fields: Vec<FieldRules<T>>,
}

impl<T: 'static> Default for RuleSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> RuleSet<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares rules for a required text field.
    pub fn text(
        self,
        field: &'static str,
        accessor: fn(&T) -> &str,
        build: impl FnOnce(TextRules<T>) -> TextRules<T>,
    ) -> Self {
        let rules = build(TextRules::new(accessor, false));
        self.push(field, rules.checks)
    }

    /// Declares rules that apply only when the text value is non-empty.
    pub fn optional_text(
        self,
        field: &'static str,
        accessor: fn(&T) -> &str,
        build: impl FnOnce(TextRules<T>) -> TextRules<T>,
    ) -> Self {
        let rules = build(TextRules::new(accessor, true));
        self.push(field, rules.checks)
    }

    pub fn number(
        self,
        field: &'static str,
        accessor: fn(&T) -> f64,
        build: impl FnOnce(NumberRules<T>) -> NumberRules<T>,
    ) -> Self {
        let rules = build(NumberRules {
            accessor,
            checks: Vec::new(),
        });
        self.push(field, rules.checks)
    }

    pub fn date(
        self,
        field: &'static str,
        accessor: fn(&T) -> Option<NaiveDate>,
        build: impl FnOnce(DateRules<T>) -> DateRules<T>,
    ) -> Self {
        let rules = build(DateRules {
            accessor,
            checks: Vec::new(),
        });
        self.push(field, rules.checks)
    }

    pub fn evaluate(&self, target: &T) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new();
        for field in &self.fields {
            for check in &field.checks {
                if let Some(message) = check(target) {
                    outcome.add(field.field, message);
                }
            }
        }
        outcome
    }

    fn push(mut self, field: &'static str, checks: Vec<Check<T>>) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|rules| rules.field == field) {
            existing.checks.extend(checks);
        } else {
            self.fields.push(FieldRules { field, checks });
        }
        self
    }
}

/// Rules over a text value. Every rule runs, so an empty required value
/// reports both its `not_empty` and its format message.
pub struct TextRules<T> {
    accessor: fn(&T) -> &str,
    optional: bool,
    checks: Vec<Check<T>>,
}

impl<T: 'static> TextRules<T> {
    fn new(accessor: fn(&T) -> &str, optional: bool) -> Self {
        Self {
            accessor,
            optional,
            checks: Vec::new(),
        }
    }

    pub fn not_empty(self, message: &str) -> Self {
        self.check(message, |value| !value.trim().is_empty())
    }

    pub fn max_len(self, max: usize, message: &str) -> Self {
        self.check(message, move |value| value.chars().count() <= max)
    }

    pub fn matches(self, pattern: &'static Regex, message: &str) -> Self {
        self.check(message, move |value| pattern.is_match(value))
    }

    pub fn email(self, message: &str) -> Self {
        self.check(message, is_valid_email)
    }

    fn check(mut self, message: &str, passes: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        let accessor = self.accessor;
        let optional = self.optional;
        let message = message.to_string();
        self.checks.push(Box::new(move |target: &T| {
            let value = accessor(target);
            if optional && value.trim().is_empty() {
                return None;
            }
            (!passes(value)).then(|| message.clone())
        }));
        self
    }
}

pub struct NumberRules<T> {
    accessor: fn(&T) -> f64,
    checks: Vec<Check<T>>,
}

impl<T: 'static> NumberRules<T> {
    pub fn greater_than(self, bound: f64, message: &str) -> Self {
        self.check(message, move |value| value > bound)
    }

    pub fn at_most(self, bound: f64, message: &str) -> Self {
        self.check(message, move |value| value <= bound)
    }

    fn check(mut self, message: &str, passes: impl Fn(f64) -> bool + Send + Sync + 'static) -> Self {
        let accessor = self.accessor;
        let message = message.to_string();
        self.checks.push(Box::new(move |target: &T| {
            (!passes(accessor(target))).then(|| message.clone())
        }));
        self
    }
}

pub struct DateRules<T> {
    accessor: fn(&T) -> Option<NaiveDate>,
    checks: Vec<Check<T>>,
}

impl<T: 'static> DateRules<T> {
    pub fn required(mut self, message: &str) -> Self {
        let accessor = self.accessor;
        let message = message.to_string();
        self.checks
            .push(Box::new(move |target: &T| accessor(target).is_none().then(|| message.clone())));
        self
    }

    /// Compared against the current UTC date at evaluation time.
    pub fn not_in_future(mut self, message: &str) -> Self {
        let accessor = self.accessor;
        let message = message.to_string();
        self.checks.push(Box::new(move |target: &T| {
            let date = accessor(target)?;
            (date > Utc::now().date_naive()).then(|| message.clone())
        }));
        self
    }
}

fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.') {
        return false;
    }

    !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lazy_static::lazy_static;

    lazy_static! {
        static ref LETTERS: Regex = Regex::new(r"^[a-zA-Z]+$").unwrap();
    }

    struct Signup {
        name: String,
        email: String,
        nickname: Option<String>,
        age: f64,
        joined: Option<NaiveDate>,
    }

    fn valid() -> Signup {
        Signup {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            nickname: None,
            age: 36.0,
            joined: Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
        }
    }

    fn rules() -> RuleSet<Signup> {
        RuleSet::<Signup>::new()
            .text("name", |s| &s.name, |f| {
                f.not_empty("Name is required")
                    .max_len(5, "Name is too long")
                    .matches(&LETTERS, "Name contains invalid characters")
            })
            .text("email", |s| &s.email, |f| {
                f.not_empty("Email is required").email("Invalid email format")
            })
            .optional_text("nickname", |s| s.nickname.as_deref().unwrap_or(""), |f| {
                f.matches(&LETTERS, "Nickname contains invalid characters")
            })
            .number("age", |s| s.age, |f| {
                f.greater_than(0.0, "Age must be positive").at_most(150.0, "Age is too large")
            })
            .date("joined", |s| s.joined, |f| {
                f.required("Join date is required")
                    .not_in_future("Join date cannot be in the future")
            })
    }

    #[test]
    fn valid_payload_produces_empty_outcome() {
        assert!(rules().evaluate(&valid()).is_valid());
    }

    #[test]
    fn collects_failures_across_every_field() {
        let payload = Signup {
            name: String::new(),
            email: "nope".to_string(),
            nickname: Some("x1".to_string()),
            age: -1.0,
            joined: None,
        };

        let outcome = rules().evaluate(&payload);
        assert_eq!(
            outcome.field("name"),
            Some(
                &[
                    "Name is required".to_string(),
                    "Name contains invalid characters".to_string()
                ][..]
            )
        );
        assert_eq!(outcome.field("email"), Some(&["Invalid email format".to_string()][..]));
        assert_eq!(
            outcome.field("nickname"),
            Some(&["Nickname contains invalid characters".to_string()][..])
        );
        assert_eq!(outcome.field("age"), Some(&["Age must be positive".to_string()][..]));
        assert_eq!(outcome.field("joined"), Some(&["Join date is required".to_string()][..]));
    }

    #[test]
    fn multiple_rules_on_one_field_report_in_declaration_order() {
        let mut payload = valid();
        payload.name = "Ad4mski".to_string();

        let outcome = rules().evaluate(&payload);
        assert_eq!(
            outcome.field("name"),
            Some(
                &[
                    "Name is too long".to_string(),
                    "Name contains invalid characters".to_string()
                ][..]
            )
        );
    }

    #[test]
    fn empty_required_email_reports_presence_and_format() {
        let mut payload = valid();
        payload.email = String::new();

        assert_eq!(
            rules().evaluate(&payload).field("email"),
            Some(&["Email is required".to_string(), "Invalid email format".to_string()][..])
        );
    }

    #[test]
    fn optional_rules_skip_blank_values() {
        let mut payload = valid();
        payload.nickname = Some("  ".to_string());
        assert!(rules().evaluate(&payload).field("nickname").is_none());
    }

    #[test]
    fn future_dates_are_rejected() {
        let mut payload = valid();
        payload.joined = Some(Utc::now().date_naive() + Duration::days(2));
        assert_eq!(
            rules().evaluate(&payload).field("joined"),
            Some(&["Join date cannot be in the future".to_string()][..])
        );
    }

    #[test]
    fn email_shape_checks() {
        assert!(is_valid_email("a.b@example.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@@example.com"));
    }
}

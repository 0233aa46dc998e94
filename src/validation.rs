// ✅ Validation Rules - ordered business rules per record kind
//
// Rules run in declaration order. The first failure is what the user sees,
// so order is part of the contract.

use std::fmt;

use crate::error::ValidationError;

// ============================================================================
// FIELD CHECKS
// ============================================================================

/// Outcome of checking one optional field.
///
/// `Absent` and `Invalid` are kept apart: absence is never a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    Absent,
    Valid,
    Invalid,
}

impl FieldCheck {
    pub fn of<T>(value: Option<T>, ok: impl FnOnce(T) -> bool) -> Self {
        match value {
            None => FieldCheck::Absent,
            Some(v) => {
                if ok(v) {
                    FieldCheck::Valid
                } else {
                    FieldCheck::Invalid
                }
            }
        }
    }

    pub fn passes(self) -> bool {
        !matches!(self, FieldCheck::Invalid)
    }
}

/// Non-empty once surrounding whitespace is removed.
pub fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

// ============================================================================
// RULE
// ============================================================================

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

/// A named predicate over a record plus the message shown when it fails.
pub struct Rule<R> {
    pub name: &'static str,
    pub field: &'static str,
    pub message: String,
    check: Predicate<R>,
}

impl<R: 'static> Rule<R> {
    pub fn new(
        name: &'static str,
        field: &'static str,
        message: impl Into<String>,
        check: impl Fn(&R) -> bool + Send + Sync + 'static,
    ) -> Self {
        Rule {
            name,
            field,
            message: message.into(),
            check: Box::new(check),
        }
    }

    /// Text field must be non-empty after trimming.
    pub fn required_text(
        field: &'static str,
        message: impl Into<String>,
        get: fn(&R) -> &str,
    ) -> Self {
        Rule::new("required_text", field, message, move |r| has_text(get(r)))
    }

    /// Optional reference must be set (e.g. the route a trip runs on).
    pub fn required<T>(
        field: &'static str,
        message: impl Into<String>,
        get: fn(&R) -> Option<T>,
    ) -> Self
    where
        T: 'static,
    {
        Rule::new("required", field, message, move |r| get(r).is_some())
    }

    /// Optional number must not be below zero when present.
    pub fn non_negative<T>(
        field: &'static str,
        message: impl Into<String>,
        get: fn(&R) -> Option<T>,
    ) -> Self
    where
        T: PartialOrd + Default + 'static,
    {
        Rule::new("non_negative", field, message, move |r| {
            FieldCheck::of(get(r), |v| v >= T::default()).passes()
        })
    }

    /// Optional percentage must lie in [0, 100] when present.
    pub fn percentage(
        field: &'static str,
        message: impl Into<String>,
        get: fn(&R) -> Option<f64>,
    ) -> Self {
        Rule::new("percentage", field, message, move |r| {
            FieldCheck::of(get(r), |v| (0.0..=100.0).contains(&v)).passes()
        })
    }

}

impl<R> Rule<R> {
    pub fn holds(&self, record: &R) -> bool {
        (self.check)(record)
    }
}

impl<R> fmt::Debug for Rule<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Stop at the first violated rule
    #[default]
    FirstFailure,
    /// Report every violated rule, in rule order
    CollectAll,
}

/// Ordered rule list for one record kind.
#[derive(Debug)]
pub struct Validator<R> {
    kind: &'static str,
    rules: Vec<Rule<R>>,
}

impl<R> Validator<R> {
    pub fn new(kind: &'static str) -> Self {
        Validator {
            kind,
            rules: Vec::new(),
        }
    }

    /// Builder: append a rule (evaluated after those already added)
    pub fn rule(mut self, rule: Rule<R>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Short-circuit check: the first violated rule wins.
    pub fn check(&self, record: &R) -> Result<(), ValidationError> {
        match self.rules.iter().find(|rule| !rule.holds(record)) {
            Some(rule) => Err(self.error_for(rule)),
            None => Ok(()),
        }
    }

    /// Every violated rule, in rule order.
    pub fn check_all(&self, record: &R) -> Vec<ValidationError> {
        self.rules
            .iter()
            .filter(|rule| !rule.holds(record))
            .map(|rule| self.error_for(rule))
            .collect()
    }

    pub fn validate(
        &self,
        record: &R,
        policy: ValidationPolicy,
    ) -> Result<(), Vec<ValidationError>> {
        let errors = match policy {
            ValidationPolicy::FirstFailure => self.check(record).err().into_iter().collect(),
            ValidationPolicy::CollectAll => self.check_all(record),
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn error_for(&self, rule: &Rule<R>) -> ValidationError {
        ValidationError {
            kind: self.kind,
            rule: rule.name,
            field: rule.field,
            message: rule.message.clone(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

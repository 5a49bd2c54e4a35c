//! Declarative request validation.
//!
//! Each route describes its input as a static [`Schema`]: where the values
//! come from (`body`, `query` or `params`) and one [`Rule`] per recognized
//! field. [`Schema::validate`] walks the whole schema, collects one
//! [`FieldError`] per violating path, and on success hands back an immutable
//! [`Validated`] map of coerced values. The typed request values used by the
//! handlers ([`NewTicket`], [`TicketPatch`], [`ListQuery`], [`Credentials`])
//! are built only from that map, never from the raw input.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use validator::ValidateUrl;

use crate::entity::ticket::{Priority, WorkType};
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 200;

/// One violation, addressed by a dotted path such as `body.pictures.1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Trimmed, non-empty string. `nullable` fields accept `null` or `""` as
    /// an explicit request to clear the stored value.
    Text { required: bool, nullable: bool },
    /// Required, non-empty string kept exactly as sent. Whitespace counts.
    Secret,
    /// Case-insensitive match against canonical uppercase names.
    Choice(&'static [&'static str]),
    Flag,
    /// Array of absolute URLs.
    Urls,
    /// Non-negative integer, as a digit string or a JSON number.
    Count,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub rule: Rule,
}

impl Field {
    const fn new(name: &'static str, rule: Rule) -> Self {
        Self { name, rule }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub location: &'static str,
    pub fields: &'static [Field],
    /// Reject input that carries none of the recognized fields.
    pub require_any: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Text(String),
    Cleared,
    Choice(&'static str),
    Flag(bool),
    Urls(Vec<String>),
    Count(u64),
}

/// Coerced values keyed by field name. Absent keys were not supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    values: BTreeMap<&'static str, Coerced>,
}

impl Validated {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.values.get(name) {
            Some(Coerced::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// `None` when omitted, `Some(None)` when explicitly cleared.
    pub fn nullable_text(&self, name: &str) -> Option<Option<String>> {
        match self.values.get(name) {
            Some(Coerced::Text(value)) => Some(Some(value.clone())),
            Some(Coerced::Cleared) => Some(None),
            _ => None,
        }
    }

    pub fn choice(&self, name: &str) -> Option<&'static str> {
        match self.values.get(name) {
            Some(Coerced::Choice(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(Coerced::Flag(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn urls(&self, name: &str) -> Option<Vec<String>> {
        match self.values.get(name) {
            Some(Coerced::Urls(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn count(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(Coerced::Count(value)) => Some(*value),
            _ => None,
        }
    }
}

impl Schema {
    pub fn validate(&self, input: &Map<String, Value>) -> Result<Validated, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut validated = Validated::default();

        for field in self.fields {
            let path = format!("{}.{}", self.location, field.name);
            match coerce(field.rule, input.get(field.name), &path) {
                Ok(Some(value)) => {
                    validated.values.insert(field.name, value);
                }
                Ok(None) => {}
                Err(mut field_errors) => errors.append(&mut field_errors),
            }
        }

        if errors.is_empty() && self.require_any && validated.is_empty() {
            errors.push(FieldError::new(
                self.location,
                "At least one field must be provided",
            ));
        }

        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(errors)
        }
    }

    /// Validates an arbitrary JSON value, which must be an object.
    pub fn validate_value(&self, input: &Value) -> AppResult<Validated> {
        match input {
            Value::Object(map) => self.validate(map).map_err(AppError::Validation),
            _ => Err(AppError::invalid(self.location, "Expected object")),
        }
    }
}

fn coerce(rule: Rule, raw: Option<&Value>, path: &str) -> Result<Option<Coerced>, Vec<FieldError>> {
    let single = |message: String| vec![FieldError::new(path, message)];

    match rule {
        Rule::Text { required, nullable } => {
            let text = match raw {
                None => None,
                Some(Value::Null) if nullable => return Ok(Some(Coerced::Cleared)),
                Some(Value::Null) if required => None,
                Some(Value::String(s)) => Some(s.trim()),
                Some(_) => return Err(single("Expected string".into())),
            };
            match text {
                Some(s) if !s.is_empty() => Ok(Some(Coerced::Text(s.to_string()))),
                Some(_) if nullable => Ok(Some(Coerced::Cleared)),
                Some(_) if required => Err(single("Required".into())),
                Some(_) => Err(single("Must not be empty".into())),
                None if required => Err(single("Required".into())),
                None => Ok(None),
            }
        }
        Rule::Secret => match raw {
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(Coerced::Text(s.clone()))),
            None | Some(Value::Null) | Some(Value::String(_)) => Err(single("Required".into())),
            Some(_) => Err(single("Expected string".into())),
        },
        Rule::Choice(allowed) => match raw {
            None => Ok(None),
            Some(Value::String(s)) => normalize_choice(s, allowed)
                .map(|canonical| Some(Coerced::Choice(canonical)))
                .ok_or_else(|| {
                    single(format!(
                        "Invalid enum value. Expected {}",
                        allowed.join(" | ")
                    ))
                }),
            Some(_) => Err(single("Expected string".into())),
        },
        Rule::Flag => match raw {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(Coerced::Flag(*b))),
            Some(_) => Err(single("Expected boolean".into())),
        },
        Rule::Urls => match raw {
            None => Ok(None),
            Some(Value::Array(items)) => {
                let mut urls = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    match item.as_str().map(str::trim) {
                        Some(url) if is_url(url) => urls.push(url.to_string()),
                        _ => errors.push(FieldError::new(format!("{path}.{index}"), "Invalid url")),
                    }
                }
                if errors.is_empty() {
                    Ok(Some(Coerced::Urls(urls)))
                } else {
                    Err(errors)
                }
            }
            Some(_) => Err(single("Expected array".into())),
        },
        Rule::Count => match raw {
            None => Ok(None),
            Some(value) => parse_count(value)
                .map(|n| Some(Coerced::Count(n)))
                .map_err(|message| single(message.into())),
        },
    }
}

/// Case-insensitive lookup of `raw` among uppercase `allowed` names.
pub fn normalize_choice(raw: &str, allowed: &'static [&'static str]) -> Option<&'static str> {
    let raw = raw.trim();
    allowed
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(raw))
}

pub fn parse_count(value: &Value) -> Result<u64, &'static str> {
    const MESSAGE: &str = "Expected a non-negative integer";
    match value {
        Value::Number(n) => n.as_u64().ok_or(MESSAGE),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(MESSAGE);
            }
            s.parse().map_err(|_| MESSAGE)
        }
        _ => Err(MESSAGE),
    }
}

pub fn clamp_page_size(requested: u64) -> u64 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

/// Absolute URL check, e.g. `https://host/a.png`.
pub fn is_url(raw: &str) -> bool {
    raw.validate_url()
}

const fn ticket_fields(required: bool) -> [Field; 12] {
    let optional = Rule::Text {
        required: false,
        nullable: false,
    };
    let nullable = Rule::Text {
        required: false,
        nullable: true,
    };
    [
        Field::new("accountName", Rule::Text { required, nullable: false }),
        Field::new("city", Rule::Text { required, nullable: false }),
        Field::new("contactPerson", nullable),
        Field::new("contactInfo", nullable),
        Field::new("priority", Rule::Choice(Priority::NAMES)),
        Field::new("workType", Rule::Choice(WorkType::NAMES)),
        Field::new("lease", Rule::Flag),
        Field::new("underWarranty", Rule::Flag),
        Field::new("machineModelOrType", nullable),
        Field::new("issueDescription", nullable),
        Field::new("requestingTechName", optional),
        Field::new("pictures", Rule::Urls),
    ]
}

static CREATE_TICKET_FIELDS: [Field; 12] = ticket_fields(true);
static UPDATE_TICKET_FIELDS: [Field; 12] = ticket_fields(false);

pub static CREATE_TICKET: Schema = Schema {
    location: "body",
    fields: &CREATE_TICKET_FIELDS,
    require_any: false,
};

pub static UPDATE_TICKET: Schema = Schema {
    location: "body",
    fields: &UPDATE_TICKET_FIELDS,
    require_any: true,
};

pub static LIST_TICKETS: Schema = Schema {
    location: "query",
    fields: &[Field::new("page", Rule::Count), Field::new("pageSize", Rule::Count)],
    require_any: false,
};

pub static TICKET_PARAMS: Schema = Schema {
    location: "params",
    fields: &[Field::new("id", Rule::Count)],
    require_any: false,
};

pub static LOGIN: Schema = Schema {
    location: "body",
    fields: &[
        Field::new("username", Rule::Text { required: true, nullable: false }),
        Field::new("password", Rule::Secret),
    ],
    require_any: false,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub account_name: String,
    pub city: String,
    pub contact_person: Option<String>,
    pub contact_info: Option<String>,
    pub priority: Priority,
    pub work_type: Option<WorkType>,
    pub lease: bool,
    pub under_warranty: bool,
    pub machine_model_or_type: Option<String>,
    pub issue_description: Option<String>,
    pub requesting_tech_name: Option<String>,
    pub pictures: Vec<String>,
}

impl NewTicket {
    pub fn from_body(body: &Value) -> AppResult<Self> {
        let v = CREATE_TICKET.validate_value(body)?;
        Ok(Self {
            account_name: v.text("accountName").unwrap_or_default(),
            city: v.text("city").unwrap_or_default(),
            contact_person: v.nullable_text("contactPerson").flatten(),
            contact_info: v.nullable_text("contactInfo").flatten(),
            priority: v
                .choice("priority")
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            work_type: v.choice("workType").and_then(|w| w.parse().ok()),
            lease: v.flag("lease").unwrap_or(false),
            under_warranty: v.flag("underWarranty").unwrap_or(false),
            machine_model_or_type: v.nullable_text("machineModelOrType").flatten(),
            issue_description: v.nullable_text("issueDescription").flatten(),
            requesting_tech_name: v.text("requestingTechName"),
            pictures: v.urls("pictures").unwrap_or_default(),
        })
    }
}

/// Partial update. Outer `None` leaves a column untouched; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub account_name: Option<String>,
    pub city: Option<String>,
    pub contact_person: Option<Option<String>>,
    pub contact_info: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub work_type: Option<WorkType>,
    pub lease: Option<bool>,
    pub under_warranty: Option<bool>,
    pub machine_model_or_type: Option<Option<String>>,
    pub issue_description: Option<Option<String>>,
    pub requesting_tech_name: Option<String>,
    pub pictures: Option<Vec<String>>,
}

impl TicketPatch {
    pub fn from_body(body: &Value) -> AppResult<Self> {
        let v = UPDATE_TICKET.validate_value(body)?;
        Ok(Self {
            account_name: v.text("accountName"),
            city: v.text("city"),
            contact_person: v.nullable_text("contactPerson"),
            contact_info: v.nullable_text("contactInfo"),
            priority: v.choice("priority").and_then(|p| p.parse().ok()),
            work_type: v.choice("workType").and_then(|w| w.parse().ok()),
            lease: v.flag("lease"),
            under_warranty: v.flag("underWarranty"),
            machine_model_or_type: v.nullable_text("machineModelOrType"),
            issue_description: v.nullable_text("issueDescription"),
            requesting_tech_name: v.text("requestingTechName"),
            pictures: v.urls("pictures"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub page_size: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn from_query(query: &Map<String, Value>) -> AppResult<Self> {
        let v = LIST_TICKETS.validate(query).map_err(AppError::Validation)?;
        Ok(Self {
            page: v.count("page").unwrap_or(DEFAULT_PAGE).max(1),
            page_size: clamp_page_size(v.count("pageSize").unwrap_or(DEFAULT_PAGE_SIZE)),
        })
    }

    /// Rows to skip, or `None` when the page starts beyond any addressable row.
    pub fn offset(&self) -> Option<u64> {
        self.page
            .saturating_sub(1)
            .checked_mul(self.page_size)
            .filter(|offset| *offset <= i64::MAX as u64)
    }
}

/// Parses the `{id}` path segment. Returns `None` for ids no row can have.
pub fn ticket_id(raw: &str) -> AppResult<Option<i32>> {
    let mut params = Map::new();
    params.insert("id".to_string(), Value::String(raw.to_string()));
    let v = TICKET_PARAMS.validate(&params).map_err(AppError::Validation)?;
    Ok(v.count("id").and_then(|id| i32::try_from(id).ok()))
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl Credentials {
    pub fn from_body(body: &Value) -> AppResult<Self> {
        let v = LOGIN.validate_value(body)?;
        Ok(Self {
            username: v.text("username").unwrap_or_default(),
            password: v.text("password").unwrap_or_default(),
        })
    }
}

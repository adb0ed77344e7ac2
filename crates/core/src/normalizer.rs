//! Turns a raw `process_query` payload into a [`CanonicalRequest`].
//!
//! Accepted permission context shapes:
//!
//! ```json
//! {
//!   "profile": "Sales Rep",
//!   "objectPermissions": { "Account": true, "Lead": { "isAccessible": false } },
//!   "fieldPermissions": {
//!     "Account.Rating": false,
//!     "Opportunity": { "Amount": { "isAccessible": true, "isUpdateable": false } }
//!   }
//! }
//! ```

use serde_json::{Map, Value};

use crate::domain::permission::{FieldPermission, FieldRef, ObjectPermission, PermissionContext};
use crate::domain::request::{CanonicalRequest, UserId};
use crate::errors::QueryError;

pub fn normalize(payload: &Value) -> Result<CanonicalRequest, QueryError> {
    let body = payload
        .as_object()
        .ok_or_else(|| invalid("request body must be a JSON object"))?;

    let query_text = match present(body.get("query_text")) {
        None => return Err(invalid("query_text is required")),
        Some(Value::String(text)) if text.trim().is_empty() => {
            return Err(invalid("query_text must not be empty"))
        }
        Some(Value::String(text)) => text.clone(),
        Some(_) => return Err(invalid("query_text must be a string")),
    };

    let user_id = optional_string(body, "user_id")?;
    let username = optional_string(body, "username")?;

    let permissions = match present(body.get("context")) {
        None => PermissionContext::absent(),
        Some(raw) => parse_context(raw)?,
    };

    Ok(CanonicalRequest { query_text, user_id: UserId(user_id), username, permissions })
}

pub fn parse_context(raw: &Value) -> Result<PermissionContext, QueryError> {
    let context = raw.as_object().ok_or_else(|| malformed("context must be an object"))?;

    let profile = match present(context.get("profile")) {
        None => None,
        Some(Value::String(profile)) => {
            Some(profile.trim().to_string()).filter(|profile| !profile.is_empty())
        }
        Some(_) => return Err(malformed("context.profile must be a string")),
    };

    let mut permissions =
        PermissionContext { supplied: true, profile, ..PermissionContext::default() };

    if let Some(raw_objects) = present(context.get("objectPermissions")) {
        let entries = raw_objects
            .as_object()
            .ok_or_else(|| malformed("context.objectPermissions must be an object"))?;
        for (name, indicator) in entries {
            let name = name.trim();
            if name.is_empty() {
                return Err(malformed("context.objectPermissions has an empty object name"));
            }
            let path = format!("context.objectPermissions.{name}");
            permissions.objects.insert(name.to_string(), parse_object_indicator(&path, indicator)?);
        }
    }

    if let Some(raw_fields) = present(context.get("fieldPermissions")) {
        let entries = raw_fields
            .as_object()
            .ok_or_else(|| malformed("context.fieldPermissions must be an object"))?;
        for (key, value) in entries {
            let path = format!("context.fieldPermissions.{key}");
            if let Some(field_ref) = FieldRef::parse(key) {
                permissions.fields.insert(field_ref, parse_field_indicator(&path, value)?);
                continue;
            }

            let object = key.trim();
            let nested = match value {
                Value::Object(nested) if !object.is_empty() => nested,
                _ => {
                    return Err(malformed(format!(
                        "{path} must be `Object.Field` or an object name mapping field names to permissions"
                    )))
                }
            };
            for (field, indicator) in nested {
                let field = field.trim();
                if field.is_empty() {
                    return Err(malformed(format!("{path} has an empty field name")));
                }
                let field_path = format!("{path}.{field}");
                permissions.fields.insert(
                    FieldRef::new(object, field),
                    parse_field_indicator(&field_path, indicator)?,
                );
            }
        }
    }

    Ok(permissions)
}

fn parse_field_indicator(path: &str, value: &Value) -> Result<FieldPermission, QueryError> {
    match value {
        Value::Bool(readable) => {
            Ok(FieldPermission { readable: Some(*readable), ..FieldPermission::default() })
        }
        Value::Object(flags) => Ok(FieldPermission {
            readable: flag(path, flags, "isAccessible")?,
            updateable: flag(path, flags, "isUpdateable")?,
            createable: flag(path, flags, "isCreateable")?,
        }),
        _ => Err(malformed(format!("{path} must be a boolean or an object of permission flags"))),
    }
}

fn parse_object_indicator(path: &str, value: &Value) -> Result<ObjectPermission, QueryError> {
    match value {
        Value::Bool(readable) => {
            Ok(ObjectPermission { readable: Some(*readable), ..ObjectPermission::default() })
        }
        Value::Object(flags) => Ok(ObjectPermission {
            readable: flag(path, flags, "isAccessible")?,
            createable: flag(path, flags, "isCreateable")?,
            updateable: flag(path, flags, "isUpdateable")?,
            deletable: flag(path, flags, "isDeletable")?,
        }),
        _ => Err(malformed(format!("{path} must be a boolean or an object of permission flags"))),
    }
}

// Unknown keys are ignored: Salesforce describe results carry many more.
fn flag(path: &str, flags: &Map<String, Value>, key: &str) -> Result<Option<bool>, QueryError> {
    match present(flags.get(key)) {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(malformed(format!("{path}.{key} must be a boolean"))),
    }
}

fn optional_string(body: &Map<String, Value>, key: &str) -> Result<String, QueryError> {
    match present(body.get(key)) {
        None => Ok(String::new()),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(invalid(format!("{key} must be a string"))),
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

fn invalid(message: impl Into<String>) -> QueryError {
    QueryError::Validation(message.into())
}

fn malformed(message: impl Into<String>) -> QueryError {
    QueryError::MalformedContext(message.into())
}

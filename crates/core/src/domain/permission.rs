use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A Salesforce field addressed as `Object.Field`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub object: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(object: impl Into<String>, field: impl Into<String>) -> Self {
        Self { object: object.into(), field: field.into() }
    }

    /// Parses `Object.Field`. Relationship paths keep only the last segment
    /// as the field name (`Account.Owner.Name` -> `Account` / `Name`).
    pub fn parse(raw: &str) -> Option<Self> {
        let (object, rest) = raw.trim().split_once('.')?;
        let field = rest.rsplit('.').next().unwrap_or(rest);
        let object = object.trim();
        let field = field.trim();
        if object.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self::new(object, field))
    }

    fn matches_ignore_case(&self, other: &FieldRef) -> bool {
        self.object.eq_ignore_ascii_case(&other.object)
            && self.field.eq_ignore_ascii_case(&other.field)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.field)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldPermission {
    pub readable: Option<bool>,
    pub updateable: Option<bool>,
    pub createable: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectPermission {
    pub readable: Option<bool>,
    pub createable: Option<bool>,
    pub updateable: Option<bool>,
    pub deletable: Option<bool>,
}

/// Permission data the caller supplied with a query. `supplied == false`
/// means no context was sent and every check resolves to unknown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionContext {
    pub supplied: bool,
    pub profile: Option<String>,
    pub objects: BTreeMap<String, ObjectPermission>,
    pub fields: BTreeMap<FieldRef, FieldPermission>,
}

impl PermissionContext {
    pub fn absent() -> Self {
        Self::default()
    }

    // Salesforce API names are case-insensitive; exact keys win.
    pub fn field(&self, field: &FieldRef) -> Option<&FieldPermission> {
        self.fields.get(field).or_else(|| {
            self.fields
                .iter()
                .find(|(candidate, _)| candidate.matches_ignore_case(field))
                .map(|(_, permission)| permission)
        })
    }

    pub fn object(&self, object: &str) -> Option<&ObjectPermission> {
        self.objects.get(object).or_else(|| {
            self.objects
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(object))
                .map(|(_, permission)| permission)
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessVerdict {
    Granted,
    Denied,
    Unknown,
}

impl AccessVerdict {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::Granted,
            Some(false) => Self::Denied,
            None => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldPermission, FieldRef, PermissionContext};

    #[test]
    fn field_ref_parses_dotted_names() {
        assert_eq!(FieldRef::parse("Account.Rating"), Some(FieldRef::new("Account", "Rating")));
        assert_eq!(
            FieldRef::parse(" Contact.Account.Name "),
            Some(FieldRef::new("Contact", "Name"))
        );
        assert_eq!(FieldRef::parse("Account"), None);
        assert_eq!(FieldRef::parse("Account."), None);
        assert_eq!(FieldRef::parse(".Rating"), None);
    }

    #[test]
    fn field_lookup_falls_back_to_case_insensitive_match() {
        let mut context = PermissionContext { supplied: true, ..PermissionContext::default() };
        context.fields.insert(
            FieldRef::new("Account", "Rating"),
            FieldPermission { readable: Some(false), ..FieldPermission::default() },
        );

        let found = context.field(&FieldRef::new("account", "rating"));
        assert_eq!(found.and_then(|permission| permission.readable), Some(false));
        assert!(context.field(&FieldRef::new("Account", "Industry")).is_none());
    }
}

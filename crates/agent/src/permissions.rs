use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sfquery_core::{AccessVerdict, FieldRef, PermissionCheck, PermissionContext};

fn dotted_field() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z][A-Za-z0-9_]*)\.([A-Za-z][A-Za-z0-9_]*)\b")
            .expect("valid dotted field regex")
    })
}

fn field_of_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bfield\s+['"]?(\w+)['"]?\s+(?:of|in|on)\s+(?:the\s+)?['"]?(\w+)['"]?"#)
            .expect("valid field-of-object regex")
    })
}

/// Finds the field a question is about: `Account.Rating` first, then
/// `field Rating of Account`. Among several dotted references the one the
/// permission context mentions wins.
pub fn extract_field_ref(text: &str, permissions: &PermissionContext) -> Option<FieldRef> {
    let candidates: Vec<FieldRef> = dotted_field()
        .captures_iter(text)
        .filter(|captures| {
            let whole = captures.get(0).map_or(0..0, |found| found.range());
            is_field_token(text, whole.start, whole.end)
                && captures[1].len() > 1
                && captures[2].len() > 1
        })
        .map(|captures| FieldRef::new(&captures[1], &captures[2]))
        .collect();

    let known = candidates.iter().find(|candidate| {
        permissions.field(candidate).is_some() || permissions.object(&candidate.object).is_some()
    });
    if let Some(found) = known.or_else(|| candidates.first()) {
        return Some(found.clone());
    }
    field_of_object().captures(text).map(|captures| FieldRef::new(&captures[2], &captures[1]))
}

/// Rejects email domains (`jane@acme.com`) and longer dotted names
/// (`www.acme.com`).
fn is_field_token(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    if matches!(before, Some('@' | '.')) {
        return false;
    }
    let mut after = text[end..].chars();
    !(after.next() == Some('.') && after.next().is_some_and(char::is_alphanumeric))
}

/// Why a verdict was reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessBasis {
    NoContext,
    FieldPermission,
    ObjectPermission,
    AdminProfile,
    NotListed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAccessFinding {
    pub object: String,
    pub field: String,
    pub verdict: AccessVerdict,
    pub basis: AccessBasis,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updateable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub createable: Option<bool>,
    pub message: String,
}

impl FieldAccessFinding {
    pub fn target(&self) -> FieldRef {
        FieldRef::new(&self.object, &self.field)
    }

    pub fn into_check(self) -> PermissionCheck {
        PermissionCheck { target: Some(self.target()), verdict: self.verdict, message: self.message }
    }
}

pub fn check_field_access(
    permissions: &PermissionContext,
    target: &FieldRef,
    admin_profiles: &[String],
) -> FieldAccessFinding {
    let finding = |verdict, basis, message: String| FieldAccessFinding {
        object: target.object.clone(),
        field: target.field.clone(),
        verdict,
        basis,
        updateable: None,
        createable: None,
        message,
    };

    if !permissions.supplied {
        return finding(
            AccessVerdict::Unknown,
            AccessBasis::NoContext,
            format!("No permission context was supplied, so access to {target} cannot be determined."),
        );
    }

    let profile = permissions.profile.as_deref().unwrap_or("the current profile");

    if let Some(field) = permissions.field(target) {
        if let Some(readable) = field.readable {
            let message = if readable {
                format!("The field {target} is accessible to {profile}.")
            } else {
                format!("The field {target} is not accessible to {profile}.")
            };
            return FieldAccessFinding {
                updateable: field.updateable,
                createable: field.createable,
                ..finding(AccessVerdict::from_flag(Some(readable)), AccessBasis::FieldPermission, message)
            };
        }
    }

    if permissions.object(&target.object).and_then(|object| object.readable) == Some(false) {
        return finding(
            AccessVerdict::Denied,
            AccessBasis::ObjectPermission,
            format!("{profile} cannot access the {} object, so {target} is not visible.", target.object),
        );
    }

    if let Some(admin) = permissions
        .profile
        .as_deref()
        .filter(|profile| admin_profiles.iter().any(|admin| admin.eq_ignore_ascii_case(profile)))
    {
        return finding(
            AccessVerdict::Granted,
            AccessBasis::AdminProfile,
            format!("The {admin} profile has access to all fields, including {target}."),
        );
    }

    finding(
        AccessVerdict::Unknown,
        AccessBasis::NotListed,
        format!("The supplied permissions do not mention {target}, so access for {profile} is unknown."),
    )
}

/// Object-level read access as far as the context establishes it.
pub fn object_access(permissions: &PermissionContext, object: &str) -> AccessVerdict {
    if !permissions.supplied {
        return AccessVerdict::Unknown;
    }
    AccessVerdict::from_flag(permissions.object(object).and_then(|permission| permission.readable))
}

#[cfg(test)]
mod tests {
    use sfquery_core::{
        AccessVerdict, FieldPermission, FieldRef, ObjectPermission, PermissionContext,
    };

    use super::{check_field_access, extract_field_ref, object_access, AccessBasis};

    fn admins() -> Vec<String> {
        vec!["System Administrator".to_string(), "Custom Admin".to_string()]
    }

    fn context(profile: &str) -> PermissionContext {
        PermissionContext {
            supplied: true,
            profile: Some(profile.to_string()),
            ..PermissionContext::default()
        }
    }

    #[test]
    fn extracts_dotted_and_prose_field_references() {
        let none = PermissionContext::absent();
        assert_eq!(
            extract_field_ref("Does the Sales Rep profile have access to Account.Rating?", &none),
            Some(FieldRef::new("Account", "Rating"))
        );
        assert_eq!(
            extract_field_ref("Can I see the field AnnualRevenue on the Account object", &none),
            Some(FieldRef::new("Account", "AnnualRevenue"))
        );
        assert_eq!(extract_field_ref("Can I edit opportunities?", &none), None);
    }

    #[test]
    fn email_domains_and_abbreviations_are_not_field_references() {
        let none = PermissionContext::absent();
        assert_eq!(
            extract_field_ref("Can jane@acme.com see Account.Rating?", &none),
            Some(FieldRef::new("Account", "Rating"))
        );
        assert_eq!(
            extract_field_ref("E.g. does the rep have access to Account.Rating?", &none),
            Some(FieldRef::new("Account", "Rating"))
        );
        assert_eq!(
            extract_field_ref("Is www.acme.com allowed to read Contact.Email.", &none),
            Some(FieldRef::new("Contact", "Email"))
        );
    }

    #[test]
    fn field_named_in_the_context_wins_over_other_dotted_tokens() {
        let mut permissions = context("Sales Rep");
        permissions.fields.insert(
            FieldRef::new("Account", "Rating"),
            FieldPermission { readable: Some(false), updateable: None, createable: None },
        );

        let target = extract_field_ref("Per Notes.Draft, can I see Account.Rating?", &permissions)
            .expect("field reference");
        assert_eq!(target, FieldRef::new("Account", "Rating"));

        let asked = "Can jane@acme.com see Account.Rating?";
        let target = extract_field_ref(asked, &permissions).expect("field reference");
        let finding = check_field_access(&permissions, &target, &admins());
        assert_eq!(finding.verdict, AccessVerdict::Denied);
    }

    #[test]
    fn explicit_field_entry_decides() {
        let mut permissions = context("Sales Rep");
        permissions.fields.insert(
            FieldRef::new("Account", "Rating"),
            FieldPermission { readable: Some(false), updateable: Some(false), createable: None },
        );

        let finding =
            check_field_access(&permissions, &FieldRef::new("Account", "Rating"), &admins());
        assert_eq!(finding.verdict, AccessVerdict::Denied);
        assert_eq!(finding.basis, AccessBasis::FieldPermission);
        assert_eq!(finding.updateable, Some(false));
        assert!(finding.message.contains("Sales Rep"));
    }

    #[test]
    fn inaccessible_object_denies_its_fields() {
        let mut permissions = context("Sales Rep");
        permissions.objects.insert(
            "Lead".to_string(),
            ObjectPermission { readable: Some(false), ..ObjectPermission::default() },
        );

        let finding = check_field_access(&permissions, &FieldRef::new("Lead", "Email"), &admins());
        assert_eq!(finding.verdict, AccessVerdict::Denied);
        assert_eq!(finding.basis, AccessBasis::ObjectPermission);
        assert_eq!(object_access(&permissions, "lead"), AccessVerdict::Denied);
    }

    #[test]
    fn admin_profiles_are_granted_and_others_unknown() {
        let target = FieldRef::new("Account", "Rating");

        let admin = check_field_access(&context("system administrator"), &target, &admins());
        assert_eq!(admin.verdict, AccessVerdict::Granted);
        assert_eq!(admin.basis, AccessBasis::AdminProfile);

        let rep = check_field_access(&context("Sales Rep"), &target, &admins());
        assert_eq!(rep.verdict, AccessVerdict::Unknown);
        assert_eq!(rep.basis, AccessBasis::NotListed);

        let none = check_field_access(&PermissionContext::absent(), &target, &admins());
        assert_eq!(none.verdict, AccessVerdict::Unknown);
        assert_eq!(none.basis, AccessBasis::NoContext);
        assert_eq!(object_access(&PermissionContext::absent(), "Account"), AccessVerdict::Unknown);
    }

    #[test]
    fn finding_converts_into_permission_check() {
        let target = FieldRef::new("Contact", "Email");
        let check = check_field_access(&context("Custom Admin"), &target, &admins()).into_check();
        assert_eq!(check.target, Some(FieldRef::new("Contact", "Email")));
        assert_eq!(check.verdict, AccessVerdict::Granted);
    }
}

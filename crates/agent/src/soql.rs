use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub const DEFAULT_SOQL: &str = "SELECT Id, Name FROM Account LIMIT 10";

fn soql_statement() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bSELECT\s+[\s\S]+?\bFROM\s+\w+[^;\n`]*").expect("valid soql regex")
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoqlSource {
    Extracted,
    Drafted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SoqlPlan {
    pub statement: String,
    pub source: SoqlSource,
    pub object: Option<String>,
    /// Top-level select list; a relationship sub-query stays one entry.
    pub fields: Vec<String>,
}

impl SoqlPlan {
    /// Uses a statement written in the text when there is one, otherwise
    /// drafts one from the objects the text mentions.
    pub fn for_text(text: &str) -> Self {
        let (statement, source) = match extract_soql(text) {
            Some(statement) => (statement, SoqlSource::Extracted),
            None => (draft_soql(text).to_string(), SoqlSource::Drafted),
        };
        let (object, fields) = match parse_soql(&statement) {
            Some((object, fields)) => (Some(object), fields),
            None => (None, Vec::new()),
        };
        Self { statement, source, object, fields }
    }
}

pub fn extract_soql(text: &str) -> Option<String> {
    let found = soql_statement().find(text)?;
    let statement = found.as_str().trim().trim_end_matches(['.', '?', '!']).trim_end();
    Some(statement.to_string())
}

pub fn draft_soql(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    if lowered.contains("account") {
        if lowered.contains("contact") {
            "SELECT Id, Name, (SELECT Id, FirstName, LastName FROM Contacts) FROM Account"
        } else {
            "SELECT Id, Name, Industry, Type FROM Account"
        }
    } else if lowered.contains("contact") {
        "SELECT Id, FirstName, LastName, Email, Phone FROM Contact"
    } else if lowered.contains("opportunit") {
        "SELECT Id, Name, Amount, CloseDate, StageName FROM Opportunity"
    } else {
        DEFAULT_SOQL
    }
}

/// Splits a statement into its top-level object and select list.
pub fn parse_soql(statement: &str) -> Option<(String, Vec<String>)> {
    let trimmed = statement.trim();
    if !keyword_at(trimmed, 0, "SELECT") {
        return None;
    }

    let from = top_level_keyword(trimmed, "FROM")?;
    let object: String = trimmed[from + 4..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if object.is_empty() {
        return None;
    }

    let fields = split_top_level(&trimmed["SELECT".len()..from]);
    Some((object, fields))
}

fn top_level_keyword(statement: &str, keyword: &str) -> Option<usize> {
    let mut depth = 0_i32;
    for (index, byte) in statement.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ if depth == 0 && keyword_at(statement, index, keyword) => return Some(index),
            _ => {}
        }
    }
    None
}

fn keyword_at(statement: &str, index: usize, keyword: &str) -> bool {
    let Some(candidate) = statement.get(index..index + keyword.len()) else {
        return false;
    };
    let bytes = statement.as_bytes();
    let boundary_before = index == 0 || bytes[index - 1].is_ascii_whitespace();
    let boundary_after =
        bytes.get(index + keyword.len()).map_or(true, |next| next.is_ascii_whitespace());
    candidate.eq_ignore_ascii_case(keyword) && boundary_before && boundary_after
}

fn split_top_level(select_list: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut depth = 0_i32;
    let mut current = String::new();
    for c in select_list.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                push_field(&mut fields, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    push_field(&mut fields, &current);
    fields
}

fn push_field(fields: &mut Vec<String>, raw: &str) {
    let field = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !field.is_empty() {
        fields.push(field);
    }
}

#[cfg(test)]
mod tests {
    use super::{draft_soql, extract_soql, parse_soql, SoqlPlan, SoqlSource, DEFAULT_SOQL};

    #[test]
    fn extracts_statement_from_prose() {
        let text = "Run SELECT Id, Name FROM Account WHERE Industry = 'Technology' LIMIT 5; please";
        assert_eq!(
            extract_soql(text).as_deref(),
            Some("SELECT Id, Name FROM Account WHERE Industry = 'Technology' LIMIT 5")
        );
        assert_eq!(extract_soql("how many accounts do we have?"), None);
    }

    #[test]
    fn drafts_from_keywords() {
        assert_eq!(
            draft_soql("Accounts and their contacts"),
            "SELECT Id, Name, (SELECT Id, FirstName, LastName FROM Contacts) FROM Account"
        );
        assert_eq!(
            draft_soql("open Opportunities this quarter"),
            "SELECT Id, Name, Amount, CloseDate, StageName FROM Opportunity"
        );
        assert_eq!(draft_soql("what happened yesterday"), DEFAULT_SOQL);
    }

    #[test]
    fn parse_keeps_subquery_as_one_field_and_finds_outer_object() {
        let (object, fields) = parse_soql(
            "SELECT Id, Name, (SELECT Id, FirstName FROM Contacts) FROM Account LIMIT 10",
        )
        .expect("parse");
        assert_eq!(object, "Account");
        assert_eq!(fields, vec!["Id", "Name", "(SELECT Id, FirstName FROM Contacts)"]);

        assert_eq!(parse_soql("UPDATE Account SET Name = 'x'"), None);
    }

    #[test]
    fn plan_reports_its_source() {
        let drafted = SoqlPlan::for_text("list contacts");
        assert_eq!(drafted.source, SoqlSource::Drafted);
        assert_eq!(drafted.object.as_deref(), Some("Contact"));
        assert_eq!(drafted.fields.len(), 5);

        let extracted = SoqlPlan::for_text("select Name, Amount from Opportunity");
        assert_eq!(extracted.source, SoqlSource::Extracted);
        assert_eq!(extracted.object.as_deref(), Some("Opportunity"));
        assert_eq!(extracted.fields, vec!["Name", "Amount"]);
    }
}

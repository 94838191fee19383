//! DHIS2 import summaries embedded in log lines
//!
//! Sync jobs log the server response of each pushed object as a single-line
//! `ImportSummary{...}` block. Formatted for clarity:
//!
//! ```text
//! ImportSummary{
//!     status=ERROR,
//!     description='Program is not assigned to this Organisation Unit: WA5iEXjqCnS',
//!     importCount=[imports=0, updates=0, ignores=1],
//!     conflicts={},
//!     dataSetComplete='null',
//!     reference='ZOkh9BeNXYF',
//!     href='null'
//! }
//! ```
//!
//! Blocks are located with a balanced-brace scan and their fields are picked
//! with independent regular expressions; any missing field is simply absent.

use std::sync::LazyLock;

use regex::Regex;

/// Keyword that opens an import summary block.
pub const IMPORT_SUMMARY: &str = "ImportSummary";

const IMPORT_CONFLICT: &str = "ImportConflict";
const CONFLICTS: &str = "conflicts=";

static STATUS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"status=(\w+)").unwrap());
static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"description='(.*?)'").unwrap());
static IMPORT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"importCount=\[(.*?)\]").unwrap());
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"reference='(.*?)'").unwrap());

/// Fields of one import summary block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub status: Option<String>,
    pub description: Option<String>,
    pub import_count: Option<String>,
    pub reference: Option<String>,
    pub conflicts: Option<String>,
}

impl ImportSummary {
    /// Extracts the summary fields from the contents of one block.
    pub fn from_block(block: &str) -> Self {
        let capture = |regex: &Regex| {
            regex
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        Self {
            status: capture(&STATUS),
            description: capture(&DESCRIPTION),
            import_count: capture(&IMPORT_COUNT),
            reference: capture(&REFERENCE),
            conflicts: conflicts(block),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("ERROR")
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Canonical single-line error string:
    /// `status="<status>" object_id="<reference>" message="<message>"`.
    pub fn format(&self) -> String {
        let mut message_parts: Vec<&str> = Vec::with_capacity(2);

        if self.status.as_deref() != Some("SUCCESS") {
            if let Some(description) = self.description.as_deref() {
                if !description.is_empty() && description != "null" {
                    message_parts.push(description);
                }
            }
        }

        if let Some(conflicts) = self.conflicts.as_deref() {
            if !conflicts.is_empty() {
                message_parts.push(conflicts);
            }
        }

        format!(
            r#"status="{}" object_id="{}" message="{}""#,
            self.status.as_deref().unwrap_or_default(),
            self.reference.as_deref().unwrap_or_default(),
            message_parts.join(" ")
        )
    }
}

/// Conflicts of a block: `ImportConflict{...}` contents, or the raw
/// `conflicts={...}` contents when there are no typed conflicts.
fn conflicts(block: &str) -> Option<String> {
    let typed = blocks(block, IMPORT_CONFLICT)
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();

    let conflicts = if typed.is_empty() {
        blocks(block, CONFLICTS).first()?.trim().to_string()
    } else {
        typed.join(" ")
    };

    (!conflicts.is_empty()).then_some(conflicts)
}

/// Parses every import summary block in a line.
pub fn parse_import_summaries(text: &str) -> Vec<ImportSummary> {
    blocks(text, IMPORT_SUMMARY)
        .into_iter()
        .map(ImportSummary::from_block)
        .collect()
}

/// Returns the contents of every `keyword{...}` occurrence, honoring nested
/// braces.
///
/// ```text
/// ImportSummary{some error}           -> "some error"
/// ImportConflict{{error 1}, {error2}} -> "{error 1}, {error2}"
/// ```
///
/// An unbalanced block stops the scan: it and anything after it are ignored.
pub fn blocks<'a>(text: &'a str, keyword: &str) -> Vec<&'a str> {
    let opening = format!("{keyword}{{");
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some(position) = text[offset..].find(&opening) {
        let content_start = offset + position + opening.len();
        let mut depth = 1usize;
        let mut cursor = content_start;

        while cursor < bytes.len() && depth > 0 {
            match bytes[cursor] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            cursor += 1;
        }

        if depth != 0 {
            break;
        }

        found.push(&text[content_start..cursor - 1]);
        offset = cursor;
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERROR_LINE: &str = "ImportSummaries{status=ERROR, importSummaries=[ImportSummary{status=ERROR, description='Program is not assigned to this Organisation Unit: WA5iEXjqCnS', importCount=[imports=0, updates=0, ignores=1], conflicts={}, dataSetComplete='null', reference='ZOkh9BeNXYF', href='null'}]}";

    #[test]
    fn blocks_simple() {
        assert_eq!(blocks("ImportSummary{some error}", "ImportSummary"), vec!["some error"]);
    }

    #[test]
    fn blocks_nested() {
        assert_eq!(
            blocks("x ImportConflict{{error 1}, {error2}} y", "ImportConflict"),
            vec!["{error 1}, {error2}"]
        );
        assert_eq!(
            blocks("ImportSummary{status=ERROR, conflicts={{x},{y}}}", "ImportSummary"),
            vec!["status=ERROR, conflicts={{x},{y}}"]
        );
    }

    #[test]
    fn blocks_multiple() {
        assert_eq!(
            blocks("ImportSummary{a} and ImportSummary{b{c}}", "ImportSummary"),
            vec!["a", "b{c}"]
        );
    }

    #[test]
    fn blocks_unbalanced_aborts_rest_of_line() {
        assert_eq!(
            blocks("ImportSummary{a} ImportSummary{b{c} ImportSummary{d}", "ImportSummary"),
            vec!["a"]
        );
        assert!(blocks("ImportSummary{never closed", "ImportSummary").is_empty());
    }

    #[test]
    fn blocks_ignores_keyword_without_brace() {
        assert!(blocks("ImportSummary status=ERROR", "ImportSummary").is_empty());
    }

    #[test]
    fn parse_error_summary() {
        let summaries = parse_import_summaries(ERROR_LINE);
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.status.as_deref(), Some("ERROR"));
        assert_eq!(
            summary.description.as_deref(),
            Some("Program is not assigned to this Organisation Unit: WA5iEXjqCnS")
        );
        assert_eq!(
            summary.import_count.as_deref(),
            Some("imports=0, updates=0, ignores=1")
        );
        assert_eq!(summary.reference.as_deref(), Some("ZOkh9BeNXYF"));
        assert_eq!(summary.conflicts, None);
        assert!(summary.is_error());

        assert_eq!(
            summary.format(),
            r#"status="ERROR" object_id="ZOkh9BeNXYF" message="Program is not assigned to this Organisation Unit: WA5iEXjqCnS""#
        );
    }

    #[test]
    fn parse_missing_fields() {
        let summary = ImportSummary::from_block("status=WARNING");
        assert_eq!(summary.status.as_deref(), Some("WARNING"));
        assert_eq!(summary.description, None);
        assert_eq!(summary.reference, None);
        assert!(!summary.is_error());
        assert!(!summary.has_conflicts());
    }

    #[test]
    fn typed_conflicts() {
        let summary = ImportSummary::from_block(
            "status=WARNING, description='null', conflicts=[ImportConflict{object=Bzyve9gtbyw, value=Event.orgUnit does not point to a valid organisation unit}], reference='Bzyve9gtbyw'",
        );
        assert_eq!(
            summary.conflicts.as_deref(),
            Some("object=Bzyve9gtbyw, value=Event.orgUnit does not point to a valid organisation unit")
        );
        assert_eq!(
            summary.format(),
            r#"status="WARNING" object_id="Bzyve9gtbyw" message="object=Bzyve9gtbyw, value=Event.orgUnit does not point to a valid organisation unit""#
        );
    }

    #[test]
    fn nested_conflicts_block() {
        let summary = ImportSummary::from_block("status=ERROR, conflicts={{x},{y}}");
        assert_eq!(summary.conflicts.as_deref(), Some("{x},{y}"));
        assert!(summary.has_conflicts());
    }

    #[test]
    fn success_hides_description() {
        let summary = ImportSummary {
            status: Some(String::from("SUCCESS")),
            description: Some(String::from("Import done")),
            reference: Some(String::from("abc")),
            conflicts: Some(String::from("object=x")),
            ..Default::default()
        };
        assert_eq!(
            summary.format(),
            r#"status="SUCCESS" object_id="abc" message="object=x""#
        );
    }

    #[test]
    fn null_description_is_omitted() {
        let summary = ImportSummary::from_block("status=ERROR, description='null', reference='abc'");
        assert_eq!(summary.format(), r#"status="ERROR" object_id="abc" message="""#);
    }
}

use regex::Regex;
use serde::Serialize;

macro_rules! lazy_regex {
    ($name:ident = $pattern:expr) => {
        static $name: once_cell::sync::Lazy<Regex> =
            once_cell::sync::Lazy::new(|| Regex::new($pattern).expect("invalid regex"));
    };
}

lazy_regex!(BUG_FIX = r"fix|bug|error|fail|crash");
lazy_regex!(FEATURE = r"feature|add|implement|request|suggestion|enhance");
lazy_regex!(DOCUMENTATION = r"doc|readme|typo|document");
lazy_regex!(DUPLICATE_INVALID = r"duplicate|invalid");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    BugFix,
    Feature,
    Documentation,
    DuplicateInvalid,
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 5] = [
        IssueCategory::BugFix,
        IssueCategory::Feature,
        IssueCategory::Documentation,
        IssueCategory::DuplicateInvalid,
        IssueCategory::Other,
    ];
}

/// Keyword classification of an issue title. Rules are checked in order and the first hit wins,
/// so "fix typo in docs" is a bug fix.
pub fn classify_title(title: Option<&str>) -> IssueCategory {
    let Some(title) = title else {
        return IssueCategory::Other;
    };
    let title = title.to_lowercase();
    [
        (&*BUG_FIX, IssueCategory::BugFix),
        (&*FEATURE, IssueCategory::Feature),
        (&*DOCUMENTATION, IssueCategory::Documentation),
        (&*DUPLICATE_INVALID, IssueCategory::DuplicateInvalid),
    ]
    .into_iter()
    .find(|(pattern, _)| pattern.is_match(&title))
    .map_or(IssueCategory::Other, |(_, category)| category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        assert_eq!(classify_title(Some("Fix typo in docs")), IssueCategory::BugFix);
        assert_eq!(classify_title(Some("Add README badge")), IssueCategory::Feature);
        assert_eq!(classify_title(Some("Typo in tutorial")), IssueCategory::Documentation);
        assert_eq!(
            classify_title(Some("Duplicate of #12")),
            IssueCategory::DuplicateInvalid
        );
        assert_eq!(classify_title(Some("Question about licensing")), IssueCategory::Other);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        assert_eq!(classify_title(Some("CRASHES on startup")), IssueCategory::BugFix);
        assert_eq!(classify_title(Some("Debugging tips")), IssueCategory::BugFix);
        assert_eq!(classify_title(Some("Padding looks off")), IssueCategory::Feature);
    }

    #[test]
    fn missing_title_is_other() {
        assert_eq!(classify_title(None), IssueCategory::Other);
        assert_eq!(classify_title(Some("")), IssueCategory::Other);
    }
}

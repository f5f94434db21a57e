use super::{IssueType, QualityIssue, Severity, TableProfile};

/// Apply the detection rules to a profile. Rules are independent and may fire together on
/// the same column.
pub fn detect_issues(profile: &TableProfile) -> Vec<QualityIssue> {
    let table = &profile.table;

    if profile.is_empty_table() {
        return vec![QualityIssue {
            table: table.clone(),
            column_name: None,
            issue_type: IssueType::EmptyTable,
            severity: Severity::High,
            description: format!("Table '{table}' contains no records"),
            affected_record_count: 0,
        }];
    }

    let mut issues = Vec::new();
    for col in &profile.columns {
        let issue = |issue_type, severity, description, affected_record_count| QualityIssue {
            table: table.clone(),
            column_name: Some(col.name.clone()),
            issue_type,
            severity,
            description,
            affected_record_count,
        };

        if !col.nullable && col.null_percentage > 5.0 {
            let severity = if col.null_percentage > 20.0 {
                Severity::High
            } else {
                Severity::Medium
            };
            issues.push(issue(
                IssueType::HighNulls,
                severity,
                format!(
                    "Column '{}' has {:.1}% NULL values but is marked as NOT NULL",
                    col.name, col.null_percentage
                ),
                col.null_count,
            ));
        }

        if col.name.to_lowercase().contains("id") && col.unique_percentage < 95.0 {
            issues.push(issue(
                IssueType::DuplicateIds,
                Severity::High,
                format!(
                    "ID column '{}' has only {:.1}% unique values",
                    col.name, col.unique_percentage
                ),
                (col.total_rows - col.distinct_count).max(0),
            ));
        }

        if col.null_percentage > 50.0 {
            issues.push(issue(
                IssueType::MostlyNull,
                Severity::Medium,
                format!("Column '{}' is {:.1}% NULL", col.name, col.null_percentage),
                col.null_count,
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{ColumnProfile, TableRef};
    use uuid::Uuid;

    fn profile(rows: i64, columns: Vec<ColumnProfile>) -> TableProfile {
        TableProfile {
            table: TableRef::new(Uuid::nil(), "public", "orders"),
            record_count: rows,
            columns,
        }
    }

    fn kinds(issues: &[QualityIssue]) -> Vec<(IssueType, Severity)> {
        issues.iter().map(|i| (i.issue_type, i.severity)).collect()
    }

    #[test]
    fn test_empty_table_yields_single_issue() {
        let issues = detect_issues(&profile(0, vec![]));
        assert_eq!(kinds(&issues), vec![(IssueType::EmptyTable, Severity::High)]);
        assert_eq!(issues[0].column_name, None);
        assert_eq!(issues[0].description, "Table 'public.orders' contains no records");
    }

    #[test]
    fn test_not_null_violation_severity() {
        let medium = ColumnProfile::new("total", "numeric", false, 100, 10, 80, vec![]);
        let high = ColumnProfile::new("qty", "integer", false, 100, 30, 20, vec![]);
        let issues = detect_issues(&profile(100, vec![medium, high]));
        assert_eq!(
            kinds(&issues),
            vec![
                (IssueType::HighNulls, Severity::Medium),
                (IssueType::HighNulls, Severity::High),
            ]
        );
        assert_eq!(
            issues[0].description,
            "Column 'total' has 10.0% NULL values but is marked as NOT NULL"
        );
        assert_eq!(issues[1].affected_record_count, 30);
    }

    #[test]
    fn test_duplicate_ids() {
        let col = ColumnProfile::new("customer_id", "integer", true, 100, 0, 80, vec![]);
        let issues = detect_issues(&profile(100, vec![col]));
        assert_eq!(kinds(&issues), vec![(IssueType::DuplicateIds, Severity::High)]);
        assert_eq!(issues[0].affected_record_count, 20);
        assert_eq!(issues[0].description, "ID column 'customer_id' has only 80.0% unique values");
    }

    #[test]
    fn test_rules_stack_on_one_column() {
        let col = ColumnProfile::new("email", "text", false, 100, 60, 40, vec![]);
        let issues = detect_issues(&profile(100, vec![col]));
        assert_eq!(
            kinds(&issues),
            vec![
                (IssueType::HighNulls, Severity::High),
                (IssueType::MostlyNull, Severity::Medium),
            ]
        );
        assert!(issues.iter().all(|i| i.column_name.as_deref() == Some("email")));
    }

    #[test]
    fn test_healthy_table_has_no_issues() {
        let cols = vec![
            ColumnProfile::new("id", "integer", false, 100, 0, 100, vec![]),
            ColumnProfile::new("name", "text", true, 100, 5, 90, vec![]),
        ];
        assert!(detect_issues(&profile(100, cols)).is_empty());
    }
}

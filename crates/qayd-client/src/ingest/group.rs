use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::UnbalancedStrategy;
use crate::contracts::types::{BalanceReport, UnbalancedEntry};
use crate::ingest::normalize::NormalizedRow;
use crate::{ClientError, ClientResult};

pub(crate) const DESCRIPTION_SEPARATOR: &str = "; ";

pub(crate) fn balance_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

pub(crate) fn entry_key(entry_no: &str, entry_date: NaiveDate) -> String {
    format!("{entry_no}_{}", entry_date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineDraft {
    pub(crate) entry_key: String,
    /// `None` for lines the pipeline synthesised.
    pub(crate) source_row: Option<i64>,
    /// 1-based position among this entry's incoming lines.
    pub(crate) position: i64,
    pub(crate) account_code: Option<String>,
    /// Set when the account id is known up front (the suspense line).
    pub(crate) account_id: Option<String>,
    pub(crate) classification_code: Option<String>,
    pub(crate) project_code: Option<String>,
    pub(crate) work_analysis_code: Option<String>,
    pub(crate) sub_tree_code: Option<String>,
    pub(crate) debit: Decimal,
    pub(crate) credit: Decimal,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HeaderDraft {
    pub(crate) entry_key: String,
    pub(crate) entry_no: String,
    pub(crate) entry_date: NaiveDate,
    pub(crate) fiscal_year: i64,
    pub(crate) month: i64,
    pub(crate) description: Option<String>,
    pub(crate) total_debit: Decimal,
    pub(crate) total_credit: Decimal,
    pub(crate) line_count: i64,
    pub(crate) source_rows: Vec<i64>,
    /// Rows whose fiscal year or month disagree with the header's.
    pub(crate) period_conflicts: Vec<i64>,
}

impl HeaderDraft {
    pub(crate) fn residue(&self) -> Decimal {
        self.total_debit - self.total_credit
    }

    pub(crate) fn is_balanced(&self) -> bool {
        self.residue().abs() <= balance_tolerance()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GroupOutput {
    pub(crate) headers: Vec<HeaderDraft>,
    pub(crate) lines: Vec<LineDraft>,
    /// Entry key of every groupable source row, including rows excluded as lines.
    pub(crate) row_entries: BTreeMap<i64, String>,
    pub(crate) balance: BalanceReport,
}

/// Partitions rows by (entry_no, entry_date), totals them and applies the unbalanced strategy.
///
/// Rows without an entry number or date cannot be grouped and are left to the validator.
/// Rows that do not carry exactly one positive amount are kept out of the line table.
pub(crate) fn group_entries(
    rows: &[NormalizedRow],
    strategy: UnbalancedStrategy,
    suspense_account_id: Option<&str>,
) -> ClientResult<GroupOutput> {
    let mut order: Vec<String> = Vec::new();
    let mut members: HashMap<String, Vec<&NormalizedRow>> = HashMap::new();
    let mut row_entries = BTreeMap::new();

    for row in rows {
        let (Some(entry_no), Some(entry_date)) = (row.entry_no.as_deref(), row.entry_date) else {
            continue;
        };
        let key = entry_key(entry_no, entry_date);
        row_entries.insert(row.source_row, key.clone());
        members
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key.clone());
                Vec::new()
            })
            .push(row);
    }

    let mut headers = Vec::with_capacity(order.len());
    let mut lines = Vec::new();
    let mut unbalanced = Vec::new();

    for key in order {
        let Some(entry_rows) = members.remove(&key) else {
            continue;
        };
        let Some(first) = entry_rows.first() else {
            continue;
        };
        let entry_no = first.entry_no.clone().unwrap_or_default();
        let entry_date = first.entry_date.unwrap_or_default();

        let fiscal_year = entry_rows
            .iter()
            .find_map(|row| row.fiscal_year)
            .unwrap_or_else(|| i64::from(entry_date.year()));
        let month = entry_rows
            .iter()
            .find_map(|row| row.month)
            .unwrap_or_else(|| i64::from(entry_date.month()));
        let period_conflicts = entry_rows
            .iter()
            .filter(|row| {
                row.fiscal_year.is_some_and(|value| value != fiscal_year)
                    || row.month.is_some_and(|value| value != month)
            })
            .map(|row| row.source_row)
            .collect::<Vec<i64>>();

        let mut descriptions: Vec<String> = Vec::new();
        let mut entry_lines = Vec::new();
        for row in &entry_rows {
            if !has_single_positive_amount(row) {
                continue;
            }
            if let Some(description) = row.description.as_deref().map(str::trim)
                && !description.is_empty()
                && !descriptions.iter().any(|seen| seen == description)
            {
                descriptions.push(description.to_string());
            }
            entry_lines.push(LineDraft {
                entry_key: key.clone(),
                source_row: Some(row.source_row),
                position: entry_lines.len() as i64 + 1,
                account_code: row.account_code.clone(),
                account_id: None,
                classification_code: row.classification_code.clone(),
                project_code: row.project_code.clone(),
                work_analysis_code: row.work_analysis_code.clone(),
                sub_tree_code: row.sub_tree_code.clone(),
                debit: row.debit.unwrap_or_default(),
                credit: row.credit.unwrap_or_default(),
                description: row.description.clone(),
            });
        }

        let mut header = HeaderDraft {
            entry_key: key.clone(),
            entry_no,
            entry_date,
            fiscal_year,
            month,
            description: if descriptions.is_empty() {
                None
            } else {
                Some(descriptions.join(DESCRIPTION_SEPARATOR))
            },
            total_debit: entry_lines.iter().map(|line| line.debit).sum(),
            total_credit: entry_lines.iter().map(|line| line.credit).sum(),
            line_count: entry_lines.len() as i64,
            source_rows: entry_rows.iter().map(|row| row.source_row).collect(),
            period_conflicts,
        };

        if header.is_balanced() {
            headers.push(header);
            lines.extend(entry_lines);
            continue;
        }

        let residue = header.residue();
        let mut record = UnbalancedEntry {
            entry_key: key.clone(),
            entry_no: header.entry_no.clone(),
            entry_date: header.entry_date.format("%Y-%m-%d").to_string(),
            total_debit: header.total_debit,
            total_credit: header.total_credit,
            residue,
            line_count: header.line_count,
            source_rows: header.source_rows.clone(),
            action: String::new(),
        };

        match strategy {
            UnbalancedStrategy::Fail => {
                record.action = "failed".to_string();
                headers.push(header);
                lines.extend(entry_lines);
            }
            UnbalancedStrategy::Skip => {
                record.action = "skipped".to_string();
            }
            UnbalancedStrategy::AutoBalance => {
                let Some(suspense) = suspense_account_id else {
                    return Err(ClientError::suspense_account_unavailable(
                        "no suspense account id was supplied",
                    ));
                };
                let amount = residue.abs();
                let (debit, credit) = if residue > Decimal::ZERO {
                    (Decimal::ZERO, amount)
                } else {
                    (amount, Decimal::ZERO)
                };
                entry_lines.push(LineDraft {
                    entry_key: key.clone(),
                    source_row: None,
                    position: entry_lines.len() as i64 + 1,
                    account_code: None,
                    account_id: Some(suspense.to_string()),
                    classification_code: None,
                    project_code: None,
                    work_analysis_code: None,
                    sub_tree_code: None,
                    debit,
                    credit,
                    description: Some(format!("Auto-balance residue for entry {key}")),
                });
                header.total_debit += debit;
                header.total_credit += credit;
                header.line_count += 1;
                record.action = "auto_balanced".to_string();
                headers.push(header);
                lines.extend(entry_lines);
            }
        }
        unbalanced.push(record);
    }

    let entries_total = headers.len() as i64
        + unbalanced
            .iter()
            .filter(|entry| entry.action == "skipped")
            .count() as i64;
    let balance = BalanceReport {
        strategy: strategy.as_str().to_string(),
        entries_total,
        balanced: entries_total - unbalanced.len() as i64,
        unbalanced,
    };

    info!(
        entries = balance.entries_total,
        unbalanced = balance.unbalanced.len(),
        strategy = strategy.as_str(),
        "grouped journal entries"
    );

    Ok(GroupOutput {
        headers,
        lines,
        row_entries,
        balance,
    })
}

pub(crate) fn has_single_positive_amount(row: &NormalizedRow) -> bool {
    let debit = row.debit.unwrap_or_default();
    let credit = row.credit.unwrap_or_default();
    if debit < Decimal::ZERO || credit < Decimal::ZERO {
        return false;
    }
    (debit > Decimal::ZERO) != (credit > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{entry_key, group_entries};
    use crate::config::UnbalancedStrategy;
    use crate::ingest::normalize::NormalizedRow;

    fn row(
        source_row: i64,
        entry_no: &str,
        day: u32,
        account: &str,
        debit: Decimal,
        credit: Decimal,
        description: Option<&str>,
    ) -> NormalizedRow {
        NormalizedRow {
            source_row,
            entry_no: Some(entry_no.to_string()),
            entry_date: NaiveDate::from_ymd_opt(2025, 1, day),
            account_code: Some(account.to_string()),
            debit: Some(debit),
            credit: Some(credit),
            description: description.map(str::to_string),
            ..NormalizedRow::default()
        }
    }

    #[test]
    fn groups_balanced_entry_with_distinct_descriptions() {
        let rows = vec![
            row(2, "1", 15, "1001", dec!(1000), dec!(0), Some("Salaries")),
            row(3, "1", 15, "2001", dec!(0), dec!(1000), Some(" Salaries ")),
            row(4, "1", 15, "2001", dec!(0), dec!(0), Some("Bank")),
            row(5, "1", 15, "2001", dec!(0), dec!(0), Some("Bank")),
        ];
        let output = group_entries(&rows, UnbalancedStrategy::Fail, None);
        assert!(output.is_ok());
        if let Ok(output) = output {
            assert_eq!(output.headers.len(), 1);
            let header = &output.headers[0];
            assert_eq!(header.entry_key, "1_2025-01-15");
            assert_eq!(header.total_debit, dec!(1000));
            assert_eq!(header.total_credit, dec!(1000));
            assert_eq!(header.line_count, 2);
            assert_eq!(header.description.as_deref(), Some("Salaries"));
            assert_eq!(header.fiscal_year, 2025);
            assert_eq!(header.month, 1);
            assert_eq!(output.lines.len(), 2);
            assert_eq!(output.lines[1].position, 2);
            assert_eq!(output.row_entries.get(&4).map(String::as_str), Some("1_2025-01-15"));
        }
    }

    #[test]
    fn residue_of_one_cent_is_balanced() {
        let rows = vec![
            row(2, "5", 1, "1", dec!(100.01), dec!(0), None),
            row(3, "5", 1, "2", dec!(0), dec!(100.00), None),
            row(4, "6", 1, "1", dec!(100.0101), dec!(0), None),
            row(5, "6", 1, "2", dec!(0), dec!(100.00), None),
        ];
        let output = group_entries(&rows, UnbalancedStrategy::Skip, None);
        assert!(output.is_ok());
        if let Ok(output) = output {
            assert_eq!(output.headers.len(), 1);
            assert_eq!(output.headers[0].entry_no, "5");
            assert_eq!(output.balance.unbalanced.len(), 1);
            assert_eq!(output.balance.unbalanced[0].entry_no, "6");
        }
    }

    #[test]
    fn skip_removes_unbalanced_entry_and_lists_it() {
        let rows = vec![
            row(2, "1", 15, "1001", dec!(1000), dec!(0), None),
            row(3, "1", 15, "2001", dec!(0), dec!(1000), None),
            row(4, "2", 16, "1001", dec!(500), dec!(0), None),
        ];
        let output = group_entries(&rows, UnbalancedStrategy::Skip, None);
        assert!(output.is_ok());
        if let Ok(output) = output {
            assert_eq!(output.headers.len(), 1);
            assert_eq!(output.lines.len(), 2);
            assert_eq!(output.balance.entries_total, 2);
            assert_eq!(output.balance.unbalanced[0].entry_key, entry_key("2", NaiveDate::from_ymd_opt(2025, 1, 16).unwrap_or_default()));
            assert_eq!(output.balance.unbalanced[0].residue, dec!(500));
            assert_eq!(output.balance.unbalanced[0].action, "skipped");
        }
    }

    #[test]
    fn auto_balance_appends_suspense_line_on_deficient_side() {
        let rows = vec![
            row(2, "3", 17, "1001", dec!(600), dec!(0), None),
            row(3, "3", 17, "2001", dec!(0), dec!(500), None),
        ];
        let output = group_entries(&rows, UnbalancedStrategy::AutoBalance, Some("suspense-id"));
        assert!(output.is_ok());
        if let Ok(output) = output {
            assert_eq!(output.lines.len(), 3);
            let synthetic = &output.lines[2];
            assert_eq!(synthetic.account_id.as_deref(), Some("suspense-id"));
            assert_eq!(synthetic.credit, dec!(100));
            assert_eq!(synthetic.debit, dec!(0));
            assert_eq!(synthetic.source_row, None);
            assert_eq!(output.headers[0].total_debit, dec!(600));
            assert_eq!(output.headers[0].total_credit, dec!(600));
            assert!(output.headers[0].is_balanced());
            assert_eq!(output.balance.unbalanced[0].action, "auto_balanced");
        }
    }

    #[test]
    fn auto_balance_without_suspense_account_is_unavailable() {
        let rows = vec![row(2, "3", 17, "1001", dec!(600), dec!(0), None)];
        let output = group_entries(&rows, UnbalancedStrategy::AutoBalance, None);
        assert!(output.is_err());
        if let Err(error) = output {
            assert_eq!(error.code, "suspense_account_unavailable");
        }
    }

    #[test]
    fn header_period_comes_from_first_row_and_flags_conflicts() {
        let mut first = row(2, "9", 15, "1", dec!(10), dec!(0), None);
        first.fiscal_year = Some(2024);
        first.month = Some(12);
        let mut second = row(3, "9", 15, "2", dec!(0), dec!(10), None);
        second.month = Some(1);
        let output = group_entries(&[first, second], UnbalancedStrategy::Fail, None);
        assert!(output.is_ok());
        if let Ok(output) = output {
            assert_eq!(output.headers[0].fiscal_year, 2024);
            assert_eq!(output.headers[0].month, 12);
            assert_eq!(output.headers[0].period_conflicts, vec![3]);
        }
    }
}

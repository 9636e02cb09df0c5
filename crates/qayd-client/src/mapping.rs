//! Declarative column mapping shared by the reader, normaliser and validator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    FiscalYear,
    Month,
    EntryNo,
    EntryDate,
    AccountCode,
    ClassificationCode,
    ProjectCode,
    WorkAnalysisCode,
    SubTreeCode,
    Debit,
    Credit,
    Description,
    Notes,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 13] = [
        Self::FiscalYear,
        Self::Month,
        Self::EntryNo,
        Self::EntryDate,
        Self::AccountCode,
        Self::ClassificationCode,
        Self::ProjectCode,
        Self::WorkAnalysisCode,
        Self::SubTreeCode,
        Self::Debit,
        Self::Credit,
        Self::Description,
        Self::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiscalYear => "fiscal_year",
            Self::Month => "month",
            Self::EntryNo => "entry_no",
            Self::EntryDate => "entry_date",
            Self::AccountCode => "account_code",
            Self::ClassificationCode => "classification_code",
            Self::ProjectCode => "project_code",
            Self::WorkAnalysisCode => "work_analysis_code",
            Self::SubTreeCode => "sub_tree_code",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Description => "description",
            Self::Notes => "notes",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == value.trim())
    }

    /// Code fields are compared as identifiers, so they get compatibility folding.
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            Self::EntryNo
                | Self::AccountCode
                | Self::ClassificationCode
                | Self::ProjectCode
                | Self::WorkAnalysisCode
                | Self::SubTreeCode
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredType {
    Integer,
    Decimal,
    Date,
    String,
}

impl DeclaredType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "integer" => Some(Self::Integer),
            "decimal" => Some(Self::Decimal),
            "date" => Some(Self::Date),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::String => "string",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingEntry {
    pub source_header: String,
    pub canonical: CanonicalField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
    pub declared_type: DeclaredType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MappingCsvRow {
    source_header: String,
    canonical_name: String,
    #[serde(default)]
    target_table: String,
    #[serde(default)]
    target_column: String,
    declared_type: String,
    #[serde(default)]
    required: String,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Clone)]
pub struct ColumnMapping {
    entries: Vec<MappingEntry>,
    by_header: BTreeMap<String, usize>,
}

const DEFAULT_MAPPING: [(&str, &str, CanonicalField, &str, &str, DeclaredType, bool); 13] = [
    ("السنة المالية", "Fiscal Year", CanonicalField::FiscalYear, "transactions", "fiscal_year", DeclaredType::Integer, false),
    ("الشهر", "Month", CanonicalField::Month, "transactions", "month", DeclaredType::Integer, false),
    ("رقم القيد", "Entry No", CanonicalField::EntryNo, "transactions", "reference_number", DeclaredType::String, true),
    ("تاريخ القيد", "Entry Date", CanonicalField::EntryDate, "transactions", "entry_date", DeclaredType::Date, true),
    ("رمز الحساب", "Account Code", CanonicalField::AccountCode, "transaction_lines", "account_id", DeclaredType::String, true),
    ("رمز التصنيف", "Classification Code", CanonicalField::ClassificationCode, "transaction_lines", "classification_id", DeclaredType::String, false),
    ("رمز المشروع", "Project Code", CanonicalField::ProjectCode, "transaction_lines", "project_id", DeclaredType::String, false),
    ("رمز تحليل العمل", "Work Analysis Code", CanonicalField::WorkAnalysisCode, "transaction_lines", "work_analysis_id", DeclaredType::String, false),
    ("رمز الشجرة الفرعية", "Sub Tree Code", CanonicalField::SubTreeCode, "transaction_lines", "sub_tree_id", DeclaredType::String, false),
    ("مدين", "Debit", CanonicalField::Debit, "transaction_lines", "debit_amount", DeclaredType::Decimal, true),
    ("دائن", "Credit", CanonicalField::Credit, "transaction_lines", "credit_amount", DeclaredType::Decimal, true),
    ("البيان", "Description", CanonicalField::Description, "transaction_lines", "description", DeclaredType::String, false),
    ("ملاحظات", "Notes", CanonicalField::Notes, "", "", DeclaredType::String, false),
];

impl ColumnMapping {
    pub fn default_bilingual() -> ClientResult<Self> {
        let mut entries = Vec::with_capacity(DEFAULT_MAPPING.len() * 2);
        for (arabic, english, canonical, table, column, declared_type, required) in DEFAULT_MAPPING
        {
            for source_header in [arabic, english] {
                entries.push(MappingEntry {
                    source_header: source_header.to_string(),
                    canonical,
                    target_table: non_empty(table),
                    target_column: non_empty(column),
                    declared_type,
                    required,
                    notes: None,
                });
            }
        }
        Self::from_entries(entries)
    }

    pub fn load(path: &Path) -> ClientResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Fields)
            .from_path(path)
            .map_err(|error| ClientError::mapping_file_unreadable(path, &error.to_string()))?;

        let mut entries = Vec::new();
        for (index, row) in reader.deserialize::<MappingCsvRow>().enumerate() {
            let line = index + 2;
            let row = row.map_err(|error| {
                ClientError::invalid_mapping(&format!("line {line}: {error}"))
            })?;
            let canonical = CanonicalField::parse(&row.canonical_name).ok_or_else(|| {
                ClientError::invalid_mapping(&format!(
                    "line {line}: unknown canonical name `{}`",
                    row.canonical_name
                ))
            })?;
            let declared_type = DeclaredType::parse(&row.declared_type).ok_or_else(|| {
                ClientError::invalid_mapping(&format!(
                    "line {line}: unknown declared type `{}`",
                    row.declared_type
                ))
            })?;
            let required = match row.required.to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" => true,
                "no" | "n" | "false" | "" => false,
                other => {
                    return Err(ClientError::invalid_mapping(&format!(
                        "line {line}: required must be yes or no, got `{other}`"
                    )));
                }
            };
            entries.push(MappingEntry {
                source_header: row.source_header,
                canonical,
                target_table: non_empty(&row.target_table),
                target_column: non_empty(&row.target_column),
                declared_type,
                required,
                notes: non_empty(&row.notes),
            });
        }

        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<MappingEntry>) -> ClientResult<Self> {
        let mut by_header = BTreeMap::new();
        let mut types: BTreeMap<CanonicalField, DeclaredType> = BTreeMap::new();

        for (index, entry) in entries.iter().enumerate() {
            let key = header_key(&entry.source_header);
            if key.is_empty() {
                return Err(ClientError::invalid_mapping("a source header is empty"));
            }
            if by_header.insert(key, index).is_some() {
                return Err(ClientError::invalid_mapping(&format!(
                    "source header `{}` is mapped twice",
                    entry.source_header
                )));
            }
            if let Some(existing) = types.insert(entry.canonical, entry.declared_type)
                && existing != entry.declared_type
            {
                return Err(ClientError::invalid_mapping(&format!(
                    "`{}` is declared both as {} and {}",
                    entry.canonical.as_str(),
                    existing.as_str(),
                    entry.declared_type.as_str()
                )));
            }
            if entry.canonical == CanonicalField::Notes
                && (entry.target_table.is_some() || entry.target_column.is_some())
            {
                return Err(ClientError::invalid_mapping(&format!(
                    "`{}` maps notes to a target column; notes are diagnostic only and line descriptions come from `description`",
                    entry.source_header
                )));
            }
            if entry.target_table.is_some() != entry.target_column.is_some() {
                return Err(ClientError::invalid_mapping(&format!(
                    "`{}` must name both a target table and a target column, or neither",
                    entry.source_header
                )));
            }
        }

        Ok(Self { entries, by_header })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Finds the entry for a sheet header; matching is exact after trimming.
    pub fn lookup_header(&self, header: &str) -> Option<&MappingEntry> {
        self.by_header
            .get(&header_key(header))
            .and_then(|index| self.entries.get(*index))
    }

    pub fn declared_type(&self, field: CanonicalField) -> DeclaredType {
        self.entries
            .iter()
            .find(|entry| entry.canonical == field)
            .map(|entry| entry.declared_type)
            .unwrap_or(DeclaredType::String)
    }

    pub fn required_fields(&self) -> BTreeSet<CanonicalField> {
        self.entries
            .iter()
            .filter(|entry| entry.required)
            .map(|entry| entry.canonical)
            .collect()
    }

    pub fn aliases(&self, field: CanonicalField) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.canonical == field)
            .map(|entry| entry.source_header.as_str())
            .collect()
    }

    /// Distinct (field, table, column) targets, in mapping order.
    pub fn targets(&self) -> Vec<(CanonicalField, &str, &str)> {
        let mut seen = BTreeSet::new();
        let mut output = Vec::new();
        for entry in &self.entries {
            if let (Some(table), Some(column)) = (&entry.target_table, &entry.target_column)
                && seen.insert((entry.canonical, table.as_str(), column.as_str()))
            {
                output.push((entry.canonical, table.as_str(), column.as_str()));
            }
        }
        output
    }
}

pub fn header_key(header: &str) -> String {
    header.trim().nfc().collect()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{CanonicalField, ColumnMapping, DeclaredType};

    fn write_mapping(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new();
        assert!(file.is_ok());
        let mut file = match file {
            Ok(file) => file,
            Err(error) => panic!("temp file should open: {error}"),
        };
        assert!(file.write_all(content.as_bytes()).is_ok());
        file
    }

    #[test]
    fn default_mapping_covers_both_languages() {
        let mapping = ColumnMapping::default_bilingual();
        assert!(mapping.is_ok());
        if let Ok(mapping) = mapping {
            assert_eq!(
                mapping.lookup_header(" مدين ").map(|entry| entry.canonical),
                Some(CanonicalField::Debit)
            );
            assert_eq!(
                mapping.lookup_header("Debit").map(|entry| entry.canonical),
                Some(CanonicalField::Debit)
            );
            assert!(mapping.lookup_header("debit").is_none());
            assert_eq!(mapping.declared_type(CanonicalField::Debit), DeclaredType::Decimal);
            assert!(
                mapping
                    .required_fields()
                    .contains(&CanonicalField::AccountCode)
            );
        }
    }

    #[test]
    fn loads_csv_mapping() {
        let file = write_mapping(
            "source_header,canonical_name,target_table,target_column,declared_type,required,notes\n\
             Ref,entry_no,transactions,reference_number,string,yes,\n\
             Day,entry_date,transactions,entry_date,date,yes,\n\
             Remark,notes,,,string,no,kept for review\n",
        );
        let mapping = ColumnMapping::load(file.path());
        assert!(mapping.is_ok());
        if let Ok(mapping) = mapping {
            assert_eq!(mapping.entries().len(), 3);
            assert_eq!(mapping.targets().len(), 2);
        }
    }

    #[test]
    fn rejects_notes_mapped_to_a_target() {
        let file = write_mapping(
            "source_header,canonical_name,target_table,target_column,declared_type,required,notes\n\
             Notes,notes,transaction_lines,description,string,no,\n",
        );
        let mapping = ColumnMapping::load(file.path());
        assert!(mapping.is_err());
        if let Err(error) = mapping {
            assert_eq!(error.code, "invalid_mapping");
        }
    }

    #[test]
    fn rejects_unknown_canonical_and_conflicting_types() {
        let unknown = write_mapping(
            "source_header,canonical_name,target_table,target_column,declared_type,required,notes\n\
             Amount,amount,transaction_lines,debit_amount,decimal,yes,\n",
        );
        assert!(ColumnMapping::load(unknown.path()).is_err());

        let conflicting = write_mapping(
            "source_header,canonical_name,target_table,target_column,declared_type,required,notes\n\
             Debit,debit,transaction_lines,debit_amount,decimal,yes,\n\
             مدين,debit,transaction_lines,debit_amount,integer,yes,\n",
        );
        assert!(ColumnMapping::load(conflicting.path()).is_err());
    }

    #[test]
    fn missing_mapping_file_is_a_configuration_error() {
        let result = ColumnMapping::load(std::path::Path::new("/nonexistent/mapping.csv"));
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "mapping_file_unreadable");
        }
    }
}

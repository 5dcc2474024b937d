//! Typed access to clinical input rows.
//!
//! A [`ClinicalTable`] resolves the position of every [`RowField`] once; each [`ClinicalRow`]
//! then answers `text(field)` with the trimmed, non-blank cell value or `None`.

use codebridge_ingest::{RejectedRow, Table, TableRow};

/// The attributes a clinical input row can carry. Other columns are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowField {
    PatientId,
    FirstName,
    LastName,
    Gender,
    BirthDate,
    Phone,
    Email,
    Address,
    City,
    State,
    PostalCode,
    Country,
    ConditionName,
    SnomedCode,
    OnsetDate,
    ObservationName,
    LoincCode,
    Value,
    Unit,
    UnitCode,
    ObservationDate,
}

impl RowField {
    pub const ALL: [RowField; 21] = [
        RowField::PatientId,
        RowField::FirstName,
        RowField::LastName,
        RowField::Gender,
        RowField::BirthDate,
        RowField::Phone,
        RowField::Email,
        RowField::Address,
        RowField::City,
        RowField::State,
        RowField::PostalCode,
        RowField::Country,
        RowField::ConditionName,
        RowField::SnomedCode,
        RowField::OnsetDate,
        RowField::ObservationName,
        RowField::LoincCode,
        RowField::Value,
        RowField::Unit,
        RowField::UnitCode,
        RowField::ObservationDate,
    ];

    /// Columns whose presence makes the table carry measurements.
    pub const MEASUREMENT_COLUMNS: [RowField; 3] =
        [RowField::ObservationName, RowField::Value, RowField::Unit];

    /// Columns whose presence makes the table carry conditions.
    pub const CONDITION_COLUMNS: [RowField; 2] = [RowField::ConditionName, RowField::SnomedCode];

    /// Canonical column name.
    pub fn column_name(self) -> &'static str {
        match self {
            RowField::PatientId => "patient_id",
            RowField::FirstName => "first_name",
            RowField::LastName => "last_name",
            RowField::Gender => "gender",
            RowField::BirthDate => "birth_date",
            RowField::Phone => "phone",
            RowField::Email => "email",
            RowField::Address => "address",
            RowField::City => "city",
            RowField::State => "state",
            RowField::PostalCode => "postal_code",
            RowField::Country => "country",
            RowField::ConditionName => "condition_name",
            RowField::SnomedCode => "snomed_code",
            RowField::OnsetDate => "onset_date",
            RowField::ObservationName => "observation_name",
            RowField::LoincCode => "loinc_code",
            RowField::Value => "value",
            RowField::Unit => "unit",
            RowField::UnitCode => "unit_code",
            RowField::ObservationDate => "observation_date",
        }
    }

    fn position(self) -> usize {
        RowField::ALL
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default()
    }
}

/// A table of clinical input rows with field positions resolved.
#[derive(Clone, Debug)]
pub struct ClinicalTable {
    table: Table,
    columns: [Option<usize>; 21],
}

impl ClinicalTable {
    pub fn new(table: Table) -> Self {
        let columns = RowField::ALL.map(|f| table.column_index(f.column_name()));
        Self { table, columns }
    }

    /// True if the source has `field` as a column, whatever the cell values.
    pub fn has_column(&self, field: RowField) -> bool {
        self.columns[field.position()].is_some()
    }

    pub fn has_measurement_columns(&self) -> bool {
        RowField::MEASUREMENT_COLUMNS
            .iter()
            .any(|f| self.has_column(*f))
    }

    pub fn has_condition_columns(&self) -> bool {
        RowField::CONDITION_COLUMNS
            .iter()
            .any(|f| self.has_column(*f))
    }

    /// Readable rows, in source order.
    pub fn rows(&self) -> impl Iterator<Item = ClinicalRow<'_>> {
        self.table.rows().iter().map(move |row| ClinicalRow {
            row,
            columns: &self.columns,
        })
    }

    /// Rows the reader could not parse.
    pub fn rejected(&self) -> &[RejectedRow] {
        self.table.rejected()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// One clinical input row.
#[derive(Clone, Copy, Debug)]
pub struct ClinicalRow<'a> {
    row: &'a TableRow,
    columns: &'a [Option<usize>; 21],
}

impl<'a> ClinicalRow<'a> {
    /// 1-based position in the source.
    pub fn index(&self) -> usize {
        self.row.index()
    }

    /// Present-and-non-blank value of `field`.
    pub fn text(&self, field: RowField) -> Option<&'a str> {
        self.columns[field.position()].and_then(|c| self.row.cell(c))
    }

    /// Owned copy of [`ClinicalRow::text`].
    pub fn owned(&self, field: RowField) -> Option<String> {
        self.text(field).map(str::to_string)
    }

    /// True when every cell of the underlying row is blank, recognised or not.
    pub fn is_blank(&self) -> bool {
        self.row.is_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_fields_by_normalised_header() {
        let mut table = Table::new(["First Name", "GENDER", "Observation Name", "notes"]);
        table.push_cells([Some("Asha"), Some(" F "), None, Some("ignored")]);
        let clinical = ClinicalTable::new(table);

        assert!(clinical.has_column(RowField::FirstName));
        assert!(clinical.has_measurement_columns());
        assert!(!clinical.has_condition_columns());

        let row = clinical.rows().next().expect("one row");
        assert_eq!(row.index(), 1);
        assert_eq!(row.text(RowField::FirstName), Some("Asha"));
        assert_eq!(row.text(RowField::Gender), Some("F"));
        assert_eq!(row.text(RowField::ObservationName), None);
        assert_eq!(row.text(RowField::LastName), None);
    }

    #[test]
    fn field_positions_are_distinct() {
        for (i, field) in RowField::ALL.iter().enumerate() {
            assert_eq!(field.position(), i);
        }
    }

    #[test]
    fn blank_row_is_reported() {
        let mut table = Table::new(["first_name", "other"]);
        table.push_cells([None::<&str>, Some("  ")]);
        let clinical = ClinicalTable::new(table);
        assert!(clinical.rows().all(|r| r.is_blank()));
    }
}

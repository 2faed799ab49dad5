//! Decoders from raw service payloads to domain records.
//!
//! The accounts, patients and widgets services answer with positional rows (`[id, email, ...]`)
//! straight from their SQL queries; the dataset service answers with a keyed mapping. Each
//! `decode_*` function validates the shape and reports which field failed. The `map_to_*`
//! variants keep the fail-closed contract: `None` means "skip this record".
//!
//! Accounts and doctors are strict (exact row length). Patients and widgets are permissive:
//! missing or `null` elements become empty strings.

use crate::constants::{ACCOUNT_ROW_LEN, DOCTOR_ROW_LEN, WIDGETS_ROW_LEN};
use crate::records::{
    Account, AccountIdentity, DecisionDataset, DoctorProfile, ModelKind, ModelRef, Patient, Role,
    Widgets,
};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Why a payload could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("{record}: expected {expected} fields, got {actual}")]
    Arity {
        record: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{record}.{field}: {reason}")]
    Field {
        record: &'static str,
        field: String,
        reason: String,
    },
}

pub type MapResult<T> = std::result::Result<T, MapError>;

// ============================================================================
// Field helpers
// ============================================================================

fn field_error(record: &'static str, field: &str, reason: impl Into<String>) -> MapError {
    MapError::Field {
        record,
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Integer at `index`; integral floats and numeric strings are accepted.
fn int_at(row: &[Value], index: usize, record: &'static str, field: &str) -> MapResult<i64> {
    match row.get(index) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| field_error(record, field, format!("not an integer: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| field_error(record, field, format!("not an integer: {s:?}"))),
        Some(other) => Err(field_error(record, field, format!("expected integer, got {other}"))),
        None => Err(field_error(record, field, "missing")),
    }
}

/// Required string at `index`.
fn str_at(row: &[Value], index: usize, record: &'static str, field: &str) -> MapResult<String> {
    match row.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(field_error(record, field, format!("expected string, got {other}"))),
        None => Err(field_error(record, field, "missing")),
    }
}

/// Boolean at `index`; `0`/`1` are accepted for database drivers without a bool type.
fn bool_at(row: &[Value], index: usize, record: &'static str, field: &str) -> MapResult<bool> {
    match row.get(index) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) if n.as_i64() == Some(0) => Ok(false),
        Some(Value::Number(n)) if n.as_i64() == Some(1) => Ok(true),
        Some(other) => Err(field_error(record, field, format!("expected boolean, got {other}"))),
        None => Err(field_error(record, field, "missing")),
    }
}

/// Scalar at `index` rendered as text; missing and `null` become `""`.
fn text_at(row: &[Value], index: usize, record: &'static str, field: &str) -> MapResult<String> {
    match row.get(index) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(field_error(
            record,
            field,
            format!("expected a scalar, got {other}"),
        )),
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Decode an account row `[id, email, name, password, role]`.
pub fn decode_account(row: &[Value]) -> MapResult<Account> {
    const RECORD: &str = "account";

    if row.len() != ACCOUNT_ROW_LEN {
        return Err(MapError::Arity {
            record: RECORD,
            expected: ACCOUNT_ROW_LEN,
            actual: row.len(),
        });
    }

    Ok(Account {
        id: int_at(row, 0, RECORD, "id")?,
        email: str_at(row, 1, RECORD, "email")?,
        name: str_at(row, 2, RECORD, "name")?,
        password: str_at(row, 3, RECORD, "password")?,
        role: Role::from_code(int_at(row, 4, RECORD, "role")?),
    })
}

pub fn map_to_account(row: &[Value]) -> Option<Account> {
    decode_account(row).ok()
}

// ============================================================================
// Doctors
// ============================================================================

/// Decode a doctor row: the user columns `[id, name, imagePath, email, password, role,
/// isActive]` followed by `[rank, phoneNumber, numberOfPatients, active, dateOfBirth]`.
///
/// The user's image, password and `isActive` flag are not kept.
pub fn decode_doctor(row: &[Value]) -> MapResult<DoctorProfile> {
    const RECORD: &str = "doctor";

    if row.len() != DOCTOR_ROW_LEN {
        return Err(MapError::Arity {
            record: RECORD,
            expected: DOCTOR_ROW_LEN,
            actual: row.len(),
        });
    }

    let patients = int_at(row, 9, RECORD, "numberOfPatients")?;
    let number_of_patients = u32::try_from(patients).map_err(|_| {
        field_error(RECORD, "numberOfPatients", format!("out of range: {patients}"))
    })?;

    Ok(DoctorProfile {
        account: AccountIdentity {
            id: int_at(row, 0, RECORD, "id")?,
            name: str_at(row, 1, RECORD, "name")?,
            email: str_at(row, 3, RECORD, "email")?,
            role: Role::from_code(int_at(row, 5, RECORD, "role")?),
        },
        rank: text_at(row, 7, RECORD, "rank")?,
        phone_number: text_at(row, 8, RECORD, "phoneNumber")?,
        number_of_patients,
        active: bool_at(row, 10, RECORD, "active")?,
        date_of_birth: text_at(row, 11, RECORD, "dateOfBirth")?,
    })
}

// ============================================================================
// Patients
// ============================================================================

/// Decode a patients-table row. Index 0 is the row id and is not kept.
///
/// Only email (1), phone number (2), name (3), age (4) and image path (5) are carried by the
/// row; every clinical field starts empty and is filled in on the form.
pub fn decode_patient(row: &[Value]) -> MapResult<Patient> {
    const RECORD: &str = "patient";

    Ok(Patient {
        email: text_at(row, 1, RECORD, "email")?,
        phone_number: text_at(row, 2, RECORD, "phoneNumber")?,
        name: text_at(row, 3, RECORD, "name")?,
        age: text_at(row, 4, RECORD, "age")?,
        image_path: text_at(row, 5, RECORD, "imagePath")?,
        ..Patient::blank()
    })
}

pub fn map_to_patient(row: &[Value]) -> Option<Patient> {
    decode_patient(row).ok()
}

// ============================================================================
// Widgets
// ============================================================================

/// Decode the dashboard counters row. Extra trailing elements are ignored.
pub fn decode_widgets(row: &[Value]) -> MapResult<Widgets> {
    const RECORD: &str = "widgets";
    const FIELDS: [&str; WIDGETS_ROW_LEN] = [
        "totalUsers",
        "activeUsers",
        "nonActiveUsers",
        "totalAdmins",
        "totalDoctors",
        "totalPatients",
        "totalAlgorithms",
        "rankOfSuccess",
        "totalUsages",
        "labeledModels",
        "unlabeledModels",
    ];

    let mut values = Vec::with_capacity(WIDGETS_ROW_LEN);
    for (index, field) in FIELDS.iter().enumerate() {
        values.push(text_at(row, index, RECORD, field)?);
    }
    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();

    Ok(Widgets {
        total_users: next(),
        active_users: next(),
        non_active_users: next(),
        total_admins: next(),
        total_doctors: next(),
        total_patients: next(),
        total_algorithms: next(),
        rank_of_success: next(),
        total_usages: next(),
        labeled_models: next(),
        unlabeled_models: next(),
    })
}

pub fn map_to_widgets(row: &[Value]) -> Option<Widgets> {
    decode_widgets(row).ok()
}

// ============================================================================
// Datasets
// ============================================================================

#[derive(Deserialize)]
struct DatasetInfoWire {
    dataset_name: String,
    number_of_lines: u64,
    relative_weight: f64,
    #[serde(default)]
    models: Vec<ModelWire>,
}

#[derive(Deserialize)]
struct ModelWire {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Decode one entry of the dataset service's keyed mapping.
pub fn decode_dataset(key: &str, value: &Value) -> MapResult<DecisionDataset> {
    let wire = DatasetInfoWire::deserialize(value)
        .map_err(|e| field_error("dataset", key, e.to_string()))?;

    Ok(DecisionDataset {
        key: key.to_string(),
        name: wire.dataset_name,
        number_of_lines: wire.number_of_lines,
        relative_weight: wire.relative_weight,
        models: wire
            .models
            .into_iter()
            .map(|m| ModelRef {
                name: m.name,
                kind: ModelKind::from_wire(&m.kind),
            })
            .collect(),
    })
}

/// Decode every dataset in service order, skipping malformed entries.
pub fn decode_datasets(datasets: &Map<String, Value>) -> Vec<DecisionDataset> {
    datasets
        .iter()
        .filter_map(|(key, value)| match decode_dataset(key, value) {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                tracing::warn!("skipping dataset: {e}");
                None
            }
        })
        .collect()
}

/// Apply `decode` to every row, logging and skipping rows that do not map.
pub fn map_rows<T>(rows: &[Vec<Value>], decode: fn(&[Value]) -> MapResult<T>) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("skipping record: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Vec<Value> {
        value.as_array().cloned().unwrap()
    }

    #[test]
    fn account_fields_follow_wire_order() {
        let account =
            map_to_account(&row(json!([7, "a@b.org", "Alice", "pw", 2]))).expect("should map");
        assert_eq!(account.id, 7);
        assert_eq!(account.email, "a@b.org");
        assert_eq!(account.name, "Alice");
        assert_eq!(account.password, "pw");
        assert_eq!(account.role, Role::Admin);
    }

    #[test]
    fn account_requires_exactly_five_elements() {
        for bad in [
            json!([]),
            json!([1, "a@b.org", "A", "pw"]),
            json!([1, "a@b.org", "A", "pw", 1, true]),
        ] {
            let bad = row(bad);
            assert!(map_to_account(&bad).is_none());
            assert!(matches!(
                decode_account(&bad),
                Err(MapError::Arity { expected: 5, .. })
            ));
        }
    }

    #[test]
    fn account_reports_failing_field() {
        let err = decode_account(&row(json!(["x", "a@b.org", "A", "pw", 1]))).unwrap_err();
        assert_eq!(
            err,
            MapError::Field {
                record: "account",
                field: "id".into(),
                reason: "not an integer: \"x\"".into(),
            }
        );

        let err = decode_account(&row(json!([1, null, "A", "pw", 1]))).unwrap_err();
        assert!(err.to_string().starts_with("account.email"));
    }

    #[test]
    fn doctor_row_keeps_identity_and_practice_fields() {
        let doctor = decode_doctor(&row(json!([
            3, "Dr D", "d.jpg", "d@x.org", "pw", 1, true,
            "Senior", "555-7", 12, 1, "1970-01-01"
        ])))
        .unwrap();
        assert_eq!(
            doctor.account,
            AccountIdentity {
                id: 3,
                name: "Dr D".into(),
                email: "d@x.org".into(),
                role: Role::Doctor,
            }
        );
        assert_eq!(doctor.rank, "Senior");
        assert_eq!(doctor.phone_number, "555-7");
        assert_eq!(doctor.number_of_patients, 12);
        assert!(doctor.active);
        assert_eq!(doctor.date_of_birth, "1970-01-01");
    }

    #[test]
    fn doctor_rejects_short_rows_and_negative_counts() {
        assert!(matches!(
            decode_doctor(&row(json!([3, "Dr D", "d.jpg", "d@x.org", "pw", 1]))),
            Err(MapError::Arity { expected: 12, .. })
        ));

        let err = decode_doctor(&row(json!([
            3, "Dr D", null, "d@x.org", "pw", 1, true, "", "", -1, false, ""
        ])))
        .unwrap_err();
        assert!(err.to_string().starts_with("doctor.numberOfPatients"));
    }

    #[test]
    fn patient_defaults_missing_fields() {
        let patient =
            map_to_patient(&row(json!([3, "p@x.org", "555-1", "Bob", 42, "p@x.org.jpg"]))).unwrap();
        assert_eq!(patient.name, "Bob");
        assert_eq!(patient.email, "p@x.org");
        assert_eq!(patient.phone_number, "555-1");
        assert_eq!(patient.age, "42");
        assert_eq!(patient.image_path, "p@x.org.jpg");
        assert_eq!(patient.image, None);
        assert_eq!(patient.disease, "");

        let sparse = map_to_patient(&row(json!([3, null, "555"]))).unwrap();
        assert_eq!(sparse.email, "");
        assert_eq!(sparse.name, "");
        assert!(sparse.is_new());
    }

    #[test]
    fn widgets_fill_missing_with_empty_text() {
        let widgets = map_to_widgets(&row(json!([10, 8, 2, 1, 5, 40, 6, 3.5, null]))).unwrap();
        assert_eq!(widgets.total_users, "10");
        assert_eq!(widgets.rank_of_success, "3.5");
        assert_eq!(widgets.total_usages, "");
        assert_eq!(widgets.unlabeled_models, "");

        assert!(map_to_widgets(&row(json!([[1], 2]))).is_none());
    }

    #[test]
    fn datasets_keep_service_order_and_skip_bad_entries() {
        let payload = json!({
            "disease": {
                "dataset_name": "Disease Dataset",
                "relative_weight": 0.4,
                "number_of_lines": 1200,
                "models": [{"name": "RandomForest", "type": "Labeled"}]
            },
            "broken": {"dataset_name": "x"},
            "ckd": {
                "dataset_name": "Chronic Kidney Disease (CKD) Dataset",
                "relative_weight": 0.3,
                "number_of_lines": 400,
                "models": [{"name": "KMeans", "type": "Unlabeled"}]
            }
        });
        let datasets = decode_datasets(payload.as_object().unwrap());

        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].key, "disease");
        assert_eq!(datasets[0].models[0].kind, ModelKind::Labeled);
        assert_eq!(datasets[1].key, "ckd");
        assert_eq!(datasets[1].number_of_lines, 400);
    }

    #[test]
    fn map_rows_skips_unmappable_rows() {
        let rows = vec![
            row(json!([1, "a@b.org", "A", "pw", 1])),
            row(json!([2, "b@b.org"])),
            row(json!([3, "c@b.org", "C", "pw", 2])),
        ];
        let accounts = map_rows(&rows, decode_account);
        assert_eq!(accounts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3]);
    }
}

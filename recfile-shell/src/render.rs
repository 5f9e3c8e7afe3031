//! Text rendering of operation responses

use std::fmt;

use recfile_engine::operations::{OperationCode, OperationResponse, Reply};
use recfile_engine::{ErrorKind, Record, Slot};

/// `[key] label, attribute unit.`
pub struct RecordDisplay<'a> {
    pub record: &'a Record,
    pub unit: &'a str,
}

impl fmt::Display for RecordDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}, {} {}.",
            self.record.key, self.record.label, self.record.attribute, self.unit
        )
    }
}

/// Render a response as the lines shown to the user
pub fn render(response: &OperationResponse, unit: &str) -> Vec<String> {
    let key = response
        .key
        .map(|k| k.to_string())
        .unwrap_or_else(|| "-".to_string());

    match &response.result {
        Ok(Reply::Inserted { .. }) => vec![format!("inserted: {}", key)],
        Ok(Reply::Removed { .. }) => vec![format!("removed: {}", key)],
        Ok(Reply::Found(record)) => vec![RecordDisplay { record, unit }.to_string()],
        Ok(Reply::Listing { location, records }) => {
            let mut lines = Vec::with_capacity(records.len() + 1);
            lines.push(format!(
                "Location: {} -- Records: {}",
                location.display(),
                records.len()
            ));
            lines.extend(records.iter().map(|record| RecordDisplay { record, unit }.to_string()));
            lines
        }
        Ok(Reply::SlotMap { location, slots }) => {
            let mut lines = Vec::with_capacity(slots.len() + 1);
            lines.push(format!("Location: {} -- Slots: {}", location.display(), slots.len()));
            for (index, slot) in slots.iter().enumerate() {
                lines.push(match slot {
                    Slot::Occupied(record) => {
                        format!("{:>3}: {}", index, RecordDisplay { record, unit })
                    }
                    Slot::Empty => format!("{:>3}: empty", index),
                    Slot::Tombstoned => format!("{:>3}: *", index),
                });
            }
            lines
        }
        Ok(Reply::Stop) => Vec::new(),
        Err(e) => vec![match e.kind() {
            ErrorKind::KeyExists => format!("key already exists: {}", key),
            ErrorKind::KeyNotFound => format!("key not found: {}", key),
            ErrorKind::OutOfSpace => format!("insert failed, file full: {}", key),
            ErrorKind::InvalidOperation if response.operation == OperationCode::Unknown => {
                "unknown command".to_string()
            }
            ErrorKind::InvalidOperation => {
                format!("missing arguments for '{}'", response.operation.as_raw())
            }
            _ => format!("error: {}", e),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recfile_engine::StoreError;
    use std::path::PathBuf;

    fn response(operation: OperationCode, key: Option<u32>, result: Result<Reply, StoreError>) -> OperationResponse {
        OperationResponse { operation, key, result }
    }

    #[test]
    fn test_record_display() {
        let record = Record::new(0, "Roberto Carlos", 255);
        let shown = RecordDisplay { record: &record, unit: "years" }.to_string();
        assert_eq!(shown, "[0] Roberto Carlos, 255 years.");
    }

    #[test]
    fn test_acknowledgements() {
        let ok = response(OperationCode::Insert, Some(5), Ok(Reply::Inserted { key: 5, slot: 6 }));
        assert_eq!(render(&ok, "years"), vec!["inserted: 5"]);

        let dup = response(OperationCode::Insert, Some(0), Err(ErrorKind::KeyExists.into()));
        assert_eq!(render(&dup, "years"), vec!["key already exists: 0"]);

        let full = response(OperationCode::Insert, Some(11), Err(ErrorKind::OutOfSpace.into()));
        assert_eq!(render(&full, "years"), vec!["insert failed, file full: 11"]);

        let gone = response(OperationCode::Remove, Some(6), Err(ErrorKind::KeyNotFound.into()));
        assert_eq!(render(&gone, "years"), vec!["key not found: 6"]);

        let long = response(
            OperationCode::Insert,
            Some(2),
            Err(StoreError::FieldTooLong { field: "label", len: 29, max: 20 }),
        );
        assert_eq!(render(&long, "years"), vec!["error: label is 29 bytes, at most 20 allowed"]);
    }

    #[test]
    fn test_listing() {
        let listing = response(
            OperationCode::Print,
            None,
            Ok(Reply::Listing {
                location: PathBuf::from("data.bin"),
                records: vec![Record::new(2, "Pedro", 24), Record::new(4, "João Gabriel", 10)],
            }),
        );
        assert_eq!(
            render(&listing, "years"),
            vec![
                "Location: data.bin -- Records: 2",
                "[2] Pedro, 24 years.",
                "[4] João Gabriel, 10 years.",
            ]
        );
    }

    #[test]
    fn test_slot_map() {
        let map = response(
            OperationCode::Dump,
            None,
            Ok(Reply::SlotMap {
                location: PathBuf::from("data.bin"),
                slots: vec![Slot::Empty, Slot::Occupied(Record::new(0, "R", 1)), Slot::Tombstoned],
            }),
        );
        assert_eq!(
            render(&map, "kg"),
            vec![
                "Location: data.bin -- Slots: 3",
                "  0: empty",
                "  1: [0] R, 1 kg.",
                "  2: *",
            ]
        );
    }

    #[test]
    fn test_invalid_operations() {
        let unknown = response(OperationCode::Unknown, None, Err(ErrorKind::InvalidOperation.into()));
        assert_eq!(render(&unknown, "years"), vec!["unknown command"]);

        let missing = response(OperationCode::Query, None, Err(ErrorKind::InvalidOperation.into()));
        assert_eq!(render(&missing, "years"), vec!["missing arguments for 'c'"]);

        let stop = response(OperationCode::Exit, None, Ok(Reply::Stop));
        assert!(render(&stop, "years").is_empty());
    }
}

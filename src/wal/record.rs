//! WAL record types: the tagged union of operations the log can carry.
//!
//! Per spec.md §3, a WAL record's optional fields are mutually exclusive by
//! kind. Internally this is a `WalOp` enum (one variant per kind); on disk it
//! serializes to the flat JSON object shape spec.md §6 prescribes so the wire
//! format stays exactly what recovery and tooling expect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checksum::compute_checksum;
use super::errors::{WalError, WalResult};

/// The eight record kinds carried by the log, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    Insert = 0,
    Update = 1,
    Replace = 2,
    Delete = 3,
    BatchInsert = 4,
    BatchUpdate = 5,
    Checkpoint = 6,
    Commit = 7,
}

impl RecordKind {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Insert),
            1 => Some(Self::Update),
            2 => Some(Self::Replace),
            3 => Some(Self::Delete),
            4 => Some(Self::BatchInsert),
            5 => Some(Self::BatchUpdate),
            6 => Some(Self::Checkpoint),
            7 => Some(Self::Commit),
            _ => None,
        }
    }
}

/// A single element of a `batch_update` operation list.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUpdateOp {
    pub id: String,
    pub updates: Value,
}

/// The operation a WAL record describes, independent of its position in the
/// log (LSN, timestamp, checksum are carried by [`WalRecord`]).
#[derive(Debug, Clone, PartialEq)]
pub enum WalOp {
    Insert {
        collection: String,
        document_id: String,
        document: Value,
    },
    Update {
        collection: String,
        document_id: String,
        updates: Value,
    },
    Replace {
        collection: String,
        document_id: String,
        document: Value,
    },
    Delete {
        collection: String,
        document_id: String,
    },
    BatchInsert {
        collection: String,
        documents: Vec<Value>,
    },
    BatchUpdate {
        collection: String,
        ops: Vec<BatchUpdateOp>,
    },
    /// Marks a checkpoint boundary. Not written by ordinary CRUD operations;
    /// reserved for tooling that wants an explicit in-log marker alongside
    /// the out-of-band checkpoint snapshot.
    Checkpoint { collection: String },
    /// A visibility barrier with no storage effect of its own.
    Commit { collection: String },
}

impl WalOp {
    pub fn kind(&self) -> RecordKind {
        match self {
            WalOp::Insert { .. } => RecordKind::Insert,
            WalOp::Update { .. } => RecordKind::Update,
            WalOp::Replace { .. } => RecordKind::Replace,
            WalOp::Delete { .. } => RecordKind::Delete,
            WalOp::BatchInsert { .. } => RecordKind::BatchInsert,
            WalOp::BatchUpdate { .. } => RecordKind::BatchUpdate,
            WalOp::Checkpoint { .. } => RecordKind::Checkpoint,
            WalOp::Commit { .. } => RecordKind::Commit,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            WalOp::Insert { collection, .. }
            | WalOp::Update { collection, .. }
            | WalOp::Replace { collection, .. }
            | WalOp::Delete { collection, .. }
            | WalOp::BatchInsert { collection, .. }
            | WalOp::BatchUpdate { collection, .. }
            | WalOp::Checkpoint { collection }
            | WalOp::Commit { collection } => collection,
        }
    }
}

/// A fully assigned, checksummed WAL record as it appears in a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct WalRecord {
    pub lsn: u64,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
    pub op: WalOp,
    pub checksum: u32,
}

/// The on-disk wire shape, per spec.md §6: one flat JSON object per line.
#[derive(Debug, Serialize, Deserialize)]
struct WalRecordWire {
    #[serde(rename = "type")]
    kind: u8,
    timestamp: i64,
    collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updates: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_ops: Option<Vec<BatchOpWire>>,
    lsn: u64,
    checksum: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct BatchOpWire {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updates: Option<Value>,
}

impl WalRecord {
    /// Builds the wire struct for this record with a given checksum value
    /// (zero, when computing the checksum; the real value, when serializing).
    fn to_wire(&self, checksum: u32) -> WalRecordWire {
        let collection = self.op.collection().to_string();
        let mut document_id = None;
        let mut document = None;
        let mut updates = None;
        let mut batch_ops = None;

        match &self.op {
            WalOp::Insert { document_id: id, document: doc, .. } => {
                document_id = Some(id.clone());
                document = Some(doc.clone());
            }
            WalOp::Replace { document_id: id, document: doc, .. } => {
                document_id = Some(id.clone());
                document = Some(doc.clone());
            }
            WalOp::Update { document_id: id, updates: u, .. } => {
                document_id = Some(id.clone());
                updates = Some(u.clone());
            }
            WalOp::Delete { document_id: id, .. } => {
                document_id = Some(id.clone());
            }
            WalOp::BatchInsert { documents, .. } => {
                batch_ops = Some(
                    documents
                        .iter()
                        .map(|d| BatchOpWire {
                            id: d.get("_id").and_then(Value::as_str).unwrap_or_default().to_string(),
                            document: Some(d.clone()),
                            updates: None,
                        })
                        .collect(),
                );
            }
            WalOp::BatchUpdate { ops, .. } => {
                batch_ops = Some(
                    ops.iter()
                        .map(|o| BatchOpWire {
                            id: o.id.clone(),
                            document: None,
                            updates: Some(o.updates.clone()),
                        })
                        .collect(),
                );
            }
            WalOp::Checkpoint { .. } | WalOp::Commit { .. } => {}
        }

        WalRecordWire {
            kind: self.op.kind() as u8,
            timestamp: self.timestamp,
            collection,
            document_id,
            document,
            updates,
            batch_ops,
            lsn: self.lsn,
            checksum,
        }
    }

    /// Serializes this record as a single line (JSON object + `\n`), with its
    /// real checksum filled in.
    pub fn serialize_line(&self) -> String {
        let wire = self.to_wire(self.checksum);
        let mut line = serde_json::to_string(&wire).expect("WalRecordWire always serializes");
        line.push('\n');
        line
    }

    /// Computes the checksum over this record with the checksum field
    /// zeroed, per spec.md §4.1.
    pub fn compute_checksum(lsn: u64, timestamp: i64, op: &WalOp) -> u32 {
        let probe = WalRecord {
            lsn,
            timestamp,
            op: op.clone(),
            checksum: 0,
        };
        let wire = probe.to_wire(0);
        let bytes = serde_json::to_vec(&wire).expect("WalRecordWire always serializes");
        compute_checksum(&bytes)
    }

    /// Parses and checksum-verifies a single wire line.
    pub fn from_wire_line(line: &str) -> WalResult<WalRecord> {
        let wire: WalRecordWire = serde_json::from_str(line)
            .map_err(|e| WalError::corrupt(format!("malformed WAL record JSON: {e}")))?;

        let kind = RecordKind::from_u8(wire.kind)
            .ok_or_else(|| WalError::corrupt(format!("unknown record type {}", wire.kind)))?;

        let op = Self::op_from_wire(kind, &wire)?;
        let expected = Self::compute_checksum(wire.lsn, wire.timestamp, &op);
        if expected != wire.checksum {
            return Err(WalError::corrupt(format!(
                "checksum mismatch at lsn {}: expected {}, found {}",
                wire.lsn, expected, wire.checksum
            )));
        }

        Ok(WalRecord {
            lsn: wire.lsn,
            timestamp: wire.timestamp,
            op,
            checksum: wire.checksum,
        })
    }

    fn op_from_wire(kind: RecordKind, wire: &WalRecordWire) -> WalResult<WalOp> {
        let missing = |field: &str| WalError::corrupt(format!("record missing field `{field}`"));
        let collection = wire.collection.clone();

        Ok(match kind {
            RecordKind::Insert => WalOp::Insert {
                collection,
                document_id: wire.document_id.clone().ok_or_else(|| missing("document_id"))?,
                document: wire.document.clone().ok_or_else(|| missing("document"))?,
            },
            RecordKind::Replace => WalOp::Replace {
                collection,
                document_id: wire.document_id.clone().ok_or_else(|| missing("document_id"))?,
                document: wire.document.clone().ok_or_else(|| missing("document"))?,
            },
            RecordKind::Update => WalOp::Update {
                collection,
                document_id: wire.document_id.clone().ok_or_else(|| missing("document_id"))?,
                updates: wire.updates.clone().ok_or_else(|| missing("updates"))?,
            },
            RecordKind::Delete => WalOp::Delete {
                collection,
                document_id: wire.document_id.clone().ok_or_else(|| missing("document_id"))?,
            },
            RecordKind::BatchInsert => {
                let batch = wire.batch_ops.clone().ok_or_else(|| missing("batch_ops"))?;
                WalOp::BatchInsert {
                    collection,
                    documents: batch
                        .into_iter()
                        .map(|o| o.document.ok_or_else(|| missing("batch_ops[].document")))
                        .collect::<WalResult<Vec<_>>>()?,
                }
            }
            RecordKind::BatchUpdate => {
                let batch = wire.batch_ops.clone().ok_or_else(|| missing("batch_ops"))?;
                WalOp::BatchUpdate {
                    collection,
                    ops: batch
                        .into_iter()
                        .map(|o| {
                            let updates = o.updates.ok_or_else(|| missing("batch_ops[].updates"))?;
                            Ok(BatchUpdateOp { id: o.id, updates })
                        })
                        .collect::<WalResult<Vec<_>>>()?,
                }
            }
            RecordKind::Checkpoint => WalOp::Checkpoint { collection },
            RecordKind::Commit => WalOp::Commit { collection },
        })
    }
}

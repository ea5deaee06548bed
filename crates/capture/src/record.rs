//! Synthetic change records and batch shaping.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use bytes::{BufMut, Bytes, BytesMut};

use contracts::AgentConfig;

/// What a record represents in the change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    TransactionBegin,
    Row,
    TransactionEnd,
}

impl RecordKind {
    /// Begin/end markers carry no row data; they only delimit batches.
    pub fn is_transaction_boundary(self) -> bool {
        matches!(self, Self::TransactionBegin | Self::TransactionEnd)
    }

    fn code(self) -> u8 {
        match self {
            Self::TransactionBegin => 0,
            Self::Row => 1,
            Self::TransactionEnd => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::TransactionBegin => "transaction_begin",
            Self::Row => "row",
            Self::TransactionEnd => "transaction_end",
        }
    }
}

/// One captured change, already routed to a partition.
#[derive(Debug, Clone)]
pub struct CaptureRecord {
    pub sequence: u64,
    pub kind: RecordKind,
    /// Origin as `schema.table`.
    pub source: String,
    pub partition_key: String,
}

impl CaptureRecord {
    pub fn new(sequence: u64, kind: RecordKind, source: impl Into<String>, cfg: &AgentConfig) -> Self {
        let source = source.into();
        let partition_key = partition_key_for(&source, cfg.database_hash);
        Self {
            sequence,
            kind,
            source,
            partition_key,
        }
    }

    /// Encode for downstream delivery.
    ///
    /// `flat` produces one self-describing JSON document per record; the
    /// compact form is a fixed binary frame.
    pub fn encode(&self, flat: bool) -> Bytes {
        if flat {
            serde_json::json!({
                "sequence": self.sequence,
                "kind": self.kind.name(),
                "source": self.source,
                "partitionKey": self.partition_key,
            })
            .to_string()
            .into()
        } else {
            // the length prefix is a u16; cap oversized source names rather
            // than letting the cast wrap and desync the frame
            let len = u16::try_from(self.source.len()).unwrap_or(u16::MAX);
            let mut buf = BytesMut::with_capacity(11 + len as usize);
            buf.put_u64(self.sequence);
            buf.put_u8(self.kind.code());
            buf.put_u16(len);
            buf.put_slice(&self.source.as_bytes()[..len as usize]);
            buf.freeze()
        }
    }
}

/// Partition routing key for a record origin.
///
/// With `database_hash` the full `schema.table` name is hashed so rows of one
/// table always land on one partition; without it everything from a schema
/// shares the schema name as key.
pub fn partition_key_for(source: &str, database_hash: bool) -> String {
    if database_hash {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    } else {
        source.split('.').next().unwrap_or(source).to_string()
    }
}

/// Shape one synthetic transaction batch: begin marker, `batch_size` rows,
/// end marker. With `filter_transaction_entry` the markers are dropped and
/// only rows remain.
///
/// `next_sequence` is the first sequence number to assign; the caller advances
/// it by the returned record count.
pub fn batch_records(next_sequence: u64, cfg: &AgentConfig) -> Vec<CaptureRecord> {
    let mut records = Vec::with_capacity(cfg.batch_size + 2);
    let mut sequence = next_sequence;
    let mut push = |kind: RecordKind, records: &mut Vec<CaptureRecord>| {
        if cfg.filter_transaction_entry && kind.is_transaction_boundary() {
            return;
        }
        records.push(CaptureRecord::new(sequence, kind, "inventory.orders", cfg));
        sequence += 1;
    };

    push(RecordKind::TransactionBegin, &mut records);
    for _ in 0..cfg.batch_size {
        push(RecordKind::Row, &mut records);
    }
    push(RecordKind::TransactionEnd, &mut records);
    records
}

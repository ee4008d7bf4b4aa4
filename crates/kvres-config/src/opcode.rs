use std::fmt;

use serde::{Deserialize, Serialize};

/// A store operation that can be given its own timeout.
///
/// Unlike raw wire op codes, this enum is iterable through [`OpCode::ALL`]
/// and every variant has a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    Get,
    Put,
    Delete,
    GetAll,
    GetVersion,
    GetMetadata,
    UpdateMetadata,
    RedirectGet,
    GetPartitionAsStream,
    PutEntriesAsStream,
    DeletePartitions,
}

impl OpCode {
    /// Number of op codes.
    pub const COUNT: usize = 11;

    /// Every op code, in declaration order.
    pub const ALL: [OpCode; Self::COUNT] = [
        OpCode::Get,
        OpCode::Put,
        OpCode::Delete,
        OpCode::GetAll,
        OpCode::GetVersion,
        OpCode::GetMetadata,
        OpCode::UpdateMetadata,
        OpCode::RedirectGet,
        OpCode::GetPartitionAsStream,
        OpCode::PutEntriesAsStream,
        OpCode::DeletePartitions,
    ];

    /// Wire byte for this operation.
    pub fn code(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Look up an operation by its wire byte.
    pub fn from_code(code: u8) -> Option<Self> {
        let index = usize::from(code).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    /// Position in [`OpCode::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Snake-case name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Get => "get",
            OpCode::Put => "put",
            OpCode::Delete => "delete",
            OpCode::GetAll => "get_all",
            OpCode::GetVersion => "get_version",
            OpCode::GetMetadata => "get_metadata",
            OpCode::UpdateMetadata => "update_metadata",
            OpCode::RedirectGet => "redirect_get",
            OpCode::GetPartitionAsStream => "get_partition_as_stream",
            OpCode::PutEntriesAsStream => "put_entries_as_stream",
            OpCode::DeletePartitions => "delete_partitions",
        }
    }

    /// Look up an operation by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Journal entry shaping and line encoding

use crate::{CaseNumber, CaseRecord, JournalError};
use serde::{Deserialize, Serialize};

/// One line of the journal file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Deduplication key
    #[serde(rename = "CaseNumber")]
    pub case_number: CaseNumber,
    /// Not populated upstream at this layer; always written empty
    #[serde(rename = "CreatedDate", default)]
    pub created_date: String,
    /// Owner name
    #[serde(rename = "Owner", default)]
    pub owner: Option<String>,
    /// Product name
    #[serde(rename = "Product", default)]
    pub product: Option<String>,
    /// Workflow status
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    /// Fractional days before the next update commitment
    #[serde(rename = "NextUpdate", default)]
    pub next_update: Option<f64>,
    /// Closed flag; older journals spell the key `isClosed`
    #[serde(rename = "IsClosed", alias = "isClosed", default)]
    pub is_closed: Option<bool>,
    /// Upstream severity label
    #[serde(rename = "Priority", default)]
    pub priority: Option<String>,
}

impl JournalEntry {
    /// Shape an upstream record. Returns `None` when it has no case number.
    pub fn from_record(record: &CaseRecord) -> Option<Self> {
        let case_number = record.case_number()?;
        Some(Self {
            case_number,
            created_date: String::new(),
            owner: record.owner_name().map(str::to_owned),
            product: record.product_name().map(str::to_owned),
            status: record.status().map(str::to_owned),
            next_update: record.next_update_days(),
            is_closed: record.is_closed(),
            priority: record.severity().map(str::to_owned),
        })
    }

    /// Encode as a single JSON line terminated by `\n`.
    ///
    /// The byte length of the returned string is what counts against the
    /// journal ceiling.
    pub fn to_line(&self) -> Result<String, JournalError> {
        let mut line = serde_json::to_string(self).map_err(JournalError::Encode)?;
        line.push('\n');
        Ok(line)
    }
}

//! Case identity and upstream case record shapes

use serde::{Deserialize, Serialize};

/// Identifier of a support case, unique within a journal generation
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseNumber(Box<str>);

/// Rejected attempt to build a [`CaseNumber`] from an empty string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("case number must not be empty")]
pub struct EmptyCaseNumber;

impl CaseNumber {
    /// Create a case number; empty strings are not case numbers
    pub fn new(value: impl Into<Box<str>>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Get the case number as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CaseNumber {
    type Error = EmptyCaseNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(EmptyCaseNumber)
    }
}

impl From<CaseNumber> for String {
    fn from(case_number: CaseNumber) -> Self {
        case_number.0.into()
    }
}

impl std::borrow::Borrow<str> for CaseNumber {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CaseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CaseNumber({})", self.0)
    }
}

impl std::fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `{ "Name": ... }` wrapper used by upstream relationship fields
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Display name of the related record
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

/// A case as returned by the upstream fetch client.
///
/// Every field is optional: the client is not trusted to populate anything,
/// and nested relationships may be missing or `null`. Fields the journal does
/// not use are ignored on deserialization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Raw case number; may be blank
    #[serde(rename = "CaseNumber", default)]
    pub case_number: Option<String>,
    /// Owning user or queue
    #[serde(rename = "Owner", default)]
    pub owner: Option<NamedRef>,
    /// Product the case is filed against
    #[serde(rename = "Product__r", default)]
    pub product: Option<NamedRef>,
    /// Workflow status, e.g. `Open`
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    /// Fractional days until the next update is due
    #[serde(rename = "Time_Before_Next_Update_Commitment__c", default)]
    pub next_update_commitment: Option<f64>,
    /// Whether upstream considers the case closed
    #[serde(rename = "Status_Closed__c", default)]
    pub status_closed: Option<bool>,
    /// Severity label, e.g. `Sev 2`
    #[serde(rename = "Severity__c", default)]
    pub severity: Option<String>,
}

impl CaseRecord {
    /// Record carrying only a case number
    pub fn with_case_number(case_number: impl Into<String>) -> Self {
        Self {
            case_number: Some(case_number.into()),
            ..Self::default()
        }
    }

    /// Case number, if present and non-empty
    pub fn case_number(&self) -> Option<CaseNumber> {
        self.case_number.as_deref().and_then(CaseNumber::new)
    }

    /// Owner's name, if the relationship is populated
    pub fn owner_name(&self) -> Option<&str> {
        self.owner.as_ref().and_then(|o| o.name.as_deref())
    }

    /// Product name, if the relationship is populated
    pub fn product_name(&self) -> Option<&str> {
        self.product.as_ref().and_then(|p| p.name.as_deref())
    }

    /// Workflow status
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Time left before the next update commitment, in fractional days
    pub fn next_update_days(&self) -> Option<f64> {
        self.next_update_commitment
    }

    /// Closed flag
    pub fn is_closed(&self) -> Option<bool> {
        self.status_closed
    }

    /// Severity label
    pub fn severity(&self) -> Option<&str> {
        self.severity.as_deref()
    }
}

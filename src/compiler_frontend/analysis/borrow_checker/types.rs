use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BorrowCheckReport {
    // User functions in declaration order
    pub functions: Vec<FunctionBorrowSummary>,
    pub stats: BorrowCheckStats,
}

impl BorrowCheckReport {
    pub fn function(&self, name: &str) -> Option<&FunctionBorrowSummary> {
        self.functions.iter().find(|summary| summary.name == name)
    }

    pub(crate) fn total_facts(&self) -> usize {
        self.functions.iter().map(|summary| summary.facts.len()).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BorrowCheckStats {
    pub functions_analyzed: usize,
    pub functions_with_errors: usize,
    pub statements_analyzed: usize,
    pub loans_created: usize,
    pub conflicts_checked: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionBorrowSummary {
    pub name: String,
    pub loans_created: usize,
    pub max_live_loans: usize,
    pub return_alias: FunctionReturnAliasSummary,
    pub releases: Vec<ReleaseEvent>,
    pub loans: Vec<LoanEvent>,

    // Only filled in when facts were asked for
    pub facts: Vec<StatementFact>,

    // Analysis stopped at the first error in this function
    pub has_error: bool,
}

/// Which parameters a function's returned references borrow from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FunctionReturnAliasSummary {
    Fresh,
    AliasParams(Vec<usize>),

    // The signature could not be resolved, so the result may borrow from anything
    Unknown,
}

impl FunctionReturnAliasSummary {
    pub(crate) fn allows_param(&self, index: usize) -> bool {
        match self {
            Self::Fresh => false,
            Self::AliasParams(params) => params.contains(&index),
            Self::Unknown => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReleaseEventKind {
    Full,

    // Some fields were moved out, the rest are released
    RemainingFields,
}

/// A value released because its owner went out of scope or the function returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseEvent {
    pub place: String,
    pub kind: ReleaseEventKind,
    pub point: usize,
    pub line: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanEvent {
    pub id: usize,
    pub place: String,
    pub kind: LoanKindName,
    pub origin: String,
    pub created_at: usize,
    pub line: i32,

    // Last statement that used a holder of the loan
    pub last_use: Option<usize>,
    pub ended_at: Option<usize>,
    pub downgraded: bool,

    // Unique loans this shared reborrow downgraded to read only
    pub derived_from: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoanKindName {
    Shared,
    Unique,
}

/// Permissions of every binding in scope after one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementFact {
    pub point: usize,
    pub statement: &'static str,
    pub line: i32,
    pub places: Vec<PlacePermissionFact>,
    pub live_loans: Vec<usize>,
}

impl StatementFact {
    pub fn permissions_of(&self, place: &str) -> Option<&str> {
        self.places
            .iter()
            .find(|fact| fact.place == place)
            .map(|fact| fact.permissions.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacePermissionFact {
    pub place: String,

    // Like "RWO-", a dash for each missing permission
    pub permissions: String,
}

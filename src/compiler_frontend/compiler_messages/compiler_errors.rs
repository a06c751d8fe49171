use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::PathBuf;

// The final set of errors and warnings emitted from the checker
#[derive(Debug, Default, Serialize)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<CompilerWarning>,
}

impl CompilerMessages {
    pub fn from_error(error: CompilerError) -> Self {
        CompilerMessages {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize)]
pub enum ErrorMetaDataKey {
    VariableName,
    CompilationStage,

    // Optional suggestions
    PrimarySuggestion,
    AlternativeSuggestion,

    // Data type information
    ExpectedType,
    FoundType,
    BorrowKind,          // "Shared" or "Unique"
    LifetimeHint,        // For elision and lifetime explanations
    MovedVariable,       // Place that was moved
    BorrowedVariable,    // Place that was borrowed
    ConflictingVariable, // Place causing a borrow conflict
    PermissionsHeld,     // Permission set of the place at the failing point
    PermissionsNeeded,   // Permission the operation required
}

/// A second source position that explains an error,
/// such as where the conflicting borrow was created or where a value was moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedPoint {
    pub point: Option<usize>,
    pub location: TextLocation,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompilerError {
    pub msg: String,

    pub location: TextLocation,
    pub error_type: ErrorType,

    // Filled in once the error leaves the stage that produced it
    pub file_path: PathBuf,

    // Function the error was found in, when there is one
    pub function: Option<String>,

    // The place the diagnostic is about (for example `v[2]` or `*r`)
    pub place: Option<String>,

    // Program point inside the linearized function body
    pub point: Option<usize>,
    pub related: Option<RelatedPoint>,

    // This is for creating more structured and detailed error messages
    pub metadata: FxHashMap<ErrorMetaDataKey, String>,
}

impl CompilerError {
    pub fn new(msg: impl Into<String>, location: TextLocation, error_type: ErrorType) -> Self {
        CompilerError {
            msg: msg.into(),
            location,
            error_type,
            file_path: PathBuf::new(),
            function: None,
            place: None,
            point: None,
            related: None,
            metadata: FxHashMap::default(),
        }
    }

    pub fn with_file_path(mut self, file_path: PathBuf) -> Self {
        self.file_path = file_path;
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        if self.function.is_none() {
            self.function = Some(function.into());
        }
        self
    }

    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn with_point(mut self, point: usize) -> Self {
        self.point = Some(point);
        self
    }

    pub fn with_related(mut self, related: RelatedPoint) -> Self {
        self.related = Some(related);
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }

    pub fn metadata_value(&self, key: ErrorMetaDataKey) -> Option<&str> {
        self.metadata.get(&key).map(String::as_str)
    }

    /// Create a new rule error with a descriptive message (no metadata)
    pub fn new_rule_error(msg: impl Into<String>, location: TextLocation) -> Self {
        Self::new(msg, location, ErrorType::Rule)
    }

    /// Create a file system error from a Path
    pub fn file_error(path: &std::path::Path, msg: impl Into<String>) -> Self {
        Self::new(msg, TextLocation::default(), ErrorType::File).with_file_path(path.to_path_buf())
    }

}

// Adds more information to the CompilerError
// So it knows what stage produced it and how to display it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorType {
    Syntax,
    Type,
    Rule,
    File,
    Config,

    // Ownership analysis
    UseOfMovedValue,
    ConflictingBorrow,
    WriteWithoutPermission,
    DanglingReference,
    AmbiguousLifetime,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Syntax => "Syntax Error",
        ErrorType::Config => "Malformed Config",
        ErrorType::File => "File Error",
        ErrorType::Rule => "Language Rule Violation",
        ErrorType::Type => "Type Error",
        ErrorType::UseOfMovedValue => "Use Of Moved Value",
        ErrorType::ConflictingBorrow => "Conflicting Borrow",
        ErrorType::WriteWithoutPermission => "Write Without Permission",
        ErrorType::DanglingReference => "Dangling Reference",
        ErrorType::AmbiguousLifetime => "Ambiguous Lifetime",
    }
}

/// Parses the name used by `// expect:` lines in test cases and by the JSON output.
pub fn error_type_from_str(name: &str) -> Option<ErrorType> {
    let error_type = match name.trim() {
        "Syntax" => ErrorType::Syntax,
        "Type" => ErrorType::Type,
        "Rule" => ErrorType::Rule,
        "File" => ErrorType::File,
        "Config" => ErrorType::Config,
        "UseOfMovedValue" => ErrorType::UseOfMovedValue,
        "ConflictingBorrow" => ErrorType::ConflictingBorrow,
        "WriteWithoutPermission" => ErrorType::WriteWithoutPermission,
        "DanglingReference" => ErrorType::DanglingReference,
        "AmbiguousLifetime" => ErrorType::AmbiguousLifetime,
        _ => return None,
    };

    Some(error_type)
}

/// Shared body of the `return_*_error!` macros.
#[doc(hidden)]
#[macro_export]
macro_rules! new_compiler_error {
    ($error_type:ident, $msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut error = $crate::compiler_frontend::compiler_errors::CompilerError::new(
            $msg,
            $location,
            $crate::compiler_frontend::compiler_errors::ErrorType::$error_type,
        );
        $(
            error.new_metadata_entry(
                $crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key,
                $value,
            );
        )*
        error
    }};
}

/// Returns a new CompilerError for syntax violations.
///
/// Syntax errors indicate malformed code that the snippet grammar cannot read.
///
/// Usage:
/// `return_syntax_error!("message", location, {
///     CompilationStage => "Parsing",
///     PrimarySuggestion => "Add a ';' after the statement",
/// })`;
#[macro_export]
macro_rules! return_syntax_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::new_compiler_error!(Syntax, $msg, $location, { $( $key => $value ),* }))
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::new_compiler_error!(Syntax, $msg, $location, {}))
    };
}

/// Returns a new CompilerError for type system violations.
///
/// Usage:
/// `return_type_error!("Cannot index into bool", location, { FoundType => "bool" })`;
#[macro_export]
macro_rules! return_type_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::new_compiler_error!(Type, $msg, $location, { $( $key => $value ),* }))
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::new_compiler_error!(Type, $msg, $location, {}))
    };
}

/// Returns a new CompilerError for semantic rule violations.
///
/// Rule errors indicate undefined names, wrong arity, or borrowing something that has no place.
///
/// Usage:
/// `return_rule_error!("Undefined variable", location, { VariableName => "x" })`;
#[macro_export]
macro_rules! return_rule_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::new_compiler_error!(Rule, $msg, $location, { $( $key => $value ),* }))
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::new_compiler_error!(Rule, $msg, $location, {}))
    };
}

/// Returns a new CompilerError for a malformed config file.
#[macro_export]
macro_rules! return_config_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::new_compiler_error!(Config, $msg, $location, { $( $key => $value ),* }))
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::new_compiler_error!(Config, $msg, $location, {}))
    };
}

use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use saying::say;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize)]
pub struct CompilerWarning {
    pub msg: String,
    pub location: TextLocation,
    pub warning_kind: WarningKind,
    pub file_path: PathBuf,
}

impl CompilerWarning {
    pub fn new(
        msg: &str,
        location: TextLocation,
        warning_kind: WarningKind,
        file_path: PathBuf,
    ) -> CompilerWarning {
        CompilerWarning {
            msg: msg.to_owned(),
            location,
            warning_kind,
            file_path,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    UnusedVariable,
    UnusedMutable,
    UnusedFunctionParameter,
    UnreachableCode,
}

pub fn print_formatted_warning(w: CompilerWarning) {
    say!(Yellow "WARNING: ");
    match w.warning_kind {
        WarningKind::UnusedVariable => {
            say!("Unused variable '", Yellow w.msg, "'");
        }
        WarningKind::UnusedMutable => {
            say!("Variable '", Yellow w.msg, "' does not need to be mutable");
        }
        WarningKind::UnusedFunctionParameter => {
            say!("Unused function parameter '", Yellow w.msg, "'");
        }
        WarningKind::UnreachableCode => {
            say!("Unreachable statement after return in '", Yellow w.msg, "'");
        }
    }

    say!(Dark Magenta "Line ", Bright {w.location.start_pos.line_number + 1});
}

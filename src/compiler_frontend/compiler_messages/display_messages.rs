use crate::compiler_frontend::analysis::borrow_checker::{
    BorrowCheckReport, FunctionReturnAliasSummary, ReleaseEventKind,
};
use crate::compiler_frontend::compiler_errors::{
    CompilerError, CompilerMessages, ErrorType, error_type_to_str,
};
use crate::compiler_frontend::compiler_warnings::print_formatted_warning;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use saying::say;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

fn normalize_display_path(path: &Path) -> PathBuf {
    let path_string = path.to_string_lossy();
    if let Some(stripped) = path_string.strip_prefix(r"\\?\") {
        return PathBuf::from(stripped);
    }

    path.to_path_buf()
}

fn relative_display_path(scope: &Path) -> String {
    let normalized_scope = normalize_display_path(scope);

    match env::current_dir() {
        Ok(dir) => {
            let normalized_dir = normalize_display_path(&dir);
            normalized_scope
                .strip_prefix(&normalized_dir)
                .unwrap_or(&normalized_scope)
                .to_string_lossy()
                .to_string()
        }
        Err(err) => {
            say!(Red "Could not read the current directory to shorten the file path: ", { err.to_string() });
            normalized_scope.to_string_lossy().to_string()
        }
    }
}

pub fn print_compiler_messages(messages: CompilerMessages) {
    for err in messages.errors {
        print_formatted_error(err);
    }

    for warning in messages.warnings {
        print_formatted_warning(warning);
    }
}

/// Prints a check result (or just its messages) as one JSON document on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            say!(Red "Could not serialize diagnostics to JSON: ", { err.to_string() });
        }
    }
}

/// One block per function: its loans, what it returns a borrow of,
/// and the permission table when facts were collected.
pub fn print_borrow_report(report: &BorrowCheckReport) {
    for function in &report.functions {
        say!(Bright Black "\n------------------------------------");
        say!(Green Bold "fn ", { function.name.to_owned() });

        let returns = match &function.return_alias {
            FunctionReturnAliasSummary::Fresh => String::from("nothing borrowed"),
            FunctionReturnAliasSummary::AliasParams(params) => format!("a borrow of parameters {params:?}"),
            FunctionReturnAliasSummary::Unknown => String::from("an unresolved borrow"),
        };
        say!(
            "  loans: ", Blue function.loans_created,
            Reset ", at most live: ", Blue function.max_live_loans,
            Reset ", returns ", { returns }
        );

        for release in &function.releases {
            let kind = match release.kind {
                ReleaseEventKind::Full => "",
                ReleaseEventKind::RemainingFields => " (remaining fields)",
            };
            say!(Dark Cyan "  release ", { release.place.to_owned() }, kind, Dark Magenta " line ", Bright { release.line + 1 });
        }

        for fact in &function.facts {
            let places = fact
                .places
                .iter()
                .map(|place| format!("{}: {}", place.place, place.permissions))
                .collect::<Vec<_>>()
                .join("  ");

            say!(
                Dark Magenta { format!("  L{:<4}", fact.line + 1) },
                Dark Yellow { format!("{:<16}", fact.statement) },
                { places }
            );
        }
    }

    let stats = &report.stats;
    say!(
        "\nFunctions: ", Blue stats.functions_analyzed,
        Reset "  with errors: ", Blue stats.functions_with_errors,
        Reset "  statements: ", Blue stats.statements_analyzed,
        Reset "  loans: ", Blue stats.loans_created
    );
}

pub fn print_formatted_error(e: CompilerError) {
    let relative_dir = relative_display_path(&e.file_path);
    let line_number = e.location.start_pos.line_number as usize;
    let source = fs::read_to_string(normalize_display_path(&e.file_path)).unwrap_or_default();

    match e.error_type {
        ErrorType::Syntax => {
            if !relative_dir.is_empty() {
                say!("\n(╯°□°)╯  🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥  Σ(°△°;) ");
            }

            say!(Red "Syntax");
        }

        ErrorType::Type => {
            if !relative_dir.is_empty() {
                say!("\n(ಠ_ಠ) ", Dark Magenta relative_dir);
            }

            say!(Red "Type Error");
        }

        ErrorType::Rule => {
            if !relative_dir.is_empty() {
                say!("\nヽ(˶°o°)ﾉ  🔥🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥🔥  ╰(°□°╰) ");
            }

            say!(Red "Rule");
        }

        ErrorType::File => {
            say!(Yellow "🏚 Can't find/read file or directory: ", relative_dir);
            say!(e.msg);
            return;
        }

        ErrorType::Config => {
            if !relative_dir.is_empty() {
                say!("\n (-_-)  🔥🔥🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥🔥🔥  <(^~^)/ ");
            }
            say!(Yellow "CONFIG FILE ISSUE- ");
            say!(Dark Yellow "Malformed config file, something doesn't make sense inside permcheck.toml");
            say!(Red e.msg);
            return;
        }

        ErrorType::UseOfMovedValue
        | ErrorType::ConflictingBorrow
        | ErrorType::WriteWithoutPermission
        | ErrorType::DanglingReference
        | ErrorType::AmbiguousLifetime => {
            if !relative_dir.is_empty() {
                say!("\n(╯°Д°)╯  🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥  ╰(°□°╰) ");
            }

            say!(Red { error_type_to_str(&e.error_type) });
            if let Some(function) = &e.function {
                say!(Dark Magenta "In fn ", Bright { function.to_owned() });
            }
        }
    }

    say!(Dark Magenta "Line ", Bright {line_number + 1});
    say!(Red e.msg);
    print_source_snippet(&source, &e.location);

    if let Some(related) = &e.related {
        say!(Dark Cyan "note: ", { related.note.to_owned() });
        say!(Dark Magenta "Line ", Bright {related.location.start_pos.line_number + 1});
        print_source_snippet(&source, &related.location);
    }
}

fn print_source_snippet(source: &str, location: &TextLocation) {
    let line = source
        .lines()
        .nth(location.start_pos.line_number as usize)
        .unwrap_or_default();

    println!("\n{line}");

    // spaces before the relevant part of the line
    print!(
        "{}",
        " ".repeat((location.start_pos.char_column - 1).max(0) as usize)
    );

    let underline_end = if location.end_pos.line_number == location.start_pos.line_number {
        location.end_pos.char_column
    } else {
        location.start_pos.char_column
    };
    let length_of_underline = (underline_end - location.start_pos.char_column + 1).max(1) as usize;
    say!(Red { "^".repeat(length_of_underline) });
}

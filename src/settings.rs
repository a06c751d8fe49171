use crate::compiler_frontend::Flag;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::return_config_error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SNIPPET_FILE_EXTENSION: &str = "rs";
pub const CONFIG_FILE_NAME: &str = "permcheck.toml";
pub const PRELUDE_FILE_NAME: &str = "<prelude>";
pub const INTEGRATION_TESTS_PATH: &str = "tests/cases";
pub const EXPECTED_ERROR_MARKER: &str = "// expect:";

// Rough allocation guesses for small snippets.
pub const SRC_TO_TOKEN_RATIO: usize = 4;
pub const MINIMUM_STRING_TABLE_CAPACITY: usize = 64;
pub const MINIMUM_LIKELY_LOCALS: usize = 8;

/// When a loan gives its permissions back to the borrowed place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorationMode {
    /// After the last use of the last variable holding the loan
    #[default]
    LastUse,

    /// When the scopes of every variable holding the loan have ended
    Lexical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerSettings {
    pub restoration: RestorationMode,

    // Two constant indices into the same base are disjoint when the literals differ
    pub literal_index_disjointness: bool,

    // Functions are independent, so they can be checked on the rayon pool
    pub parallel: bool,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            restoration: RestorationMode::LastUse,
            literal_index_disjointness: true,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub show_warnings: bool,
    pub show_facts: bool,
    pub show_timers: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            show_warnings: true,
            show_facts: false,
            show_timers: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeSettings {
    // Extra type names that behave like primitives (copied instead of moved)
    pub copy: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub checker: CheckerSettings,
    pub output: OutputSettings,
    pub types: TypeSettings,
}

impl Config {
    /// Parses a `permcheck.toml` document.
    pub fn from_toml_str(source: &str) -> Result<Self, CompilerError> {
        match toml::from_str::<Config>(source) {
            Ok(config) => Ok(config),
            Err(err) => {
                return_config_error!(
                    format!("Invalid {CONFIG_FILE_NAME}: {}", err.to_string().trim()),
                    TextLocation::default(),
                    {
                        CompilationStage => "Config",
                        PrimarySuggestion => "Check the key names and value types against the documented [checker], [output] and [types] tables",
                    }
                )
            }
        }
    }

    /// Loads the config file at `path`.
    /// A missing file is not an error, it just means every setting keeps its default.
    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                return Err(CompilerError::file_error(path, err.to_string()));
            }
        };

        Config::from_toml_str(&source).map_err(|e| e.with_file_path(path.to_path_buf()))
    }

    /// Looks for `permcheck.toml` next to the checked file, then in the working directory.
    pub fn discover(snippet_path: &Path) -> Result<Self, CompilerError> {
        if let Some(parent) = snippet_path.parent() {
            let beside_snippet = parent.join(CONFIG_FILE_NAME);
            if beside_snippet.exists() {
                return Config::load(&beside_snippet);
            }
        }

        Config::load(Path::new(CONFIG_FILE_NAME))
    }

    /// Command line flags win over whatever the file said
    pub fn apply_flags(&mut self, flags: &[Flag]) {
        for flag in flags {
            match flag {
                Flag::DisableWarnings => self.output.show_warnings = false,
                Flag::DisableTimers => self.output.show_timers = false,
                Flag::ShowFacts => self.output.show_facts = true,
                Flag::Json => self.output.format = OutputFormat::Json,
                Flag::Lexical => self.checker.restoration = RestorationMode::Lexical,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_frontend::compiler_errors::ErrorType;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").expect("empty config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.checker.restoration, RestorationMode::LastUse);
        assert!(config.checker.literal_index_disjointness);
    }

    #[test]
    fn parses_every_table() {
        let config = Config::from_toml_str(
            r#"
            [checker]
            restoration = "lexical"
            literal_index_disjointness = false
            parallel = false

            [output]
            format = "json"
            show_warnings = false
            show_facts = true

            [types]
            copy = ["Point"]
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.checker.restoration, RestorationMode::Lexical);
        assert!(!config.checker.literal_index_disjointness);
        assert!(!config.checker.parallel);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.show_warnings);
        assert!(config.output.show_facts);
        assert_eq!(config.types.copy, vec![String::from("Point")]);
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let error = Config::from_toml_str("[checker]\nrestoraton = \"lexical\"\n")
            .expect_err("misspelled key should be rejected");
        assert_eq!(error.error_type, ErrorType::Config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config::load(&dir.path().join(CONFIG_FILE_NAME)).expect("missing is fine");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn discovers_config_beside_the_snippet() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut file = fs::File::create(dir.path().join(CONFIG_FILE_NAME)).expect("config file");
        writeln!(file, "[checker]\nrestoration = \"lexical\"").expect("write config");

        let config = Config::discover(&dir.path().join("snippet.rs")).expect("config should load");
        assert_eq!(config.checker.restoration, RestorationMode::Lexical);
    }

    #[test]
    fn flags_override_the_file() {
        let mut config = Config::from_toml_str("[output]\nshow_facts = false\n").expect("config");
        config.apply_flags(&[Flag::Lexical, Flag::ShowFacts, Flag::Json, Flag::DisableTimers]);

        assert_eq!(config.checker.restoration, RestorationMode::Lexical);
        assert!(config.output.show_facts);
        assert!(!config.output.show_timers);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.show_warnings);
    }
}

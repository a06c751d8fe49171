/// # The checker's command line front door
/// Everything here only parses arguments and prints,
/// the checking itself lives in the build system and the frontend.

// The basic CLI for checking snippets and running the snippet cases
pub mod cli;

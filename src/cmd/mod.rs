pub mod analyze;
pub mod crack;
pub mod encrypt;

use std::fmt::Display;
use std::fs;
use std::process;

/// Prints a fatal error and exits.
pub fn fail(context: &str, e: impl Display) -> ! {
    eprintln!("\n❌ {}:", context);
    eprintln!("   {}", e);
    process::exit(1);
}

/// Text from the positional argument, or from `--file`.
pub fn read_input(text: Option<&str>, file: Option<&str>) -> String {
    match (text, file) {
        (Some(t), _) => t.to_string(),
        (None, Some(path)) => {
            fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("Cannot read '{}'", path), e))
        }
        (None, None) => fail("Missing input", "pass the text or --file <PATH>"),
    }
}

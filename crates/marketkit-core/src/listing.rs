//! Extraction of one function's code from a Fift assembly listing.
//!
//! The compiler emits the probe module as a listing of this shape:
//!
//! ```text
//! "Asm.fif" include
//! // automatically generated
//! PROGRAM{
//!   DECLPROC helper
//!   DECLPROC deployTonSimpleSale
//!   DECLMETHOD getSomething
//!   helper PROC:<{
//!     ...
//!   }>
//!   deployTonSimpleSale() PROC:<{
//!     IF:<{ ... }>
//!   }>
//! }END>c
//! ```
//!
//! Only the region between `PROGRAM{` and `}END>c` is considered. Helper
//! procedures are kept verbatim, since the extracted function calls them;
//! the target function body is located by brace depth, which copes with any
//! nesting of control constructs without parsing Fift.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Opening boundary of the program region.
pub const PROGRAM_OPEN: &str = "PROGRAM{";

/// Closing boundary of the program region.
pub const PROGRAM_CLOSE: &str = "}END>c";

/// Keyword of getter method declarations, skipped.
pub const METHOD_DECL: &str = "DECLMETHOD";

/// Keyword of procedure forward declarations.
pub const PROC_DECL: &str = "DECLPROC";

/// Token following `name()` where a procedure body opens.
pub const PROC_OPEN: &str = "PROC:<{";

/// Sequence closing a procedure body.
pub const PROC_CLOSE: &str = "}>";

/// Comment placed between helper code and the function body.
pub const BODY_SEPARATOR: &str = "// Main deploy function content:";

const INDENT: &str = "    ";

/// Assembly listing produced by the compiler.
#[derive(Debug, Clone)]
pub struct AssemblyListing {
    text: String,
}

impl AssemblyListing {
    /// Read a listing from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        Ok(Self { text })
    }

    /// Extract `function` and the helper code it depends on.
    pub fn extract(&self, function: &str) -> Result<ExtractedFunction> {
        extract_function(&self.text, function)
    }
}

/// Helper code plus the body of one function, ready to embed as inline asm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFunction {
    /// Helper lines, each re-indented by four spaces.
    pub helpers: String,

    /// Function body with the closing `}>` removed.
    pub body: String,
}

impl ExtractedFunction {
    /// Combined asm text: helpers, separator comment, body.
    pub fn text(&self) -> String {
        format!("{}\n{}{}\n{}", self.helpers, INDENT, BODY_SEPARATOR, self.body)
            .trim()
            .to_string()
    }
}

impl fmt::Display for ExtractedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Extract `function` from listing text.
///
/// # Errors
///
/// Returns [`Error::Extraction`] if the program region or the function body
/// is missing, if the body never closes, or if nothing was extracted.
pub fn extract_function(listing: &str, function: &str) -> Result<ExtractedFunction> {
    let forward_decl = format!("{} {}", PROC_DECL, function);
    let body_open = format!("{}() {}", function, PROC_OPEN);

    let mut helpers = String::new();
    let mut body: Option<String> = None;
    let mut inside_program = false;

    let mut lines = listing.lines();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if trimmed == PROGRAM_OPEN {
            inside_program = true;
            continue;
        }
        if trimmed == PROGRAM_CLOSE {
            break;
        }
        if !inside_program {
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if trimmed.contains(METHOD_DECL) || trimmed.contains(&forward_decl) {
            continue;
        }

        if let Some(pos) = line.find(&body_open) {
            let rest = &line[pos + body_open.len()..];
            body = Some(capture_body(rest, &mut lines, function)?);
            break;
        }

        helpers.push_str(INDENT);
        helpers.push_str(line);
        helpers.push('\n');
    }

    if !inside_program {
        return Err(Error::Extraction(format!(
            "listing has no '{}' line",
            PROGRAM_OPEN
        )));
    }

    let Some(body) = body else {
        return Err(Error::Extraction(format!(
            "'{}' not found in listing (stale build or wrong target?)",
            body_open
        )));
    };

    if helpers.trim().is_empty() && body.trim().is_empty() {
        return Err(Error::Extraction(format!(
            "no code extracted for {}",
            function
        )));
    }

    Ok(ExtractedFunction { helpers, body })
}

/// Collect body lines until the opening brace is balanced.
///
/// `first` is the text after the body-open token on its line; it is kept but
/// not brace-counted, the depth starts at 1 for the brace that token opened.
fn capture_body<'a>(
    first: &str,
    lines: &mut impl Iterator<Item = &'a str>,
    function: &str,
) -> Result<String> {
    let mut body = String::from(first);
    body.push('\n');
    let mut depth: usize = 1;

    for line in lines {
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        body.push_str(line);
        body.push('\n');

        if depth == 0 {
            strip_close(&mut body);
            return Ok(body);
        }
    }

    Err(Error::Extraction(format!(
        "body of {} is not closed before end of listing",
        function
    )))
}

/// Remove one trailing `}>` and the whitespace around it.
fn strip_close(body: &mut String) {
    let end = body.trim_end().len();
    if body[..end].ends_with(PROC_CLOSE) {
        body.truncate(end - PROC_CLOSE.len());
        let end = body.trim_end().len();
        body.truncate(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#""Asm.fif" include
// automatically generated from `get_deploy_functions.tolk`
PROGRAM{
  DECLPROC loadData
  DECLPROC deployTonSimpleSale
  DECLMETHOD getDeployFunctionCell
  // helper
  loadData PROC:<{
    c4 PUSH
    CTOS
  }>
  deployTonSimpleSale() PROC:<{
    loadData CALLDICT
    IF:<{
      DROP
    }>ELSE<{
      NIP
    }>
  }>
}END>c
"#;

    #[test]
    fn test_extracts_helpers_and_body() {
        let extracted = extract_function(LISTING, "deployTonSimpleSale").unwrap();

        assert_eq!(
            extracted.helpers,
            "      DECLPROC loadData\n      loadData PROC:<{\n        c4 PUSH\n        CTOS\n      }>\n"
        );
        assert_eq!(
            extracted.body,
            "\n    loadData CALLDICT\n    IF:<{\n      DROP\n    }>ELSE<{\n      NIP\n    }>"
        );
    }

    #[test]
    fn test_text_joins_with_separator() {
        let extracted = extract_function(LISTING, "deployTonSimpleSale").unwrap();
        let text = extracted.text();

        assert!(text.starts_with("DECLPROC loadData"));
        assert!(text.contains("\n    // Main deploy function content:\n"));
        assert!(text.ends_with("NIP\n    }>"));
        assert!(!text.contains("DECLMETHOD"));
        assert!(!text.contains("DECLPROC deployTonSimpleSale"));
    }

    #[test]
    fn test_literal_scenario() {
        let listing = "PROGRAM{\n\
                       // first comment\n\
                       // second comment\n\
                       DECLMETHOD getDeployFunctionCell\n\
                       deployFoo() PROC:<{\n\
                       IF:<{\n\
                       NOP\n\
                       }>\n\
                       }>\n\
                       }END>c\n";

        let extracted = extract_function(listing, "deployFoo").unwrap();

        assert_eq!(extracted.helpers, "");
        assert_eq!(extracted.body, "\nIF:<{\nNOP\n}>");
        assert_eq!(
            extracted.text(),
            "// Main deploy function content:\n\nIF:<{\nNOP\n}>"
        );
    }

    #[test]
    fn test_nested_braces_strip_one_close() {
        let listing = "PROGRAM{\n  f() PROC:<{\n    A:<{\n      B:<{\n        C:<{\n        }>\n      }>\n    }>\n  }>\n}END>c\n";
        let extracted = extract_function(listing, "f").unwrap();

        // Three inner pairs survive, only the function's own close is gone.
        assert_eq!(extracted.body.matches("}>").count(), 3);
        assert!(extracted.body.ends_with("    }>"));
    }

    #[test]
    fn test_missing_program_marker() {
        let listing = "  deployFoo() PROC:<{\n  }>\n";
        let err = extract_function(listing, "deployFoo").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn test_missing_function() {
        let err = extract_function(LISTING, "deployMultipleOffer").unwrap_err();
        assert!(err.to_string().contains("deployMultipleOffer() PROC:<{"));
    }

    #[test]
    fn test_unclosed_body() {
        let listing = "PROGRAM{\n  f() PROC:<{\n    A:<{\n";
        let err = extract_function(listing, "f").unwrap_err();
        assert!(err.to_string().contains("not closed"));
    }

    #[test]
    fn test_lines_after_close_marker_ignored() {
        let listing = "PROGRAM{\n  keep\n}END>c\n  f() PROC:<{\n  }>\n";
        let err = extract_function(listing, "f").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}

use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Result;
use rustyline::{Completer, Helper, Highlighter, Hinter};

use nssm::parse;

/// Helper that extends editor
///
/// Currently only implements `Validator` trait to trigger multiline editing when input is not
/// finished yet. See `is_incomplete`.
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct ReplHelper {}

impl ReplHelper {
    pub fn new() -> Self {
        ReplHelper {}
    }
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> Result<ValidationResult> {
        if is_incomplete(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Whether the editor should keep reading lines before handing `input` to the runtime
///
/// That is the case after a `\` line continuation, or when parsing ran off the end of the input
/// (eg. an unclosed `{`). An empty line always submits so a hopeless input can be dismissed.
pub fn is_incomplete(input: &str) -> bool {
    if input.ends_with('\\') {
        return true;
    }

    if input.trim().is_empty() || input.ends_with('\n') {
        return false;
    }

    match parse(input) {
        Ok(_) => false,
        Err(e) => e.pos.offset >= input.len(),
    }
}

#[test]
fn test_is_incomplete() {
    let tests = vec![
        ("x = 1", false),
        ("x = \\", true),
        ("f = (a) {", true),
        ("f = (a) {\n  a + 1", true),
        ("f = (a) {\n  a + 1\n}", false),
        ("[1, 2,", true),
        ("if (x) 1 else", true),
        // Errors before the end are reported straight away
        ("x = = 1", false),
        ("f = (a) {\n", false),
        ("", false),
    ];

    for (input, expected) in tests {
        assert_eq!(is_incomplete(input), expected, "{:?}", input);
    }
}

//! Loop headers.
//!
//! `for` and `while` have the same surface syntax in WGSL and JavaScript, so
//! one header type serves both backends. WGSL has no `++` on floats; updates
//! are lowered to compound assignment before they reach the header.

/// A loop header, without the body.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopHeader {
    /// `for (init; test; update)`; every part is optional.
    For {
        init: Option<String>,
        test: Option<String>,
        update: Option<String>,
    },
    /// `while (test)`
    While { test: String },
}

impl LoopHeader {
    /// Render the header.
    pub fn render(&self) -> String {
        match self {
            LoopHeader::For { init, test, update } => format!(
                "for ({}; {}; {})",
                init.as_deref().unwrap_or_default(),
                test.as_deref().unwrap_or_default(),
                update.as_deref().unwrap_or_default()
            )
            .replace("(; ; )", "(;;)"),
            LoopHeader::While { test } => format!("while ({})", test),
        }
    }
}

/// Strip one pair of outer parentheses from an emitted condition.
pub fn strip_parens(code: &str) -> &str {
    let Some(inner) = code.strip_prefix('(').and_then(|c| c.strip_suffix(')')) else {
        return code;
    };
    // `(a) && (b)` starts and ends with parentheses that do not match.
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return code;
                }
            }
            _ => {}
        }
    }
    inner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_header() {
        let header = LoopHeader::For {
            init: Some("var i: f32 = 0.0".to_string()),
            test: Some("i < 10.0".to_string()),
            update: Some("i += 1.0".to_string()),
        };
        assert_eq!(header.render(), "for (var i: f32 = 0.0; i < 10.0; i += 1.0)");
    }

    #[test]
    fn test_empty_for_header() {
        let header = LoopHeader::For {
            init: None,
            test: None,
            update: None,
        };
        assert_eq!(header.render(), "for (;;)");
    }

    #[test]
    fn test_while_header() {
        let header = LoopHeader::While {
            test: "x > 0.0".to_string(),
        };
        assert_eq!(header.render(), "while (x > 0.0)");
    }

    #[test]
    fn test_strip_parens() {
        assert_eq!(strip_parens("(a < b)"), "a < b");
        assert_eq!(strip_parens("(a) && (b)"), "(a) && (b)");
        assert_eq!(strip_parens("x"), "x");
        assert_eq!(strip_parens("((a < b))"), "(a < b)");
    }
}

//! Error types for every stage of the pipeline.
//!
//! Kinds follow spec.md §7: lex/parse errors carry line/column and never
//! recover; validation errors accumulate and abort before rendering;
//! schedule warnings are non-fatal and travel in the result; render errors
//! cover conditions validation should already have ruled out.

use thiserror::Error;

/// Lexer failure: unterminated string/comment, or an unrecognized character.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{line}:{column}: lex error: {message}")]
pub struct LexError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl LexError {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Parser failure: malformed grammar, mismatched units, undefined pattern.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{line}:{column}: parse error: {message}")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Stable codes for structural/semantic validation errors (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    UnsupportedVersion,
    NoPatches,
    NoSections,
    BadBlockSize,
    DuplicatePatchName,
    DuplicateBusName,
    MissingOutStem,
    EmptyGraph,
    MissingGraphOut,
    UnknownSendBus,
}

impl ValidationCode {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationCode::UnsupportedVersion => "V001",
            ValidationCode::NoPatches => "V002",
            ValidationCode::NoSections => "V003",
            ValidationCode::BadBlockSize => "V004",
            ValidationCode::DuplicatePatchName => "V005",
            ValidationCode::DuplicateBusName => "V006",
            ValidationCode::MissingOutStem => "V007",
            ValidationCode::EmptyGraph => "V008",
            ValidationCode::MissingGraphOut => "V009",
            ValidationCode::UnknownSendBus => "V010",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Stable codes for non-fatal schedule/validation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    DuplicateStemName,
    BinauralMixOutOfRange,
    BinauralWithoutOscillator,
    NoTempoSpecified,
    UnknownPatchReference,
    UnrecognizedTimeUnit,
}

impl WarningCode {
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::DuplicateStemName => "W001",
            WarningCode::BinauralMixOutOfRange => "W002",
            WarningCode::BinauralWithoutOscillator => "W003",
            WarningCode::NoTempoSpecified => "W004",
            WarningCode::UnknownPatchReference => "W005",
            WarningCode::UnrecognizedTimeUnit => "W006",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with a stable code, message, and optional path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: ValidationCode,
    pub message: String,
    pub path: Option<String>,
}

impl ValidationError {
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(code: ValidationCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {} (at {})", self.code, self.message, p),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// A non-fatal validation/schedule warning with a stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: WarningCode,
    pub message: String,
    pub path: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(code: WarningCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {} (at {})", self.code, self.message, p),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Accumulated result of `validator::validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// Errors surfaced during rendering that validation should already have
/// prevented; per spec.md §7 these are near-programmer-errors, so the enum
/// is intentionally small.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    #[error("play occurrence references unknown patch '{0}'")]
    UnknownPatch(String),
}

/// Top-level error type returned by `pipeline::render`.
#[derive(Debug, Error)]
pub enum AuroraError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("spec validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Maps an `AuroraError` to the CLI collaborator's exit-code taxonomy
/// (spec.md §6): this crate never calls `std::process::exit` itself.
pub fn exit_code(error: &AuroraError) -> i32 {
    match error {
        AuroraError::Lex(_) | AuroraError::Parse(_) => 4,
        AuroraError::Validation(_) => 5,
        AuroraError::Render(_) => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_result_accumulates() {
        let mut result = ValidationResult::default();
        assert!(result.is_ok());
        result.add_error(ValidationError::new(ValidationCode::NoPatches, "no patches"));
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn exit_codes_match_taxonomy() {
        let parse = AuroraError::Parse(ParseError::new(1, 1, "bad"));
        assert_eq!(exit_code(&parse), 4);
        let validation = AuroraError::Validation(vec![]);
        assert_eq!(exit_code(&validation), 5);
        let render = AuroraError::Render(RenderError::UnknownPatch("x".into()));
        assert_eq!(exit_code(&render), 6);
    }

    #[test]
    fn error_display_includes_code_and_path() {
        let err = ValidationError::with_path(ValidationCode::MissingOutStem, "missing out_stem", "patches[0]");
        let text = err.to_string();
        assert!(text.contains("V007"));
        assert!(text.contains("patches[0]"));
    }
}

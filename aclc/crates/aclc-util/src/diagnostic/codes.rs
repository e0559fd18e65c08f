//! Diagnostic codes for categorizing compiler errors and warnings.
//!
//! Every diagnostic the compiler can emit carries one [`ErrorCode`]. A code
//! has a stable numeric id (rendered `ACL0000`..`ACL0041`), a stable
//! kebab-case string id (the key used by `@enablewarning`/`@disablewarning`
//! and the CLI warning flags), and a default severity.

use super::Level;
use std::fmt;

/// A stable identifier for one kind of diagnostic.
///
/// # Examples
///
/// ```
/// use aclc_util::diagnostic::{ErrorCode, Level};
///
/// let code = ErrorCode::SymbolNotVisible;
/// assert_eq!(code.code(), 1);
/// assert_eq!(code.as_str(), "ACL0001");
/// assert_eq!(code.id(), "symbol-not-visible");
/// assert_eq!(code.severity(), Level::Error);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 0,
    SymbolNotVisible = 1,
    InvalidModifier = 2,
    StaticAccessViaInstance = 3,
    InstanceAccessViaStatic = 4,
    GenericsMismatch = 5,
    TooManyGenerics = 6,
    InsufficientGenerics = 7,
    DuplicateSymbol = 8,
    DuplicateImport = 9,
    DuplicateImportAlias = 10,
    ArgumentTypeMismatch = 11,
    TooManyArguments = 12,
    InsufficientArguments = 13,
    StaticSelf = 14,
    StaticSuper = 15,
    InvalidCommentBlockEnd = 16,
    InvalidFloatLiteral = 17,
    InvalidHexLiteral = 18,
    InvalidOctalLiteral = 19,
    InvalidBinaryLiteral = 20,
    InvalidLexicalSymbol = 21,
    InvalidUnicodeEscapeSequence = 22,
    InvalidInterpolation = 23,
    InvalidEscapeSequence = 24,
    InvalidStringLiteralEnd = 25,
    InvalidInput = 26,
    InvalidTag = 27,
    InvalidToken = 28,
    DuplicateVariableBlock = 29,
    NonstaticTemplateVariable = 30,
    NonfrontedSourceLock = 31,
    DuplicateDefaultCase = 32,
    NonfinalVariadicParameter = 33,
    InvalidReturnStatement = 34,
    InvalidThrowStatement = 35,
    InvalidFunctionCaller = 36,
    UndefinedSymbol = 37,
    InvalidSymbolForExpression = 38,
    TemplateConstructor = 39,
    UnresolvedSymbol = 40,
    UnresolvedImport = 41,
}

/// Total number of diagnostic codes; bound for warning bitmaps.
pub const ERROR_CODE_COUNT: usize = 42;

/// All diagnostic codes in numeric order.
pub const ALL_ERROR_CODES: [ErrorCode; ERROR_CODE_COUNT] = [
    ErrorCode::Unknown,
    ErrorCode::SymbolNotVisible,
    ErrorCode::InvalidModifier,
    ErrorCode::StaticAccessViaInstance,
    ErrorCode::InstanceAccessViaStatic,
    ErrorCode::GenericsMismatch,
    ErrorCode::TooManyGenerics,
    ErrorCode::InsufficientGenerics,
    ErrorCode::DuplicateSymbol,
    ErrorCode::DuplicateImport,
    ErrorCode::DuplicateImportAlias,
    ErrorCode::ArgumentTypeMismatch,
    ErrorCode::TooManyArguments,
    ErrorCode::InsufficientArguments,
    ErrorCode::StaticSelf,
    ErrorCode::StaticSuper,
    ErrorCode::InvalidCommentBlockEnd,
    ErrorCode::InvalidFloatLiteral,
    ErrorCode::InvalidHexLiteral,
    ErrorCode::InvalidOctalLiteral,
    ErrorCode::InvalidBinaryLiteral,
    ErrorCode::InvalidLexicalSymbol,
    ErrorCode::InvalidUnicodeEscapeSequence,
    ErrorCode::InvalidInterpolation,
    ErrorCode::InvalidEscapeSequence,
    ErrorCode::InvalidStringLiteralEnd,
    ErrorCode::InvalidInput,
    ErrorCode::InvalidTag,
    ErrorCode::InvalidToken,
    ErrorCode::DuplicateVariableBlock,
    ErrorCode::NonstaticTemplateVariable,
    ErrorCode::NonfrontedSourceLock,
    ErrorCode::DuplicateDefaultCase,
    ErrorCode::NonfinalVariadicParameter,
    ErrorCode::InvalidReturnStatement,
    ErrorCode::InvalidThrowStatement,
    ErrorCode::InvalidFunctionCaller,
    ErrorCode::UndefinedSymbol,
    ErrorCode::InvalidSymbolForExpression,
    ErrorCode::TemplateConstructor,
    ErrorCode::UnresolvedSymbol,
    ErrorCode::UnresolvedImport,
];

impl ErrorCode {
    /// The stable numeric id.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// The full rendered code string, e.g. `ACL0001`.
    pub fn as_str(self) -> String {
        format!("ACL{:04}", self.code())
    }

    /// The stable kebab-case string id, the key for warning enable/disable.
    pub const fn id(self) -> &'static str {
        match self {
            ErrorCode::Unknown => "unknown",
            ErrorCode::SymbolNotVisible => "symbol-not-visible",
            ErrorCode::InvalidModifier => "invalid-modifier",
            ErrorCode::StaticAccessViaInstance => "static-access-via-instance",
            ErrorCode::InstanceAccessViaStatic => "instance-access-via-static",
            ErrorCode::GenericsMismatch => "generics-mismatch",
            ErrorCode::TooManyGenerics => "too-many-generics",
            ErrorCode::InsufficientGenerics => "insufficient-generics",
            ErrorCode::DuplicateSymbol => "duplicate-symbol",
            ErrorCode::DuplicateImport => "duplicate-import",
            ErrorCode::DuplicateImportAlias => "duplicate-import-alias",
            ErrorCode::ArgumentTypeMismatch => "argument-type-mismatch",
            ErrorCode::TooManyArguments => "too-many-arguments",
            ErrorCode::InsufficientArguments => "insufficient-arguments",
            ErrorCode::StaticSelf => "static-self",
            ErrorCode::StaticSuper => "static-super",
            ErrorCode::InvalidCommentBlockEnd => "invalid-comment-block-end",
            ErrorCode::InvalidFloatLiteral => "invalid-float-literal",
            ErrorCode::InvalidHexLiteral => "invalid-hex-literal",
            ErrorCode::InvalidOctalLiteral => "invalid-octal-literal",
            ErrorCode::InvalidBinaryLiteral => "invalid-binary-literal",
            ErrorCode::InvalidLexicalSymbol => "invalid-lexical-symbol",
            ErrorCode::InvalidUnicodeEscapeSequence => "invalid-unicode-escape-sequence",
            ErrorCode::InvalidInterpolation => "invalid-interpolation",
            ErrorCode::InvalidEscapeSequence => "invalid-escape-sequence",
            ErrorCode::InvalidStringLiteralEnd => "invalid-string-literal-end",
            ErrorCode::InvalidInput => "invalid-input",
            ErrorCode::InvalidTag => "invalid-tag",
            ErrorCode::InvalidToken => "invalid-token",
            ErrorCode::DuplicateVariableBlock => "duplicate-variable-block",
            ErrorCode::NonstaticTemplateVariable => "nonstatic-template-variable",
            ErrorCode::NonfrontedSourceLock => "nonfronted-source-lock",
            ErrorCode::DuplicateDefaultCase => "duplicate-default-case",
            ErrorCode::NonfinalVariadicParameter => "nonfinal-variadic-parameter",
            ErrorCode::InvalidReturnStatement => "invalid-return-statement",
            ErrorCode::InvalidThrowStatement => "invalid-throw-statement",
            ErrorCode::InvalidFunctionCaller => "invalid-function-caller",
            ErrorCode::UndefinedSymbol => "undefined-symbol",
            ErrorCode::InvalidSymbolForExpression => "invalid-symbol-for-expression",
            ErrorCode::TemplateConstructor => "template-constructor",
            ErrorCode::UnresolvedSymbol => "unresolved-symbol",
            ErrorCode::UnresolvedImport => "unresolved-import",
        }
    }

    /// The default severity for this code.
    pub const fn severity(self) -> Level {
        match self {
            ErrorCode::StaticAccessViaInstance | ErrorCode::NonfrontedSourceLock => Level::Warning,
            _ => Level::Error,
        }
    }

    /// Look up a code by its kebab-case string id.
    pub fn from_id(id: &str) -> Option<ErrorCode> {
        ALL_ERROR_CODES.iter().copied().find(|c| c.id() == id)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_numbers_are_stable() {
        assert_eq!(ErrorCode::Unknown.code(), 0);
        assert_eq!(ErrorCode::SymbolNotVisible.code(), 1);
        assert_eq!(ErrorCode::InvalidLexicalSymbol.code(), 21);
        assert_eq!(ErrorCode::UnresolvedImport.code(), 41);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(ErrorCode::Unknown.as_str(), "ACL0000");
        assert_eq!(ErrorCode::UnresolvedImport.as_str(), "ACL0041");
    }

    #[test]
    fn test_warning_severities() {
        assert_eq!(ErrorCode::StaticAccessViaInstance.severity(), Level::Warning);
        assert_eq!(ErrorCode::NonfrontedSourceLock.severity(), Level::Warning);
        assert_eq!(ErrorCode::InstanceAccessViaStatic.severity(), Level::Error);
    }

    #[test]
    fn test_from_id_round_trip() {
        for code in ALL_ERROR_CODES {
            assert_eq!(ErrorCode::from_id(code.id()), Some(code));
        }
        assert_eq!(ErrorCode::from_id("not-a-code"), None);
    }

    #[test]
    fn test_all_codes_in_numeric_order() {
        for (i, code) in ALL_ERROR_CODES.iter().enumerate() {
            assert_eq!(code.code() as usize, i);
        }
    }
}

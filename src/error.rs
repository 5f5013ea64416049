/// Failure categories surfaced to callers of `TimeData::frame` and
/// `compute_spreads`. None of them are recovered internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A date string (or number) could not be interpreted.
    DateFormat,
    /// The date input had a type the parser does not accept.
    DateType,
    /// The local store has no rows but a maximum date was required.
    EmptyDataset,
    /// A maturity label is not a column of the frame.
    UnknownColumn,
    /// Network failure or an unexpected page structure.
    RemoteFetch,
    /// Unknown dataset name or malformed configuration.
    Configuration,
    /// Local file or CSV I/O failure.
    Storage,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::DateFormat
            | ErrorKind::DateType
            | ErrorKind::UnknownColumn
            | ErrorKind::Configuration
            | ErrorKind::Storage => 2,
            ErrorKind::EmptyDataset => 3,
            ErrorKind::RemoteFetch => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            exit_code: kind.exit_code(),
            message: message.into(),
        }
    }

    pub fn date_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DateFormat, message)
    }

    pub fn date_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DateType, message)
    }

    pub fn empty_dataset(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyDataset, message)
    }

    pub fn unknown_column(label: &str) -> Self {
        Self::new(ErrorKind::UnknownColumn, format!("Unknown column: `{label}`"))
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteFetch, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

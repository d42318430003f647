use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadIPFormatting(String),
    BadPort(u16),
    NotInRange(String),
    DirectoryNotWritable(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::BadPort(p) => write!(f, "Invalid port: {}", p),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::DirectoryNotWritable(e) => write!(f, "Directory error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum StorageError {
    WriteFailed(String),
    ReadFailed(String),
    NotFound(String),
    InvalidName(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
            StorageError::NotFound(e) => write!(f, "File not found: {}", e),
            StorageError::InvalidName(e) => write!(f, "Invalid file name: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Failures while turning an uploaded file into rows.
#[derive(Debug)]
pub enum SheetError {
    Workbook(String),
    NoWorksheet,
    Csv(String),
    IoError(std::io::Error),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::Workbook(e) => write!(f, "Unable to read workbook: {}", e),
            SheetError::NoWorksheet => write!(f, "Workbook has no worksheet"),
            SheetError::Csv(e) => write!(f, "Unable to read CSV: {}", e),
            SheetError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for SheetError {}

impl From<std::io::Error> for SheetError {
    fn from(err: std::io::Error) -> Self {
        SheetError::IoError(err)
    }
}

impl From<calamine::Error> for SheetError {
    fn from(err: calamine::Error) -> Self {
        SheetError::Workbook(err.to_string())
    }
}

impl From<csv::Error> for SheetError {
    fn from(err: csv::Error) -> Self {
        SheetError::Csv(err.to_string())
    }
}

#[derive(Debug)]
pub enum ReportError {
    ImageError(String),
    IoError(std::io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::ImageError(e) => write!(f, "Logo could not be loaded: {}", e),
            ReportError::IoError(e) => write!(f, "Report IO error: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::IoError(err)
    }
}

impl From<image::ImageError> for ReportError {
    fn from(err: image::ImageError) -> Self {
        ReportError::ImageError(err.to_string())
    }
}

#[derive(Debug)]
pub enum TaskError {
    Sheet(SheetError),
    Storage(StorageError),
    Join(String),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Sheet(e) => write!(f, "{}", e),
            TaskError::Storage(e) => write!(f, "{}", e),
            TaskError::Join(e) => write!(f, "Validation worker failed: {}", e),
        }
    }
}

impl std::error::Error for TaskError {}

impl From<SheetError> for TaskError {
    fn from(err: SheetError) -> Self {
        TaskError::Sheet(err)
    }
}

impl From<StorageError> for TaskError {
    fn from(err: StorageError) -> Self {
        TaskError::Storage(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
    Config(ConfigError),
    Storage(StorageError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
            WebError::Config(e) => write!(f, "Web server configuration error: {}", e),
            WebError::Storage(e) => write!(f, "Web server storage error: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

impl From<ConfigError> for WebError {
    fn from(err: ConfigError) -> Self {
        WebError::Config(err)
    }
}

impl From<StorageError> for WebError {
    fn from(err: StorageError) -> Self {
        WebError::Storage(err)
    }
}

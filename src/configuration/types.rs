// Working directories, relative to the process working directory
pub const UPLOAD_FOLDER: &str = "temp_uploads";
pub const DOWNLOAD_FOLDER: &str = "temp_downloads";
pub const LOG_FOLDER: &str = "logs";
pub const STATIC_FOLDER: &str = "static";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_LOGO_FILE: &str = "Logo_del_Gobierno_de_México.png";
pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
/// One day.
pub const DEFAULT_TASK_TTL_SECS: u64 = 86_400;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 600;
/// One hundred years.
pub const MAX_TASK_TTL_SECS: u64 = 100 * 365 * 86_400;

use serde::Serialize;
use uuid::Uuid;

/// Name of the multipart field carrying the uploaded sheet.
pub const UPLOAD_FIELD: &str = "archivo";

/// Methods announced to CORS preflight requests.
pub const CORS_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";

pub const MSG_NO_FILE_FIELD: &str = "No se encontró archivo";
pub const MSG_NO_FILE_SELECTED: &str = "No se seleccionó archivo";
pub const MSG_NO_ERRORS: &str = "No hay errores registrados para este task_id.";
pub const MSG_FILE_NOT_FOUND: &str = "Archivo no encontrado";
pub const MSG_TOO_LARGE: &str = "El archivo excede el tamaño máximo permitido";
pub const MSG_BAD_REQUEST: &str = "Solicitud inválida";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Método no permitido";
pub const MSG_INTERNAL: &str = "Error interno del servidor";

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub tasks: usize,
}

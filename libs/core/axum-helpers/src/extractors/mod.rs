//! Custom extractors that reject with [`crate::AppError`] so every 400 has the same body.

pub mod id_path;
pub mod validated_json;

pub use id_path::IdPath;
pub use validated_json::ValidatedJson;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to start OCR engine `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to exchange data with the OCR engine")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to encode region for the OCR engine")]
    Encode {
        #[from]
        source: image::ImageError,
    },

    #[error("OCR engine exited with {status}: {stderr}")]
    EngineFailed { status: String, stderr: String },

    #[error("OCR engine rejected the request: {message}")]
    Rejected { message: String },
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Failed to create rotation transformation for angle {angle}")]
    ProjectionFailed { angle: f32 },

    #[error(
        "Crop region ({x}, {y}, {width}x{height}) lies outside a {image_width}x{image_height} image"
    )]
    CropOutOfBounds {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        image_width: u32,
        image_height: u32,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

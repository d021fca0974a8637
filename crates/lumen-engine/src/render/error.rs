#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("buffer creation failed: {0}")]
    BufferCreation(String),

    #[error("empty {0} buffer")]
    EmptyBuffer(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("shader '{name}' failed to compile: {message}")]
    Compile { name: String, message: String },

    #[error("shader '{name}' failed to link: {message}")]
    Link { name: String, message: String },
}

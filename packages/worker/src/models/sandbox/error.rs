use thiserror::Error;

/// Infrastructure failures. Program failures (compile errors, crashes,
/// timeouts) are verdicts, never `SandboxError`.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Scratch directory error: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Failed to launch {backend}: {message}")]
    Launch {
        backend: &'static str,
        message: String,
    },

    #[error("{backend} backend error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("Primary backend failed ({primary}); fallback failed ({fallback})")]
    AllBackendsFailed { primary: String, fallback: String },
}

impl SandboxError {
    pub fn launch(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Launch {
            backend,
            message: message.into(),
        }
    }

    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }

    /// Machine-readable code carried into `JudgeSystemErrorInfo`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Scratch(_) => "SCRATCH_ERROR",
            Self::Launch { .. } => "SANDBOX_UNAVAILABLE",
            Self::Backend { .. } => "SANDBOX_ERROR",
            Self::AllBackendsFailed { .. } => "SANDBOX_UNAVAILABLE",
        }
    }
}

use std::fmt;
use std::path::PathBuf;

/// Why a mesh's topology cannot be turned into geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("index {index} out of range for {what} of length {len}")]
    IndexOutOfRange { what: &'static str, index: u32, len: usize },

    #[error("face {face} needs {needed} corners but only {available} indices remain")]
    FaceOverrun { face: usize, needed: usize, available: usize },

    #[error("face {face} has {corners} corner(s); at least 2 are required")]
    DegenerateFace { face: usize, corners: u32 },
}

/// Failures the viewport reports without stopping.
///
/// Only [`ViewerError::ShaderCompile`] is fatal, and only at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    #[error("mesh {mesh}: malformed topology: {source}")]
    MalformedTopology {
        mesh: String,
        #[source]
        source: TopologyError,
    },

    #[error("texture {}: {reason}", path.display())]
    TextureLoad { path: PathBuf, reason: String },

    #[error("shader `{label}` failed to compile: {reason}")]
    ShaderCompile { label: String, reason: String },

    #[error("mesh {mesh} has no UV set named `{name}`")]
    InvalidUvSet { mesh: String, name: String },
}

impl ViewerError {
    pub fn severity(&self) -> Severity {
        match self {
            ViewerError::InvalidUvSet { .. } => Severity::Warning,
            ViewerError::MalformedTopology { .. } | ViewerError::TextureLoad { .. } => {
                Severity::Error
            }
            ViewerError::ShaderCompile { .. } => Severity::Fatal,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        })
    }
}

/// A reported failure, delivered to observers and the log.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: ViewerError,
}

impl Diagnostic {
    pub fn new(error: ViewerError) -> Self {
        Self { severity: error.severity(), error }
    }

    /// Per-item failures are `warn`; only fatal ones reach `error`.
    pub fn log(&self) {
        match self.severity {
            Severity::Warning | Severity::Error => log::warn!("{}", self.error),
            Severity::Fatal => log::error!("{}", self.error),
        }
    }
}

impl From<ViewerError> for Diagnostic {
    fn from(error: ViewerError) -> Self {
        Diagnostic::new(error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.error)
    }
}

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecweaveError {
    #[error("Error while discovering spec files:\n{0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Invalid spec set:\n{0}")]
    Identifier(#[from] IdentifierError),

    #[error("Error while wiring the task graph:\n{0}")]
    Wiring(#[from] WiringError),

    #[error("Error while generating clients:\n{0}")]
    Build(#[from] BuildError),

    #[error("Couldn't render the plan.\n{0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("Spec '{file}' derives a degenerate identifier: {reason}")]
    Degenerate { file: Utf8PathBuf, reason: String },

    #[error("Specs '{first}' and '{second}' both derive {kind} '{value}'")]
    Collision {
        kind: &'static str,
        value: String,
        first: Utf8PathBuf,
        second: Utf8PathBuf,
    },
}

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("Host tasks are still being registered, wiring must wait until registration is closed")]
    HostTasksPending,

    #[error("Host task registration is closed, can't register '{0}'")]
    RegistrationClosed(String),

    #[error("Task graph has already been wired")]
    AlreadyWired,

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task '{0}' not found")]
    UnknownTask(String),

    #[error("Cycle detected in task graph at '{0}'")]
    Cycle(String),
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Couldn't create output directory '{path}'.\n{source}")]
    OutputDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't start '{program}'.\n{source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}{}", status_label(.code), stderr_label(.stderr))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn status_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn stderr_label(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Couldn't read spec '{0}'.\n{1}")]
    Spec(Utf8PathBuf, std::io::Error),

    #[error("Generation unit '{unit}' ({file}) failed:\n{source}{}", blocked_label(.blocked))]
    Generator {
        unit: String,
        file: Utf8PathBuf,
        #[source]
        source: GeneratorError,
        /// Tasks that transitively depend on the failed unit.
        blocked: Vec<String>,
    },

    #[error("Generation unit '{unit}' panicked: {message}{}", blocked_label(.blocked))]
    Panic {
        unit: String,
        message: String,
        blocked: Vec<String>,
    },
}

fn blocked_label(blocked: &[String]) -> String {
    if blocked.is_empty() {
        String::new()
    } else {
        format!("\nBlocked tasks: {}", blocked.join(", "))
    }
}

impl BuildError {
    /// Id of the generation unit that failed, if the error is tied to one.
    pub fn unit(&self) -> Option<&str> {
        match self {
            BuildError::Generator { unit, .. } | BuildError::Panic { unit, .. } => Some(unit),
            _ => None,
        }
    }

    /// Tasks that can't run because of this failure.
    pub fn blocked(&self) -> &[String] {
        match self {
            BuildError::Generator { blocked, .. } | BuildError::Panic { blocked, .. } => blocked,
            _ => &[],
        }
    }

    pub(crate) fn with_blocked(mut self, tasks: Vec<String>) -> Self {
        if let BuildError::Generator { blocked, .. } | BuildError::Panic { blocked, .. } = &mut self {
            *blocked = tasks;
        }
        self
    }
}

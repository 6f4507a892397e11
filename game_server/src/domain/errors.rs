// Domain-level errors for registry and round workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    InvalidUsername,
    AlreadyJoined,
    UnknownPlayer,
    NotPlaying,
    PlayerDead,
    PlayerAlive,
}

impl RegistryError {
    /// Short machine-friendly reason, used when an error is surfaced to a client.
    pub fn reason(self) -> &'static str {
        match self {
            RegistryError::InvalidUsername => "username must be at least 2 characters",
            RegistryError::AlreadyJoined => "already joined",
            RegistryError::UnknownPlayer => "unknown player",
            RegistryError::NotPlaying => "round is not in progress",
            RegistryError::PlayerDead => "player is dead",
            RegistryError::PlayerAlive => "player is alive",
        }
    }
}

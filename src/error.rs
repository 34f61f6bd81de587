#[derive(Debug, thiserror::Error)]
pub enum FlightError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Buffer overflow: document exceeds {capacity} bytes before truncation point")]
    BufferOverflow { capacity: usize },

    #[error("Truncation marker not found before end of stream")]
    TruncationNotFound,
}

impl FlightError {
    pub fn is_transport(&self) -> bool {
        matches!(self, FlightError::Transport(_))
    }
}

impl From<serde_json::Error> for FlightError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            FlightError::Transport(err.to_string())
        } else {
            FlightError::Parse(err.to_string())
        }
    }
}

pub type FlightResult<T> = Result<T, FlightError>;

//! Error types returned by the retry transport
//!
//! When the decision function stops the sequence, the last attempt's outcome
//! is returned as-is: a transport error is wrapped in
//! [`RetryError::Transport`] without further decoration. The other variants
//! cover failures that belong to the retry layer itself.

use std::error::Error;
use std::fmt;
use std::io;

use super::predicates::TransientError;

/// Errors that can occur while sending a request through the retry transport
#[derive(Debug)]
pub enum RetryError<E> {
    /// The request body could not be read into memory
    ///
    /// No attempt is made in this case.
    BufferBody(io::Error),

    /// The final attempt failed with this transport error
    Transport(E),

    /// The request was cancelled while waiting between attempts
    Cancelled {
        /// Number of attempts made before cancellation
        attempts: u32,
        /// The error from the last attempt, if it produced one
        last_error: Option<E>,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::BufferBody(err) => write!(f, "failed to buffer request body: {}", err),
            RetryError::Transport(err) => fmt::Display::fmt(err, f),
            RetryError::Cancelled {
                attempts,
                last_error,
            } => {
                if let Some(err) = last_error {
                    write!(f, "retry cancelled after {} attempts: {}", attempts, err)
                } else {
                    write!(f, "retry cancelled after {} attempts", attempts)
                }
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::BufferBody(err) => Some(err),
            RetryError::Transport(err) => err.source(),
            RetryError::Cancelled {
                last_error: Some(err),
                ..
            } => Some(err),
            RetryError::Cancelled { .. } => None,
        }
    }
}

impl<E: TransientError> TransientError for RetryError<E> {
    fn is_temporary(&self) -> bool {
        match self {
            RetryError::Transport(err) => err.is_temporary(),
            RetryError::BufferBody(_) | RetryError::Cancelled { .. } => false,
        }
    }
}

impl<E> RetryError<E> {
    /// Create a new cancelled error
    pub fn cancelled(attempts: u32, last_error: Option<E>) -> Self {
        RetryError::Cancelled {
            attempts,
            last_error,
        }
    }

    /// Number of attempts made, when the retry layer knows it
    ///
    /// A transport error is handed back verbatim, so its count is `None`;
    /// observers see it through `on_complete`.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::BufferBody(_) => Some(0),
            RetryError::Cancelled { attempts, .. } => Some(*attempts),
            RetryError::Transport(_) => None,
        }
    }

    pub fn is_buffer_body(&self) -> bool {
        matches!(self, RetryError::BufferBody(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RetryError::Transport(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Get the transport error, consuming this error
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Transport(err) => Some(err),
            RetryError::Cancelled { last_error, .. } => last_error,
            RetryError::BufferBody(_) => None,
        }
    }

    /// Get a reference to the transport error
    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Transport(err) => Some(err),
            RetryError::Cancelled { last_error, .. } => last_error.as_ref(),
            RetryError::BufferBody(_) => None,
        }
    }

    /// Map the transport error type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::BufferBody(err) => RetryError::BufferBody(err),
            RetryError::Transport(err) => RetryError::Transport(f(err)),
            RetryError::Cancelled {
                attempts,
                last_error,
            } => RetryError::Cancelled {
                attempts,
                last_error: last_error.map(f),
            },
        }
    }
}

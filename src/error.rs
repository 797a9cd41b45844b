//! Error types and handling for `tripcast`

use thiserror::Error;

/// Main error type for the `tripcast` application
#[derive(Error, Debug)]
pub enum TripcastError {
    /// A location's forecast has too few samples to summarize
    #[error("Insufficient forecast data for {location}: {available} of {required} samples")]
    InsufficientData {
        location: String,
        available: usize,
        required: usize,
    },

    /// The user's preference cannot be scored
    #[error("Invalid preference: {message}")]
    InvalidPreference { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Weather API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Report delivery errors
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl TripcastError {
    /// Create a new insufficient data error
    pub fn insufficient_data<S: Into<String>>(location: S, available: usize, required: usize) -> Self {
        Self::InsufficientData {
            location: location.into(),
            available,
            required,
        }
    }

    /// Create a new invalid preference error
    pub fn invalid_preference<S: Into<String>>(message: S) -> Self {
        Self::InvalidPreference {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TripcastError::InsufficientData { location, .. } => {
                format!("Not enough forecast data for {location}; it was left out of the ranking.")
            }
            TripcastError::InvalidPreference { message } => {
                format!("Invalid preference: {message}")
            }
            TripcastError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TripcastError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            TripcastError::Api { .. } => {
                "Unable to reach the weather service. Please check your internet connection."
                    .to_string()
            }
            TripcastError::Transport { .. } => {
                "The report could not be delivered. Please check your email settings.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TripcastError::insufficient_data("Athens, Greece", 0, 5);
        assert!(matches!(
            err,
            TripcastError::InsufficientData {
                available: 0,
                required: 5,
                ..
            }
        ));

        let pref_err = TripcastError::invalid_preference("selector 4");
        assert!(matches!(pref_err, TripcastError::InvalidPreference { .. }));

        let config_err = TripcastError::config("missing API key");
        assert!(matches!(config_err, TripcastError::Config { .. }));
    }

    #[test]
    fn test_display_includes_counts() {
        let err = TripcastError::insufficient_data("Lagos, Portugal", 2, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient forecast data for Lagos, Portugal: 2 of 5 samples"
        );
    }

    #[test]
    fn test_user_messages() {
        let err = TripcastError::insufficient_data("Mauritius", 0, 5);
        assert!(err.user_message().contains("Mauritius"));

        let api_err = TripcastError::api("test");
        assert!(api_err.user_message().contains("Unable to reach"));

        let transport_err = TripcastError::transport("smtp down");
        assert!(transport_err.user_message().contains("could not be delivered"));

        let validation_err = TripcastError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }
}

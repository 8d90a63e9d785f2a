use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::AppError;
use crate::services::locations::{GeocodingResponse, LocationClient, MIN_QUERY_LEN};

/// How long the destination field must stay untouched before a lookup fires.
pub const QUIET_PERIOD: Duration = Duration::from_millis(1000);

pub const NOT_FOUND_ERROR: &str = "Destination not found";
pub const LOOKUP_FAILED_ERROR: &str = "Failed to validate destination";

/// UI-visible validation state of the destination field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValidationState {
    /// No validation attempted, or input fell below the minimum length.
    #[default]
    Idle,
    /// A lookup is outstanding for the current input.
    Validating,
    Valid {
        latitude: f64,
        longitude: f64,
    },
    Invalid {
        error: &'static str,
    },
}

/// Seam over the geocoding client so the validator can be driven with
/// scripted latencies and results in tests.
#[async_trait]
pub trait GeocodeLookup: Send + Sync + 'static {
    async fn lookup(&self, query: &str) -> Result<GeocodingResponse, AppError>;
}

#[async_trait]
impl GeocodeLookup for LocationClient {
    async fn lookup(&self, query: &str) -> Result<GeocodingResponse, AppError> {
        self.search(query).await
    }
}

struct Inner {
    /// Monotonically increasing per keystroke. Every debounce wait and every
    /// lookup response re-checks it; anything issued for an older generation
    /// is discarded, so a slow stale response can never overwrite the state
    /// produced by newer input. The transport call itself is not cancelled.
    generation: u64,
    state: ValidationState,
    coordinates: Option<(f64, f64)>,
}

/// Debounced destination validation: watches free-text input, resolves it to
/// coordinates after a quiet period, and caches the last successful pair for
/// trip submission. Submission is not gated on success.
#[derive(Clone)]
pub struct DestinationValidator {
    lookup: Arc<dyn GeocodeLookup>,
    inner: Arc<Mutex<Inner>>,
}

impl DestinationValidator {
    pub fn new(lookup: Arc<dyn GeocodeLookup>) -> Self {
        Self {
            lookup,
            inner: Arc::new(Mutex::new(Inner {
                generation: 0,
                state: ValidationState::Idle,
                coordinates: None,
            })),
        }
    }

    /// Feed the current value of the destination field. Call on every edit.
    pub fn on_input(&self, text: &str) {
        let text = text.to_string();
        let generation = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            if text.chars().count() < MIN_QUERY_LEN {
                // The bumped generation already supersedes any in-flight
                // lookup; clear state and field error without a network call.
                inner.state = ValidationState::Idle;
                inner.coordinates = None;
                return;
            }
            inner.generation
        };

        let lookup = Arc::clone(&self.lookup);
        let shared = Arc::clone(&self.inner);
        tokio::spawn(async move {
            sleep(QUIET_PERIOD).await;
            {
                let mut inner = lock(&shared);
                if inner.generation != generation {
                    // Newer input arrived during the quiet period.
                    return;
                }
                inner.state = ValidationState::Validating;
            }

            let result = lookup.lookup(&text).await;

            let mut inner = lock(&shared);
            if inner.generation != generation {
                // Stale response; a newer attempt owns the state now.
                return;
            }
            match result {
                Ok(response) => match response.results.first() {
                    Some(found) => {
                        inner.coordinates = Some((found.latitude, found.longitude));
                        inner.state = ValidationState::Valid {
                            latitude: found.latitude,
                            longitude: found.longitude,
                        };
                    }
                    None => {
                        inner.coordinates = None;
                        inner.state = ValidationState::Invalid {
                            error: NOT_FOUND_ERROR,
                        };
                    }
                },
                Err(_) => {
                    inner.coordinates = None;
                    inner.state = ValidationState::Invalid {
                        error: LOOKUP_FAILED_ERROR,
                    };
                }
            }
        });
    }

    pub fn state(&self) -> ValidationState {
        lock(&self.inner).state.clone()
    }

    /// Inline field error, if any.
    pub fn field_error(&self) -> Option<&'static str> {
        match lock(&self.inner).state {
            ValidationState::Invalid { error } => Some(error),
            _ => None,
        }
    }

    /// Coordinates from the last successful validation, for attaching to the
    /// trip at submission time. May be absent.
    pub fn submission_coordinates(&self) -> Option<(f64, f64)> {
        lock(&self.inner).coordinates
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

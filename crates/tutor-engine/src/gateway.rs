//! Generation gateway with ordered fallback.
//!
//! The gateway never fails. It tries each candidate backend in order, each
//! attempt bounded by a timeout, and returns the first result that parses
//! into the requested type. When every candidate fails it returns the type's
//! default and reports the failures alongside it.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::GenerationBackend;
use crate::error::GenerationError;
use crate::generation::Generated;
use crate::prompt::GenerationRequest;

/// Result of one gateway invocation.
#[derive(Debug, Clone)]
pub struct GatewayOutcome<T> {
    /// The parsed result, or the schema default.
    pub value: T,
    /// Name of the backend that produced `value`, `None` for a default.
    pub backend: Option<String>,
    /// Failed attempts, in the order they were made.
    pub failures: Vec<GenerationError>,
}

impl<T> GatewayOutcome<T> {
    /// Returns `true` if `value` is the schema default.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.backend.is_none()
    }
}

/// Invokes generation backends in a fixed order.
#[derive(Clone)]
pub struct GenerationGateway {
    candidates: Vec<Arc<dyn GenerationBackend>>,
    timeout: Duration,
}

impl std::fmt::Debug for GenerationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.candidates.iter().map(|c| c.name()).collect();
        f.debug_struct("GenerationGateway")
            .field("candidates", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenerationGateway {
    /// Creates a gateway over `candidates` with a per-attempt `timeout`.
    #[must_use]
    pub fn new(candidates: Vec<Arc<dyn GenerationBackend>>, timeout: Duration) -> Self {
        Self {
            candidates,
            timeout,
        }
    }

    /// Names of the candidates, in order.
    #[must_use]
    pub fn candidate_names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.name().to_string()).collect()
    }

    /// Per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests a `T` for `request`.
    ///
    /// A finished session gets the default without any backend being
    /// contacted.
    pub async fn invoke<T: Generated>(
        &self,
        request: &GenerationRequest,
        finished: bool,
    ) -> GatewayOutcome<T> {
        let schema = T::SCHEMA;
        let mut failures = Vec::new();

        if finished {
            tracing::debug!(%schema, "Session finished, skipping generation");
            return GatewayOutcome {
                value: T::default(),
                backend: None,
                failures,
            };
        }

        for candidate in &self.candidates {
            let name = candidate.name();
            tracing::debug!(%schema, backend = name, "Generation attempt");

            let attempt = tokio::time::timeout(self.timeout, candidate.generate(request, schema))
                .await
                .unwrap_or_else(|_| Err(GenerationError::timeout(name, self.timeout)))
                .and_then(|value| parse::<T>(name, value));

            match attempt {
                Ok(value) => {
                    return GatewayOutcome {
                        value,
                        backend: Some(name.to_string()),
                        failures,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        %schema,
                        backend = name,
                        kind = %e.kind,
                        transient = e.is_transient(),
                        error = %e.message,
                        "Generation attempt failed, trying next candidate"
                    );
                    failures.push(e);
                }
            }
        }

        tracing::warn!(
            %schema,
            attempts = failures.len(),
            "All generation candidates failed, using default"
        );
        GatewayOutcome {
            value: T::default(),
            backend: None,
            failures,
        }
    }
}

fn parse<T: Generated>(backend: &str, value: serde_json::Value) -> Result<T, GenerationError> {
    let parsed: T = serde_json::from_value(value).map_err(|e| {
        GenerationError::malformed(backend, format!("does not match {}: {e}", T::SCHEMA))
    })?;
    if parsed.is_usable() {
        Ok(parsed)
    } else {
        Err(GenerationError::malformed(
            backend,
            format!("empty {} result", T::SCHEMA),
        ))
    }
}

//! Runtime support for compiled pipelines
//!
//! Generated stacks use [`MiddlewareResponse`] and [`Outcome`] directly.
//! [`Executor`] interprets a [`PipelineDescription`] without code generation,
//! with the same first-failure-wins semantics.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::pipeline::{PipelineDescription, Transition};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Response specification returned by a middleware that ends the request early
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseSpec {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Result overriding the handler: an explicit response or a wrapped error
pub enum MiddlewareResponse {
    Error(BoxError),
    Respond(ResponseSpec),
}

impl MiddlewareResponse {
    pub fn error(err: impl Into<BoxError>) -> Self {
        Self::Error(err.into())
    }

    pub fn respond(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::Respond(ResponseSpec {
            status,
            headers: Vec::new(),
            body: body.into(),
        })
    }

    /// Add a header; errors carry no headers and are returned unchanged
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Respond(spec) = &mut self {
            spec.headers.push((name.into(), value.into()));
        }
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Status to send; errors render as 500
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Error(_) => 500,
            Self::Respond(spec) => spec.status,
        }
    }

    /// Body to send; error details are never exposed to the client
    pub fn body(&self) -> &[u8] {
        match self {
            Self::Error(_) => b"Server Error".as_slice(),
            Self::Respond(spec) => &spec.body,
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        match self {
            Self::Error(_) => &[],
            Self::Respond(spec) => &spec.headers,
        }
    }
}

impl fmt::Debug for MiddlewareResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(err) => f.debug_tuple("Error").field(&err.to_string()).finish(),
            Self::Respond(spec) => f.debug_tuple("Respond").field(spec).finish(),
        }
    }
}

/// What a single middleware invocation reports
#[derive(Debug, Default)]
pub struct Outcome {
    pub early_response: Option<MiddlewareResponse>,
    pub error: Option<BoxError>,
}

impl Outcome {
    /// Neither response nor error: continue with the next middleware
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn respond(response: MiddlewareResponse) -> Self {
        Self {
            early_response: Some(response),
            error: None,
        }
    }

    pub fn fail(err: impl Into<BoxError>) -> Self {
        Self {
            early_response: None,
            error: Some(err.into()),
        }
    }

    /// Response returned when `transition` terminates the pipeline
    pub fn into_terminal_response(self, transition: Transition) -> Option<MiddlewareResponse> {
        let wrapped = self.error.map(MiddlewareResponse::Error);
        match transition {
            Transition::Continue => None,
            Transition::ReturnOverride => self.early_response.or(wrapped),
            Transition::ReturnWrappedError => wrapped.or(self.early_response),
        }
    }
}

impl<E: Into<BoxError>> From<Result<(), E>> for Outcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::proceed(),
            Err(err) => Self::fail(err),
        }
    }
}

/// A component the executor can invoke
pub trait Middleware<R>: Any {
    /// `bundle` is supplied only to components declared with a dependency bundle
    fn run(&self, req: &R, bundle: Option<&Bundle<'_, R>>) -> Outcome;
}

/// Every component of a pipeline, keyed by capability
pub struct Bundle<'a, R> {
    components: &'a BTreeMap<String, Box<dyn Middleware<R>>>,
}

impl<'a, R: 'static> Bundle<'a, R> {
    pub fn get(&self, capability: &str) -> Option<&'a (dyn Middleware<R> + 'static)> {
        self.components.get(capability).map(|c| c.as_ref())
    }

    /// Concrete component behind a capability
    pub fn downcast<T: Middleware<R>>(&self, capability: &str) -> Option<&'a T> {
        let component: &'a (dyn Any + 'static) = self.get(capability)?;
        component.downcast_ref::<T>()
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &'a str> + use<'a, R> {
        self.components.keys().map(String::as_str)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    #[error("no instance supplied for {0}")]
    MissingComponent(String),

    #[error("{0} is not part of the pipeline")]
    UnknownComponent(String),

    #[error("{0} was supplied more than once")]
    DuplicateComponent(String),
}

/// Interprets a pipeline description over one instance of each component
pub struct Executor<R> {
    pipeline: PipelineDescription,
    components: BTreeMap<String, Box<dyn Middleware<R>>>,
}

impl<R: 'static> Executor<R> {
    pub fn new<I>(pipeline: PipelineDescription, components: I) -> Result<Self, WiringError>
    where
        I: IntoIterator<Item = (String, Box<dyn Middleware<R>>)>,
    {
        let mut wired = BTreeMap::new();
        for (capability, component) in components {
            if pipeline.step(&capability).is_none() {
                return Err(WiringError::UnknownComponent(capability));
            }
            if wired.insert(capability.clone(), component).is_some() {
                return Err(WiringError::DuplicateComponent(capability));
            }
        }
        if let Some(step) = pipeline
            .steps
            .iter()
            .find(|s| !wired.contains_key(&s.capability))
        {
            return Err(WiringError::MissingComponent(step.capability.clone()));
        }

        Ok(Self {
            pipeline,
            components: wired,
        })
    }

    pub fn pipeline(&self) -> &PipelineDescription {
        &self.pipeline
    }

    /// Run every step in order, stopping at the first early response or error
    ///
    /// A step with no wired instance ends the run with a wrapped
    /// [`WiringError`].
    pub fn run(&self, req: &R) -> Result<Bundle<'_, R>, MiddlewareResponse> {
        let bundle = Bundle {
            components: &self.components,
        };

        for step in &self.pipeline.steps {
            let Some(component) = self.components.get(&step.capability) else {
                let missing = WiringError::MissingComponent(step.capability.clone());
                return Err(MiddlewareResponse::error(missing));
            };
            let outcome = component.run(req, step.pass_bundle.then_some(&bundle));
            let transition = step.short_circuit.evaluate(&outcome);
            trace!(step = step.position, capability = %step.capability, ?transition, "ran step");

            if let Some(response) = outcome.into_terminal_response(transition) {
                return Err(response);
            }
        }

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_renders_as_server_error() {
        let response = MiddlewareResponse::error("database down");
        assert!(response.is_error());
        assert_eq!(response.status_code(), 500);
        assert_eq!(response.body(), b"Server Error");
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_respond_keeps_status_body_and_headers() {
        let response = MiddlewareResponse::respond(400, "Must supply a content type")
            .with_header("content-type", "text/plain");
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.body(), b"Must supply a content type");
        assert_eq!(
            response.headers(),
            &[("content-type".to_string(), "text/plain".to_string())]
        );
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: Outcome = Ok::<(), BoxError>(()).into();
        assert!(ok.early_response.is_none() && ok.error.is_none());

        let failed: Outcome = Err::<(), _>("bad token").into();
        assert_eq!(failed.error.unwrap().to_string(), "bad token");
    }

    #[test]
    fn test_terminal_response_per_transition() {
        assert!(
            Outcome::fail("x")
                .into_terminal_response(Transition::Continue)
                .is_none()
        );

        let response = Outcome::fail("x")
            .into_terminal_response(Transition::ReturnWrappedError)
            .unwrap();
        assert!(response.is_error());

        let response = Outcome::respond(MiddlewareResponse::respond(302, ""))
            .into_terminal_response(Transition::ReturnOverride)
            .unwrap();
        assert_eq!(response.status_code(), 302);
    }

    #[test]
    fn test_unwired_step_fails_instead_of_being_skipped() {
        use crate::graph::ComponentId;
        use crate::pipeline::{ShortCircuit, Step};
        use crate::symbols::QualifiedName;

        let pipeline = PipelineDescription {
            target: QualifiedName::new("self", "Root"),
            steps: vec![Step {
                position: 0,
                component: ComponentId(0),
                capability: "self::Auth".to_string(),
                implementation: QualifiedName::new("self", "AuthMiddleware"),
                pass_bundle: false,
                bundle: None,
                short_circuit: ShortCircuit::default(),
            }],
        };
        let executor: Executor<()> = Executor {
            pipeline,
            components: BTreeMap::new(),
        };

        let Err(response) = executor.run(&()) else {
            panic!("an unwired step must stop the pipeline");
        };
        assert_eq!(response.status_code(), 500);
        let MiddlewareResponse::Error(err) = response else {
            panic!("expected a wrapped error");
        };
        assert_eq!(err.to_string(), "no instance supplied for self::Auth");
    }
}

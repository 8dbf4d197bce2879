//! Shared fixtures for compiler integration tests
//!
//! Builds symbol tables the way a front-end would describe a source file:
//! stack contracts, capability contracts and their `…Middleware` types.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use typed_middleware::{
    Bundle, InMemorySymbolTable, InterfaceDecl, Middleware, MethodSig, MiddlewareResponse,
    Outcome, TypeDecl, TypeRef,
};

pub const SCOPE: &str = "self";

/// Fluent symbol-table builder for a single package
#[derive(Default)]
pub struct Fixture {
    table: InMemorySymbolTable,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A contract embedding the named capabilities
    pub fn stack(mut self, name: &str, embeds: &[&str]) -> Self {
        let decl = embeds.iter().fold(InterfaceDecl::new(), |decl, embed| {
            decl.embed(TypeRef::declared(SCOPE, *embed))
        });
        self.table.interface(SCOPE, name, decl);
        self
    }

    /// A method-less capability and its implementation
    ///
    /// With `bundle`, the implementation's `run` takes that contract as its
    /// second argument.
    pub fn component(self, name: &str, bundle: Option<&str>) -> Self {
        self.component_with(name, InterfaceDecl::new(), TypeDecl::new(), bundle)
    }

    /// A capability with explicit contract and implementation methods
    pub fn component_with(
        mut self,
        name: &str,
        contract: InterfaceDecl,
        implementation: TypeDecl,
        bundle: Option<&str>,
    ) -> Self {
        self.table
            .interface(SCOPE, name, contract)
            .ty(
                SCOPE,
                &format!("{name}Middleware"),
                implementation.method(run(bundle)),
            );
        self
    }

    pub fn build(self) -> InMemorySymbolTable {
        self.table
    }
}

pub fn run(bundle: Option<&str>) -> MethodSig {
    let sig = MethodSig::new("run")
        .param("req", TypeRef::shared(TypeRef::external("http::Request")));
    match bundle {
        Some(name) => sig.param("deps", TypeRef::declared(SCOPE, name)),
        None => sig,
    }
}

/// Request type handed to executor components
#[derive(Debug, Default)]
pub struct Request {
    pub path: String,
}

pub type CallLog = Rc<RefCell<Vec<String>>>;

/// Component that records each invocation and returns a scripted outcome
pub struct Recorder {
    pub name: String,
    pub log: CallLog,
    pub respond_with: Option<u16>,
    pub fail_with: Option<String>,
    /// Capabilities the component expects to find in its bundle
    pub expects: Vec<String>,
}

impl Recorder {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: Rc::clone(log),
            respond_with: None,
            fail_with: None,
            expects: Vec::new(),
        }
    }

    pub fn responding(mut self, status: u16) -> Self {
        self.respond_with = Some(status);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn expecting(mut self, capability: &str) -> Self {
        self.expects.push(capability.to_string());
        self
    }

    pub fn boxed(self) -> (String, Box<dyn Middleware<Request>>) {
        (format!("{SCOPE}::{}", self.name), Box::new(self))
    }
}

impl Middleware<Request> for Recorder {
    fn run(&self, _req: &Request, bundle: Option<&Bundle<'_, Request>>) -> Outcome {
        self.log.borrow_mut().push(self.name.clone());

        for expected in &self.expects {
            if bundle.and_then(|b| b.get(expected)).is_none() {
                return Outcome::fail(format!("{} missing dependency {expected}", self.name));
            }
        }
        if let Some(status) = self.respond_with {
            return Outcome::respond(MiddlewareResponse::respond(status, self.name.clone()));
        }
        match &self.fail_with {
            Some(message) => Outcome::fail(message.clone()),
            None => Outcome::proceed(),
        }
    }
}

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

//! # Courier - a declarative HTTP client library
//!
//! Courier turns a described remote API (methods annotated with request lines,
//! headers, parameter bindings and bodies) into a working HTTP client. Requests
//! are built from templates, sent through a pluggable transport, retried with
//! backoff on transient failures and decoded into the declared return type.
//!
//! ## Quick Start
//!
//! ```no_run
//! use courier::codec::{JsonDecoder, JsonEncoder};
//! use courier::contract::{attr, InterfaceDescriptor, MethodDescriptor, ParamDescriptor, TypeRef};
//! use courier::{args, Arg, Client};
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! fn main() -> Result<(), courier::Error> {
//!     let users = Arc::new(
//!         InterfaceDescriptor::new("Users")
//!             .attribute(attr::Headers::new(["Accept: application/json"]))
//!             .method(
//!                 MethodDescriptor::new("get")
//!                     .attribute(attr::RequestLine::new("GET /users/{id}"))
//!                     .param(
//!                         ParamDescriptor::new(TypeRef::named("u64"))
//!                             .attribute(attr::Param::new("id")),
//!                     )
//!                     .returns(TypeRef::named("User")),
//!             )
//!             .method(
//!                 MethodDescriptor::new("create")
//!                     .attribute(attr::RequestLine::new("POST /users"))
//!                     .param(ParamDescriptor::new(TypeRef::named("NewUser")))
//!                     .returns(TypeRef::named("User")),
//!             ),
//!     );
//!
//!     let api = Client::builder()
//!         .encoder(JsonEncoder)
//!         .decoder(JsonDecoder)
//!         .target(users, "https://api.example.com")?;
//!
//!     let user: User = api.call("get", &args![123])?.json()?;
//!     println!("User: {}", user.name);
//!
//!     let created: User = api
//!         .call("create", &[Arg::json(&serde_json::json!({ "name": "Alice" }))?])?
//!         .json()?;
//!     println!("Created user with ID: {}", created.id);
//!     Ok(())
//! }
//! ```
//!
//! ## How a call runs
//!
//! 1. The [`contract`] parses every method once, when an [`Instance`] is created.
//! 2. Each call builds a [`RequestTemplate`] from its arguments, runs the
//!    [`RequestInterceptor`]s, and binds it to the [`Target`].
//! 3. The [`Transport`] executes the request under the call's [`Options`].
//! 4. Transport failures, and responses the error decoder marks retryable, go
//!    to a fresh clone of the [`Retryer`](retry::Retryer).
//! 5. Successful responses are decoded into an [`Output`].
//!
//! ## Error Handling
//!
//! ```no_run
//! use courier::{Error, Instance};
//!
//! # fn example(api: Instance) {
//! match api.call("get", &courier::args![42]) {
//!     Ok(output) => println!("Success: {:?}", output),
//!     Err(Error::HttpError { status, raw_response, .. }) => {
//!         eprintln!("HTTP error {}: {}", status, raw_response);
//!     }
//!     Err(e) if e.is_retryable() => eprintln!("Gave up retrying: {}", e),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # }
//! ```

mod arg;
mod build;
mod capability;
mod client;
pub mod codec;
mod config;
pub mod contract;
mod dispatch;
mod error;
mod handler;
mod interceptor;
mod log;
pub mod metadata;
mod request;
pub mod retry;
mod target;
pub mod template;
mod transport;

pub use arg::Arg;
pub use capability::{enrich, Capability, Enrich};
pub use client::{Client, ClientBuilder, Instance};
pub use codec::Output;
pub use config::ClientConfig;
pub use contract::Contract;
pub use dispatch::{
    DefaultInvocationHandler, DefaultInvocationHandlerFactory, Dispatch, InvocationHandler,
    InvocationHandlerFactory,
};
pub use error::{BoxError, Error, Result};
pub use handler::MethodHandler;
pub use interceptor::{HeaderInterceptor, RequestInterceptor};
pub use log::{LogLevel, Logger, NoOpLogger, TracingLogger};
pub use metadata::{Expander, MethodMetadata};
pub use request::{Headers, Options, Request, Response, ResponseBody, ResponseBuilder};
pub use retry::{ExceptionPropagationPolicy, Retryer};
pub use target::{EmptyTarget, HardCodedTarget, Target};
pub use template::RequestTemplate;
pub use transport::{ReqwestTransport, Transport};

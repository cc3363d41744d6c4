// src/lib.rs

//! htpipe: a request-handling pipeline engine.
//!
//! A request runs through a fixed sequence of lifecycle stages:
//!  - sanitation of raw params/body and seeding of the context;
//!  - `preAuthorize` (sync gate);
//!  - `attachData` (async, contributes to the context);
//!  - `finalAuthorize` (async gate, may use attached data);
//!  - `doWork` (async, contributes to the context);
//!  - `respond` + `sanitizeResponse`.
//!
//! Any failure is mapped to an HTTP-like outcome. Unclassified failures take the
//! category of the stage they were raised in; pre-classified `HttpError`s and
//! `Redirect` signals pass through untouched.
//!
//! Independently written fragments of the same role are merged by the
//! composer algebra in [`compose`], and whole descriptions are compiled from
//! stage-adding transforms with [`ht_pipe`].

pub mod common_stages;
pub mod compose;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

// --- Re-exports for the Public API ---

pub use crate::core::context::Context;
pub use crate::core::gate::Gate;
pub use crate::core::input::{SeedInput, UnsafeInput};
pub use crate::core::outcome::{Outcome, Response, ResponseSink, WireResponse};
pub use crate::core::stage::{
  async_gate, data_stage, initializer, response_filter, responder, sanitizer, sync_gate, BoxFuture, Role, Stage,
};

pub use crate::pipeline::compiler::{
  attach_data, do_work, final_authorize, fragment, ht_pipe, init_pre_context, pre_authorize, respond, sanitize_body,
  sanitize_params, sanitize_response, transform, Transform,
};
pub use crate::pipeline::definition::HandlerDescription;
pub use crate::pipeline::lifecycle::LifecycleState;

pub use crate::config::PipeConfig;
pub use crate::error::{ErrorCategory, HttpError, PipeError, PipeResult, Redirect, StageError, StageResult};

pub use crate::registry::RouteTable;

/*
    Typical use:
    1. Write stage fragments with `sync_gate`, `async_gate`, `data_stage`, `responder`, ...
    2. Compile them: `ht_pipe(HandlerDescription::new(), vec![pre_authorize(..), attach_data(..), respond(..)])`.
       Two fragments for the same role are merged, left (earlier) first.
    3. Register the description in a `RouteTable` (checked once, shared afterwards).
    4. Per request: `table.dispatch("route", UnsafeInput { .. }).await` -> `Outcome`,
       or `dispatch_to(.., sink)` to hand it straight to the transport.
*/

//! # netconf-engine
//!
//! The core of a NETCONF/RESTCONF protocol engine that mediates between
//! management clients and a configuration backend: a [`dispatcher`] that
//! routes framed NETCONF `<rpc>` requests to a backend over an internal
//! channel, and a [`restconf`] gateway that maps RESTCONF stream requests to
//! the same backend's `<create-subscription>` and relays notifications as
//! Server-Sent Events.
//!
//! Both front-ends share a [`schema`] index, a [`validate`] pass, and a
//! [`backend`] transport. NETCONF/RESTCONF framing itself, authentication
//! plugin resolution, the YANG grammar parser, and the backend datastore are
//! external collaborators this crate only talks to through the interfaces
//! documented on each module — see `DESIGN.md` for where each one is
//! grounded.
//!
//! ## Components
//!
//! | Module | Role |
//! |---|---|
//! | [`error`] | shared error/result types |
//! | [`tree`] | the request/reply XML tree |
//! | [`schema`] | C1 Schema Index |
//! | [`validate`] | C2 Payload Validator |
//! | [`options`] | edit options shared by C3 |
//! | [`filter`] | shared `<filter>` handling for `get`/`get-config` |
//! | [`operations`] | C3 Operation Decoder |
//! | [`backend`] | C4 Backend Channel |
//! | [`subscription`] | C5 Subscription Worker |
//! | [`dispatcher`] | C6 NETCONF Dispatcher |
//! | [`restconf`] | C7 RESTCONF Stream Gateway |
//! | [`session`] | session identity, username attribution, counters |
//! | [`config`] | ambient environment-flag configuration |

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod operations;
pub mod options;
pub mod restconf;
pub mod schema;
pub mod session;
pub mod subscription;
pub mod tree;
pub mod validate;

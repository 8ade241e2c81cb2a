//! Station controller: the component between the chat front end and the
//! audio engine.
//!
//! Reads flow engine → [`parse`](station_proto::parse) →
//! [`reconcile::StationReconciler`] → [`controller::StationController`];
//! writes flow controller → [`ingest::IngestionPipeline`] / engine →
//! catalog. The chat dispatcher, web front end, and storage engine live
//! elsewhere and talk to this crate through [`controller::StationController`]
//! and the [`catalog::Catalog`] / [`announce::MessageSink`] traits.

pub mod announce;
pub mod catalog;
pub mod controller;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod media;
pub mod reconcile;
pub mod status;

pub use controller::StationController;
pub use error::{Result, StationError};

#![deny(missing_docs)]

//! # vcord-pipeline: Inscription and Retrieval
//!
//! Composes the codec, the ledger capability and the transaction builder
//! into two operations, [`InscriptionPipeline::inscribe`] and
//! [`InscriptionPipeline::retrieve`], plus the confirmation tracker they
//! share.
//!
//! ## Dependency Injection
//!
//! A pipeline is built from an `Arc<dyn LedgerRpc>`, an `Arc<dyn KeySource>`
//! and a [`PipelineConfig`]. There are no global instances; tests run many
//! pipelines side by side against separate mock ledgers.
//!
//! ## Two Kinds of Verification
//!
//! - [`InscriptionPipeline::verify_transaction`]: does the ledger know the
//!   transaction, and how deep is it.
//! - `vcord_core::verify_credential`: is the credential itself well formed
//!   and within its validity window.
//!
//! Neither implies the other.

pub mod config;
pub mod confirm;
pub mod error;
pub mod pipeline;

pub use config::PipelineConfig;
pub use confirm::{ConfirmationStatus, ConfirmationTracker, PollPolicy};
pub use error::{PipelineError, Stage};
pub use pipeline::InscriptionPipeline;

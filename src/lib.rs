//! Programmable transaction builder for IOTA Rebased.
//!
//! Collects inputs and commands, resolves what the caller left open (object
//! versions, argument encodings, gas price, payment and budget) through a
//! [`DataReader`], and produces canonical `TransactionData` bytes and their
//! digest.
//!
//! # Quick start
//!
//! ```no_run
//! use iota_tx_builder::{Address, DataReader, Transaction};
//!
//! # async fn run(reader: &dyn DataReader) -> Result<(), iota_tx_builder::BuilderError> {
//! let sender: Address = "0xa11ce".parse()?;
//! let recipient: Address = "0xb0b".parse()?;
//!
//! let mut tx = Transaction::new();
//! tx.set_sender(sender);
//! let amount = tx.pure(&1_000_000u64)?;
//! let coin = tx.split_coins(tx.gas(), vec![amount]);
//! let recipient = tx.pure(&recipient)?;
//! tx.transfer_objects(vec![coin.arg()], recipient);
//!
//! let bytes = tx.build(reader).await?;
//! let digest = tx.digest_resolved()?;
//! println!("{digest}: {} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`tx`] -- the [`Transaction`] builder
//! - [`resolve`] -- signature lookup, object and gas resolution
//! - [`client`] -- the [`DataReader`] network seam
//! - [`data`] -- wire types of `TransactionData` and the digest
//! - [`bcs`] -- canonical encoding
//! - [`snapshot`] -- portable JSON form
//! - [`types`] -- [`Address`], [`ObjectRef`], [`TypeTag`] and friends

pub mod bcs;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod inputs;
pub mod legacy;
pub mod normalized;
pub mod pure;
pub mod resolve;
pub mod result;
pub mod snapshot;
pub mod state;
pub mod tx;
pub mod type_tag;
pub mod types;

pub use client::DataReader;
pub use config::{BuildOptions, ProtocolLimits};
pub use data::{
    intent_message, Argument, CallArg, Command, ObjectArg, TransactionData, TransactionDigest,
    TransactionExpiration, TransactionKind,
};
pub use error::{BcsError, BuilderError, ClientError};
pub use inputs::UnresolvedObject;
pub use resolve::{estimate_gas_budget, fetch_objects};
pub use result::TransactionResult;
pub use snapshot::TransactionSnapshot;
pub use tx::Transaction;
pub use types::{Address, ObjectDigest, ObjectId, ObjectRef, Owner, StructTag, TypeTag};

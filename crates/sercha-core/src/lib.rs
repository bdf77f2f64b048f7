//! Sercha Core - Domain logic and connector contract
//!
//! This crate contains the hexagonal core of the connector runtime:
//! - **Domain entities** - `Source`, `SyncState`, `Document`, `Chunk`,
//!   `Exclusion`, `ScheduledTask`, `TaskResult`, `AuthProvider`, `Credentials`
//! - **Ports** - trait interfaces for the seven logical metadata stores
//! - **Connector contract** - the polymorphic interface every provider
//!   adapter implements
//! - **Embedding codec** - packed little-endian float32 (de)serialization
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O. Ports
//! define trait interfaces that adapter crates (`sercha-store`,
//! `sercha-connectors`) implement. Nothing in this crate talks to a
//! database or the network.

pub mod config;
pub mod connector;
pub mod domain;
pub mod embedding;
pub mod ports;

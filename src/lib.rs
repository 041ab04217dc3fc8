//! # Reseed
//!
//! Snapshot extraction and dependency-ordered reseeding for a
//! collection-based content store.
//!
//! Reseed keeps a content store and a set of on-disk JSON snapshots in sync,
//! in both directions. Extraction dumps every collection to a snapshot file;
//! seeding replays those snapshots back into the store, translating
//! cross-collection ID references through a persisted ID map so that
//! relations survive the round trip even though the store assigns fresh IDs.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  extract  ┌────────────┐
//! │  SQLite   │──────────▶│ Snapshots  │
//! │  store    │           │ JSON+images│
//! │           │◀──────────│            │
//! └───────────┘   seed    └─────┬──────┘
//!       ▲        (remap)        │
//!       │                 ┌─────┴──────┐
//!  ┌────┴─────┐           │   ID map   │
//!  │ CLI/HTTP │           │ old → new  │
//!  └──────────┘           └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! reseed init                   # create the store
//! reseed extract                # dump collections to snapshots
//! reseed seed                   # full reseed in dependency order
//! reseed seed media             # reseed one collection
//! reseed serve                  # expose POST /seed over HTTP
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Collection registry and relation-field groups |
//! | [`idmap`] | Persisted old-ID to new-ID translation table |
//! | [`remap`] | Relation reference rewriting |
//! | [`snapshot`] | Snapshot file reading and writing |
//! | [`store`] | SQLite-backed content store |
//! | [`seed`] | Seeding orchestration |
//! | [`extract`] | Snapshot extraction |
//! | [`server`] | HTTP trigger server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod collections;
pub mod config;
pub mod db;
pub mod extract;
pub mod idmap;
pub mod migrate;
pub mod models;
pub mod remap;
pub mod seed;
pub mod server;
pub mod snapshot;
pub mod store;

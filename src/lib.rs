//! Device Manager Engine
//!
//! A library for supervising a node's device and service processes:
//! - Deployment planning from a parsed node profile (implementation matching,
//!   dependency resolution, composite ordering)
//! - Child registration and naming-directory binding
//! - Domain manager registration with transient-fault retry
//! - Escalating shutdown (release, SIGINT, SIGTERM, SIGKILL)
//!
//! ## Architecture
//!
//! This engine follows hexagonal (ports and adapters) architecture:
//!
//! - **Domain**: Core business logic, entities, and services
//! - **Application**: The supervisor that wires the domain together
//! - **Infrastructure**: Concrete implementations (launcher, file view,
//!   name directory, host facts, configuration)
//!
//! ## Usage
//!
//! The daemon binary (`devmgrd`) uses these modules directly:
//!
//! ```rust,ignore
//! use devmgr_engine::{
//!     application::Supervisor,
//!     domain::services::ChildRegistry,
//!     infrastructure::{InMemoryNameDirectory, LocalFileView, TokioLauncher},
//! };
//! ```

pub mod constants;

// Core architecture modules (hexagonal architecture)
pub mod application;
pub mod domain;
pub mod infrastructure;

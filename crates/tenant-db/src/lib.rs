//! Tenant database adapter: typed operations over the Greenlight tables
//! (`users`, `rooms`, `shared_accesses`, `users_roles`).

#![warn(clippy::pedantic)]

/// Error type for tenant DB operations.
pub mod error;

/// Startup schema-compatibility check.
pub mod schema;

/// Shared-access repository (`shareRoom`/`unshareRoom`).
pub mod shared_access;

/// Connection pool setup and startup compatibility check.
pub mod pool;

/// Small helpers: secret generation, generic by-column lookups.
pub mod support;

/// Rooms repository.
pub mod rooms;

/// Users repository.
pub mod users;

pub use error::{Result, TenantDbError};
pub use pool::connect;
pub use rooms::{NewRoom, RoomKey, RoomRow, RoomsRepository};
pub use shared_access::SharedAccessRepository;
pub use support::{random_hex_id, random_secret};
pub use users::{NewUser, UsersRepository};

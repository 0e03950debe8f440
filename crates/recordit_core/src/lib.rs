//! recordit core: roles, entities, storage ports and the service that
//! enforces permissions, ownership and audit logging over them.
//!
//! Nothing here touches a database; `recordit_postgres` implements the
//! ports and `recordit_server` exposes the service over HTTP.

pub mod attachments;
pub mod audit;
pub mod bundle;
pub mod error;
pub mod memory;
pub mod pagination;
pub mod password;
pub mod ports;
pub mod principal;
pub mod roles;
pub mod seeds;
pub mod service;
pub mod settings;
pub mod spreadsheet;
pub mod types;
pub mod validation;

//! Residence portal - apartment and owner provisioning for a residential
//! community.
//!
//! This library provides the store schema, the provisioning service and the
//! REST API served by the `portal` binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod entity;
pub mod provisioning;

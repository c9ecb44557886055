//! # Route Modules
//!
//! | Route | Module |
//! |-------|--------|
//! | `POST /credential` | [`credential`] |
//! | `GET /health/liveness`, `GET /health/readiness` | [`health`] |

pub mod credential;
pub mod health;

//! Library surface for the gateway binary: exposed so router-level tests
//! can build the same `Router` the binary serves, against mock store/
//! broker implementations instead of live Postgres/Redis.

pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod state;

//! Risk-aware renewable capacity planning.
//!
//! Turns a historical demand series into a two-stage stochastic program:
//! capacity investments are fixed before uncertainty resolves, dispatch and
//! load shedding adapt per demand scenario, and tail exposure is priced via
//! CVaR. The solved program is mapped back into domain quantities with an
//! independent consistency check.

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod planner;
pub mod report;
pub mod telemetry;

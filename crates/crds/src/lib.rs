//! Grafana operator CRD Definitions
//!
//! Typed Kubernetes custom resources of the grafana-operator consumed by the
//! Grafana projects plugin.

pub mod grafana;
pub mod grafana_datasource;

pub use grafana::*;
pub use grafana_datasource::*;

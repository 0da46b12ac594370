//! Prints the CustomResourceDefinitions of the grafana-operator kinds this workspace
//! writes, as a multi-document YAML stream.
//!
//! Only meant for test clusters without the operator installed; a real cluster uses the
//! operator's own CRDs.

use crds::{Grafana, GrafanaDatasource};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Grafana::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&GrafanaDatasource::crd())?);
    Ok(())
}

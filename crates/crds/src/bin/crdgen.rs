//! Prints the BotNetworkPolicy CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/botnetworkpolicies.yaml`

use crds::BotNetworkPolicy;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = BotNetworkPolicy::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}

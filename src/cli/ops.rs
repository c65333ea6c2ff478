use std::path::PathBuf;

use clap::Args;

use morphic::ops::{Operator, Returns};

use super::load_config;

#[derive(Args)]
pub struct OpsArgs {
    /// Engine configuration file (TOML); shows its effective bounds
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn cmd_ops(args: OpsArgs) {
    let config = load_config(args.config.as_deref());
    for op in Operator::ALL {
        let table = op.table();
        let returns = match table.returns {
            Returns::Boolean => "boolean",
            Returns::Value => "value",
        };
        let cases: Vec<&str> = table.cases.iter().map(|c| c.name).collect();
        println!(
            "{:<5} arity {}  {:<7}  bound {}  {}",
            op,
            table.arity,
            returns,
            config.chain_bound(op),
            cases.join(", ")
        );
    }
}

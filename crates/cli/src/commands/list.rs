//! `list` command implementation.

use anyhow::Result;
use harness::Suite;

use crate::cli::ListArgs;

/// Execute the `list` command
pub fn run_list(args: &ListArgs) -> Result<()> {
    let suite = Suite::catalog().filtered(&args.filter);
    for case in suite.cases() {
        println!("{}", case.name);
    }
    println!("\n{} cases", suite.len());
    Ok(())
}

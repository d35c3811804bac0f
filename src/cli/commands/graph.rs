//! Graph Command
//!
//! Prints the stage graph as a mermaid flowchart.

use crate::types::Result;
use crate::workflow::StageGraph;

pub fn run() -> Result<()> {
    println!("{}", StageGraph::to_mermaid());
    Ok(())
}

//! Library side of the `gen2to3` command line tool.

pub mod logging;
pub mod pipeline;
pub mod render;

//! Runs simulated users against a storefront or product service.
//!
//! See [`loadgen::config`] for the available configuration.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    loadgen::cli::execute()
}

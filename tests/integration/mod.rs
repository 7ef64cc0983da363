//! Integration tests: throw-away git repositories driven through the library and the binary

mod helpers;
mod test_cli;
mod test_ledger;
mod test_orchestrator;

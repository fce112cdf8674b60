pub mod assertions;
pub mod call_log;
pub mod fake_server;
pub mod test_kinds;

pub use call_log::CallLog;
pub use change_builder::ChangeBuilder;
pub use fake_server::FakeServer;
pub use test_kinds::{Batch, Game, TestKinds};

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

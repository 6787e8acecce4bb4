#![allow(dead_code)]

use std::time::Duration;

use snipexec::exec::ProcessInvocation;

pub use snipexec_test_utils::{init_tracing, with_timeout};

/// `sh -s` reading `script` from stdin.
pub fn sh(script: &str, timeout: Duration) -> ProcessInvocation {
    ProcessInvocation::new("sh", timeout)
        .args(["-s"])
        .stdin(script)
}

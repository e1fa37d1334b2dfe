//! Fuzz target: `ControlCommand::decode`
//!
//! Arbitrary control writes must decode or be rejected without panicking,
//! and anything accepted must carry the opcode it was sent with.
//!
//! cargo fuzz run fuzz_control_command

#![no_main]

use coldtrace::app::commands::ControlCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(cmd) = ControlCommand::decode(data) {
        assert_eq!(Some(&cmd.opcode()), data.first());
        if let ControlCommand::SetActiveBatch(id) = cmd {
            assert_ne!(id, 0, "batch id 0 must be rejected");
            assert_eq!(data.len(), 5);
        } else {
            assert_eq!(data.len(), 1);
        }
    }
});

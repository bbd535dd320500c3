//! Unlinks orphaned shares by name.
//!
//! A share whose creator exited without cleanup persists until explicitly
//! unlinked (or the machine reboots). This removes the named regions passed
//! on the command line.

use std::process::ExitCode;

fn main() -> ExitCode {
    let names: Vec<String> = std::env::args().skip(1).collect();
    if names.is_empty() {
        eprintln!("usage: scrub <share-name>...");
        eprintln!("removes orphaned shared-memory regions from {}", avbus_shm::shm_dir().display());
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for name in &names {
        match avbus_shm::unlink_named(name) {
            Ok(true) => println!("unlinked {name}"),
            Ok(false) => println!("{name}: no such share"),
            Err(e) => {
                eprintln!("{name}: {e}");
                failed = true;
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

//! Subcommands of the sandbox binary.

mod inspect;
mod profiles;
mod reset;
mod run;

pub use inspect::Inspect;
pub use profiles::Profiles;
pub use reset::Reset;
pub use run::Run;

use anyhow::Result;
use serde::Serialize;

/// Pretty-prints `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

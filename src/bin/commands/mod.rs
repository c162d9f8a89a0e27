pub mod config;
pub mod install;
pub mod status;

use assetdb::OutputFormat;
use serde::Serialize;

/// Print a serializable value in one of the JSON formats
///
/// Returns `false` when `output_format` is not a JSON format.
pub(crate) fn print_json<T: Serialize>(value: &T, output_format: OutputFormat) -> bool {
    if !output_format.is_json() {
        return false;
    }
    match output_format.to_json(value) {
        Some(Ok(json)) => {
            println!("{}", json);
            true
        }
        Some(Err(e)) => {
            eprintln!("ERROR: Failed to serialize to JSON: {}", e);
            true
        }
        None => false,
    }
}

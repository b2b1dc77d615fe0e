//! Client-side identifier checks, run before any request is built.

use crate::error::VmError;

pub const INSTANCE_NAME_MIN_LEN: usize = 19;
pub const INSTANCE_NAME_MAX_LEN: usize = 22;
pub const RECORDING_ID_LEN: usize = 54;

pub fn check_instance_name(name: &str) -> Result<(), VmError> {
    if name.is_empty() {
        return Err(invalid("Invalid instance name: can't be blank"));
    }
    if has_uppercase(name) {
        return Err(invalid("Invalid instance name: must be in lower case"));
    }
    if !(INSTANCE_NAME_MIN_LEN..=INSTANCE_NAME_MAX_LEN).contains(&name.len()) {
        return Err(invalid(format!(
            "Invalid instance name: the length must be between {INSTANCE_NAME_MIN_LEN} and {INSTANCE_NAME_MAX_LEN}"
        )));
    }
    Ok(())
}

pub fn check_recording_id(id: &str) -> Result<(), VmError> {
    if id.is_empty() {
        return Err(invalid("Invalid recording ID: can't be blank"));
    }
    if has_uppercase(id) {
        return Err(invalid("Invalid recording ID: must be in lower case"));
    }
    if id.len() != RECORDING_ID_LEN {
        return Err(invalid(format!(
            "Invalid recording ID: the length must be exactly {RECORDING_ID_LEN}"
        )));
    }
    Ok(())
}

fn has_uppercase(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_uppercase())
}

fn invalid(message: impl Into<String>) -> VmError {
    VmError::InvalidArgument(message.into())
}

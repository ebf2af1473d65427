use std::time::{SystemTime, UNIX_EPOCH};

use crate::lang::object::NativeFn;
use crate::lang::value::Value;

/// Natives every VM starts with.
pub const STANDARD: [(&str, NativeFn); 1] = [("clock", clock as NativeFn)];

/// Seconds since the Unix epoch.
pub fn clock(_args: &[Value]) -> Result<Value, String> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("clock: {}", e))?;
    Ok(Value::Number(elapsed.as_secs_f64()))
}

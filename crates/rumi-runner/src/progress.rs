//! Progress reporting on stdout.
//!
//! Downstream consumers parse these fixed markers, and the final line of
//! stdout must be the JSON summary. Informational logs go to stderr via
//! tracing, never here.

/// `📊 <step>... (<pct>%)`
pub fn step(name: &str, pct: u8) {
    println!("📊 {}... ({}%)", name, pct);
}

/// `✅ <msg>`
pub fn ok(msg: &str) {
    println!("✅ {}", msg);
}

/// `❌ <step> failed: <reason>`
pub fn failed(step: &str, reason: &str) {
    println!("❌ {} failed: {}", step, reason);
}

/// The final JSON summary line.
pub fn summary(json: &serde_json::Value) {
    println!("{}", json);
}

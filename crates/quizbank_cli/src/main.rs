//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `quizbank_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("quizbank_core version={}", quizbank_core::core_version());

    match quizbank_core::db::open_db_in_memory() {
        Ok(_) => println!("quizbank_core db=ok"),
        Err(err) => println!("quizbank_core db=error {err}"),
    }
}

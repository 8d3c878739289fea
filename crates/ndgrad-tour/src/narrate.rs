//! Printing helpers for the narrated output.

use std::fmt::Display;

use ndgrad::TensorError;

pub fn heading(title: &str) {
    println!();
    println!("== {title} ==");
}

pub fn say(text: &str) {
    println!("{text}");
}

/// Print `label` followed by `value`, on its own line when the value spans
/// several lines.
pub fn show(label: &str, value: impl Display) {
    let rendered = value.to_string();
    if rendered.contains('\n') {
        println!("{label}:\n{rendered}");
    } else {
        println!("{label}: {rendered}");
    }
}

/// Print the outcome of a call that is expected to fail.
pub fn expect_failure<T>(label: &str, result: Result<T, TensorError>) {
    match result {
        Ok(_) => println!("{label}: unexpectedly succeeded"),
        Err(e) => println!("{label}: error: {e}"),
    }
}

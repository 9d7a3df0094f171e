// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    one = { "1", Some(true) },
    zero = { "0", Some(false) },
    yes = { "yes", Some(true) },
    no = { "NO", Some(false) },
    word_true = { "true", Some(true) },
    on = { "on", Some(true) },
    garbage = { "maybe", None },
)]
fn bools_parse(input: &str, expected: Option<bool>) {
    assert_eq!(parse_bool(input), expected);
}

#[test]
fn fractional_seconds_parse() {
    assert_eq!(parse_secs_f64("5.0"), Some(Duration::from_secs(5)));
    assert_eq!(parse_secs_f64("0.1"), Some(Duration::from_millis(100)));
    assert_eq!(parse_secs_f64("0"), Some(Duration::ZERO));
}

#[test]
fn negative_and_nan_seconds_are_rejected() {
    assert_eq!(parse_secs_f64("-1"), None);
    assert_eq!(parse_secs_f64("NaN"), None);
    assert_eq!(parse_secs_f64("oops"), None);
}

#[test]
fn u64_parse_trims_whitespace() {
    assert_eq!(parse_u64(" 42 "), Some(42));
    assert_eq!(parse_u64("x"), None);
}

#[test]
fn env_wrappers_fall_back_to_defaults() {
    // Unset variables use the default; a unique name avoids cross-test races.
    assert_eq!(u64_var("ESB_CORE_TEST_UNSET_U64", 7), 7);
    assert_eq!(secs_var("ESB_CORE_TEST_UNSET_SECS", Duration::from_secs(3)), Duration::from_secs(3));
    assert!(bool_var("ESB_CORE_TEST_UNSET_BOOL", true));
    assert_eq!(string_var("ESB_CORE_TEST_UNSET_STR"), None);
}

#[test]
fn env_wrappers_read_set_values() {
    std::env::set_var("ESB_CORE_TEST_SET_U64", "12");
    std::env::set_var("ESB_CORE_TEST_SET_F64", "0.5");
    assert_eq!(u64_var("ESB_CORE_TEST_SET_U64", 7), 12);
    assert_eq!(
        secs_f64_var("ESB_CORE_TEST_SET_F64", Duration::from_secs(9)),
        Duration::from_millis(500)
    );
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use super::{render, OutputFormat};

#[derive(Debug, Clone, Serialize)]
struct FakeEntry {
    name: String,
}

#[test]
fn render_json_prints_the_serialized_value() {
    let entry = FakeEntry { name: "widget".into() };
    assert!(render(OutputFormat::Json, &entry, || panic!("text_fn must not run in json mode")).is_ok());
}

#[test]
fn render_text_runs_the_closure_instead_of_serializing() {
    let entry = FakeEntry { name: "widget".into() };
    let mut ran = false;
    render(OutputFormat::Text, &entry, || ran = true).unwrap();
    assert!(ran);
}

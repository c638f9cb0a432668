// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use std::{env, fmt::Write as _, fs, path::PathBuf};

use toml_edit::{DocumentMut, Item};

const FALLBACK: &str = "../../configs/zenbook.toml";

fn lookup<'a>(doc: &'a DocumentMut, table: &str, key: &str) -> &'a Item {
    match doc.get(table).and_then(|t| t.get(key)) {
        Some(item) => item,
        None => panic!("config is missing `{table}.{key}`"),
    }
}

fn string(doc: &DocumentMut, table: &str, key: &str) -> String {
    match lookup(doc, table, key).as_str() {
        Some(s) => s.to_owned(),
        None => panic!("`{table}.{key}` must be a string"),
    }
}

fn integer(doc: &DocumentMut, table: &str, key: &str) -> u64 {
    match lookup(doc, table, key).as_integer() {
        Some(v) if v >= 0 => v as u64,
        _ => panic!("`{table}.{key}` must be a non-negative integer"),
    }
}

fn main() {
    println!("cargo:rerun-if-env-changed=IRQSTORM_CONFIG_PATH");
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let config_path = match env::var("IRQSTORM_CONFIG_PATH") {
        Ok(path) => PathBuf::from(path),
        Err(_) => manifest_dir.join(FALLBACK),
    };
    println!("cargo:rerun-if-changed={}", config_path.display());

    let text = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", config_path.display()));
    let doc: DocumentMut = text
        .parse()
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", config_path.display()));

    let mut out = String::new();
    let strings = [
        ("BUS_NAME", "monitor", "bus-name"),
        ("ADAPTER_NAME", "monitor", "adapter-name"),
        ("DEVICE_NAME", "monitor", "device-name"),
        ("LOG_LEVEL", "log", "level"),
    ];
    for (name, table, key) in strings {
        let value = string(&doc, table, key);
        writeln!(out, "pub const {name}: &str = {value:?};").unwrap();
    }
    let integers = [
        ("IRQ_INDEX", "usize", "monitor", "irq-index"),
        ("THRESHOLD", "u64", "monitor", "threshold"),
        ("PERIOD_MS", "u64", "monitor", "period-ms"),
    ];
    for (name, ty, table, key) in integers {
        let value = integer(&doc, table, key);
        writeln!(out, "pub const {name}: {ty} = {value};").unwrap();
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("config.rs"), out).unwrap();
}

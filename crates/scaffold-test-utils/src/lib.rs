//! Testing utilities for the scaffold workspace
//!
//! Sample sources, on-disk fixture projects and summary builders shared by
//! the crates' integration tests.

#![allow(missing_docs)]

use std::path::Path;

use scaffold_model::{
    ContentHash, Dependency, FileSummary, Injection, Language, Parameter, QualifiedName, SideEffect, SymbolDescriptor,
    SymbolKind,
};
use tempfile::TempDir;

/// Sample source files
pub mod sources {
    pub const CALC_PY: &str = "def add(a, b):\n    return a + b\n";

    pub const CHECKOUT_PY: &str = "\
def checkout(order, paymentClient):
    receipt = paymentClient.charge(order)
    return receipt
";

    pub const BROKEN_PY: &str = "def broken(:\n    return\n";

    pub const USERS_PY: &str = r#"
import os
from .storage import Database


class UserStore:
    def __init__(self, db: Database, *, root="/tmp"):
        self.db = db
        self.users = {}

    def add_user(self, name: str, email: str) -> bool:
        if not name:
            raise ValueError("name required")
        self.users[name] = email
        return True

    def load(self, path: str):
        with open(os.path.join(path, "users.txt")) as fh:
            return fh.read()

    def sync(self):
        for user in self.users:
            self.db.save(user)

    def _hidden(self):
        pass


def getUser(user_id: int):
    return {"id": user_id}
"#;

    pub const STORAGE_PY: &str = "\
class Database:
    def save(self, item):
        return item
";

    pub const BILLING_JS: &str = r"
const axios = require('axios');

function total(items) {
  return items.reduce((sum, item) => sum + item.price, 0);
}

async function charge(amount, paymentClient) {
  if (amount <= 0) {
    throw new RangeError('amount must be positive');
  }
  return paymentClient.charge(amount);
}

async function rates(base) {
  const res = await axios.get('/rates/' + base);
  return res.data;
}

module.exports = { total, charge, rates };
";

    pub const SERVICE_TS: &str = r"
import { Ledger } from './ledger';

export class PaymentService {
  constructor(private ledger: Ledger) {}

  record(amount: number, note: string = 'none'): boolean {
    this.ledger.append(amount, note);
    return true;
  }
}

export function formatAmount(amount: number): string {
  return amount.toFixed(2);
}
";

    pub const LEDGER_TS: &str = r"
export class Ledger {
  private entries: number[] = [];

  append(amount: number, note: string): void {
    this.entries.push(amount);
  }
}
";

    pub const BILLING_JAVA: &str = r#"
package com.acme.billing;

import java.io.IOException;

public class Invoice {
    private final TaxTable taxes;

    public Invoice(TaxTable taxes) {
        this.taxes = taxes;
    }

    public long total(long net, String region) throws IOException {
        if (net < 0) {
            throw new IllegalArgumentException("net");
        }
        return net + taxes.rateFor(region);
    }

    public static int add(int a, int b) {
        return a + b;
    }
}
"#;
}

/// Write `files` (relative path, contents) into a fresh temporary directory
///
/// # Panics
/// Panics when the temporary directory or a file cannot be written.
#[must_use]
pub fn write_project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (relative, contents) in files {
        write_file(dir.path(), relative, contents);
    }
    dir
}

/// Write one file below `root`, creating parent directories
///
/// # Panics
/// Panics on I/O failure.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(&path, contents).expect("write fixture file");
}

/// A small multi-language project
#[must_use]
pub fn sample_project() -> TempDir {
    write_project(&[
        ("app/users.py", sources::USERS_PY),
        ("app/storage.py", sources::STORAGE_PY),
        ("app/calc.py", sources::CALC_PY),
        ("web/billing.js", sources::BILLING_JS),
        ("web/service.ts", sources::SERVICE_TS),
        ("web/ledger.ts", sources::LEDGER_TS),
        ("src/main/java/com/acme/billing/Invoice.java", sources::BILLING_JAVA),
        ("tests/test_calc.py", "from app.calc import add\n\ndef test_add():\n    assert add(1, 2) == 3\n"),
        ("node_modules/left-pad/index.js", "module.exports = function leftPad() {};\n"),
        ("README.md", "# sample\n"),
    ])
}

/// Empty summary for a path
#[must_use]
pub fn summary(path: &str, language: Language) -> FileSummary {
    FileSummary::new(path, language, ContentHash::of(path.as_bytes()))
}

/// Top-level function with untyped parameters
#[must_use]
pub fn function(module: &str, name: &str, params: &[&str]) -> SymbolDescriptor {
    SymbolDescriptor::new(SymbolKind::Function, QualifiedName::top_level(module, name))
        .with_parameters(params.iter().map(|p| Parameter::new(*p)))
}

/// Class with constructor parameters
#[must_use]
pub fn class(module: &str, name: &str, params: &[&str]) -> SymbolDescriptor {
    SymbolDescriptor::new(SymbolKind::Class, QualifiedName::top_level(module, name))
        .with_parameters(params.iter().map(|p| Parameter::new(*p)))
}

/// Method of `owner`
#[must_use]
pub fn method(module: &str, owner: &str, name: &str, params: &[&str]) -> SymbolDescriptor {
    SymbolDescriptor::new(SymbolKind::Method, QualifiedName::top_level(module, owner).child(name))
        .with_parameters(params.iter().map(|p| Parameter::new(*p)))
}

/// Call through an injected argument
#[must_use]
pub fn argument_call(name: &str, member: &str, index: usize) -> SideEffect {
    SideEffect::ExternalCall(Dependency {
        name: name.to_string(),
        member: member.to_string(),
        arg_count: 1,
        injection: Injection::Argument { index },
        type_hint: None,
        arg_types: Vec::new(),
    })
}

/// Call through an imported module binding
#[must_use]
pub fn module_call(name: &str, member: &str, specifier: &str) -> SideEffect {
    SideEffect::ExternalCall(Dependency {
        name: name.to_string(),
        member: member.to_string(),
        arg_count: 1,
        injection: Injection::Module {
            specifier: specifier.to_string(),
        },
        type_hint: None,
        arg_types: Vec::new(),
    })
}

/// `calc.py` declaring `add(a, b)` that returns a value
#[must_use]
pub fn add_summary() -> FileSummary {
    summary("calc.py", Language::Python).with_symbol(function("calc", "add", &["a", "b"]).at_line(1).returning())
}

/// `shop.py` declaring `checkout(order, paymentClient)` that charges the client unguarded
#[must_use]
pub fn checkout_summary() -> FileSummary {
    summary("shop.py", Language::Python).with_symbol(
        function("shop", "checkout", &["order", "paymentClient"])
            .at_line(1)
            .returning()
            .with_side_effect(argument_call("paymentClient", "charge", 1)),
    )
}

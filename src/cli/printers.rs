// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tree-style summaries of a run, and the warnings collected along the way.

use std::{borrow::Cow, sync::Mutex};

use log::Level;

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

lazy_static::lazy_static! {
    static ref WARNINGS: Mutex<Vec<String>> = Mutex::new(vec![]);
}

/// The symbol in front of a line of a tree.
fn tree_symbol(i_line: usize, num_lines: usize, i_block: usize, num_blocks: usize) -> char {
    match (i_line, i_line + 1 == num_lines, i_block + 1 == num_blocks) {
        (0, false, _) => VERTICAL_AND_RIGHT,
        (0, _, false) => VERTICAL_AND_RIGHT,
        (0, true, true) => UP_AND_RIGHT,
        _ => VERTICAL,
    }
}

/// Render a title and its blocks of lines, one log record per line.
fn tree_lines<S: AsRef<str>>(title: &str, blocks: &[Vec<S>]) -> Vec<String> {
    let mut lines = vec![console::style(title).bold().to_string()];
    for (i_block, block) in blocks.iter().enumerate() {
        for (i_line, line) in block.iter().enumerate() {
            let symbol = tree_symbol(i_line, block.len(), i_block, blocks.len());
            lines.push(format!("{symbol} {}", line.as_ref()));
        }
    }
    lines.push(String::new());
    lines
}

fn log_tree<S: AsRef<str>>(level: Level, title: &str, blocks: &[Vec<S>]) {
    for line in tree_lines(title, blocks) {
        log::log!(level, "{line}");
    }
}

pub(crate) struct InfoPrinter {
    title: Cow<'static, str>,
    blocks: Vec<Vec<Cow<'static, str>>>,
}

impl InfoPrinter {
    pub(crate) fn new(title: Cow<'static, str>) -> Self {
        Self {
            title,
            blocks: vec![],
        }
    }

    pub(crate) fn push_block(&mut self, block: Vec<Cow<'static, str>>) {
        self.blocks.push(block);
    }

    pub(crate) fn display(self) {
        log_tree(Level::Info, &self.title, &self.blocks);
    }
}

/// Non-fatal problems are collected and printed once at the end of a run.
pub(crate) trait Warn {
    fn warn(self);
}

impl Warn for String {
    fn warn(self) {
        WARNINGS.lock().unwrap().push(self);
    }
}

/// Print out any warnings that have been collected, each as its own block.
pub(crate) fn display_warnings() {
    let warnings = std::mem::take(&mut *WARNINGS.lock().unwrap());
    if warnings.is_empty() {
        return;
    }
    let blocks = warnings.into_iter().map(|w| vec![w]).collect::<Vec<_>>();
    log_tree(Level::Warn, "Warnings", &blocks);
}

//! Pipe tables with an alignment separator row.

use super::block::BlockStep;
use super::context::ParseContext;
use super::inline::InlineParser;
use super::precedence::is_blank;
use crate::core::ast::{Alignment, BlockNode, TableCell, TableRow};
use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR_CELL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:?-+:?$").unwrap());

/// A header line containing `|` followed by a valid separator row.
pub fn is_table_start(lines: &[String], pos: usize) -> bool {
    match (lines.get(pos), lines.get(pos + 1)) {
        (Some(header), Some(separator)) => {
            header.contains('|')
                && separator.contains('|')
                && separator_alignments(separator).is_some()
        }
        _ => false,
    }
}

/// Splits a row on unescaped pipes. Empty leading and trailing segments
/// from outer pipes are dropped; cells are trimmed.
pub fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('\\');
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    cells.push(current);

    if cells.first().is_some_and(|c| c.trim().is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.trim().is_empty()) {
        cells.pop();
    }
    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

/// Column alignments of a separator row, or None if any cell is invalid.
pub fn separator_alignments(line: &str) -> Option<Vec<Option<Alignment>>> {
    let cells = split_row(line);
    if cells.is_empty() {
        return None;
    }
    cells
        .iter()
        .map(|cell| {
            if !SEPARATOR_CELL.is_match(cell) {
                return None;
            }
            Some(match (cell.starts_with(':'), cell.ends_with(':')) {
                (true, true) => Some(Alignment::Center),
                (true, false) => Some(Alignment::Left),
                (false, true) => Some(Alignment::Right),
                (false, false) => None,
            })
        })
        .collect()
}

pub struct TableParser;

impl TableParser {
    pub fn parse(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
        if !is_table_start(lines, pos) {
            return None;
        }
        let alignments = separator_alignments(&lines[pos + 1])?;
        let header = split_row(&lines[pos]);
        let columns = header.len();

        let mut rows = vec![Self::row(&header, &alignments, columns, true, context)];
        let mut next = pos + 2;
        while let Some(line) = lines.get(next) {
            if is_blank(line) || !line.contains('|') {
                break;
            }
            rows.push(Self::row(&split_row(line), &alignments, columns, false, context));
            next += 1;
        }
        Some((Some(BlockNode::Table { rows }), next))
    }

    /// Builds one row, padding with empty cells up to `columns`. Extra
    /// cells are kept.
    fn row(
        cells: &[String],
        alignments: &[Option<Alignment>],
        columns: usize,
        is_header: bool,
        context: &ParseContext<'_>,
    ) -> TableRow {
        let width = cells.len().max(columns);
        let cells = (0..width)
            .map(|index| TableCell {
                align: alignments.get(index).copied().flatten(),
                children: cells
                    .get(index)
                    .map(|text| InlineParser::parse(text, context))
                    .unwrap_or_default(),
            })
            .collect();
        TableRow { cells, is_header }
    }
}

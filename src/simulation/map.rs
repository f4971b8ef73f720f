//! Decoded map layouts
//!
//! A layout is a rectangular block of symbols, one per cell, plus a
//! dictionary giving each symbol its meaning. Reading map files from disk is
//! left to the caller; this module only validates and decodes.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;

use super::types::{Coordinate, Direction, DEFAULT_LIGHT_TIME_TO_CHANGE};

/// What a map symbol stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolValue {
    Road(Direction),
    /// A traffic light, starting green when `open`
    Light { open: bool, time_to_change: u32 },
    Obstacle,
    Destination,
    /// Undrivable ground with nothing on it
    Empty,
}

/// Symbol to meaning lookup
#[derive(Debug, Clone)]
pub struct SymbolDictionary {
    symbols: HashMap<char, SymbolValue>,
}

impl Default for SymbolDictionary {
    fn default() -> Self {
        Self::standard()
    }
}

impl SymbolDictionary {
    /// An empty dictionary, every symbol is unknown
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
        }
    }

    /// The dictionary used by the bundled maps
    pub fn standard() -> Self {
        let mut dictionary = Self::new();
        dictionary
            .insert('^', SymbolValue::Road(Direction::Up))
            .insert('v', SymbolValue::Road(Direction::Down))
            .insert('<', SymbolValue::Road(Direction::Left))
            .insert('>', SymbolValue::Road(Direction::Right))
            .insert(
                'S',
                SymbolValue::Light {
                    open: false,
                    time_to_change: DEFAULT_LIGHT_TIME_TO_CHANGE,
                },
            )
            .insert(
                's',
                SymbolValue::Light {
                    open: true,
                    time_to_change: DEFAULT_LIGHT_TIME_TO_CHANGE,
                },
            )
            .insert('#', SymbolValue::Obstacle)
            .insert('D', SymbolValue::Destination)
            .insert('.', SymbolValue::Empty);
        dictionary
    }

    pub fn insert(&mut self, symbol: char, value: SymbolValue) -> &mut Self {
        self.symbols.insert(symbol, value);
        self
    }

    pub fn get(&self, symbol: char) -> Option<SymbolValue> {
        self.symbols.get(&symbol).copied()
    }
}

/// A rectangular grid of map symbols, first row is the northernmost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLayout {
    rows: Vec<Vec<char>>,
}

impl MapLayout {
    /// Builds a layout, refusing empty or ragged input
    pub fn new(rows: Vec<Vec<char>>) -> Result<Self> {
        let width = match rows.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => bail!("Map has no cells"),
        };

        for (index, row) in rows.iter().enumerate() {
            if row.len() != width {
                bail!(
                    "Map row {} has {} cells, expected {}",
                    index,
                    row.len(),
                    width
                );
            }
        }

        Ok(Self { rows })
    }

    /// Splits a block of text into rows, ignoring trailing blank lines
    pub fn from_text(text: &str) -> Result<Self> {
        let mut rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.trim_end_matches('\r').chars().collect())
            .collect();

        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }

        Self::new(rows)
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Grid coordinate of the symbol at `row`, `column`
    pub fn coordinate_of(&self, row: usize, column: usize) -> Coordinate {
        Coordinate::new(column as i32, (self.height() - row - 1) as i32)
    }

    /// Resolves every symbol through the dictionary
    pub fn decode(&self, dictionary: &SymbolDictionary) -> Result<Vec<(Coordinate, SymbolValue)>> {
        let mut decoded = Vec::with_capacity(self.width() * self.height());

        for (r, row) in self.rows.iter().enumerate() {
            for (c, symbol) in row.iter().enumerate() {
                let value = dictionary.get(*symbol).with_context(|| {
                    format!("Unknown map symbol '{}' at row {}, column {}", symbol, r, c)
                })?;
                decoded.push((self.coordinate_of(r, c), value));
            }
        }

        Ok(decoded)
    }
}

use serde::{Deserialize, Serialize};

use crate::recon::Recon;

/// Raw value held by a cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() {
                return CellValue::Number(num);
            }
        }

        match trimmed {
            "true" | "TRUE" => CellValue::Bool(true),
            "false" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    /// Stringified form used for grouping and facet comparison.
    ///
    /// Empty maps to "". Whole numbers print without a fractional part so that
    /// `3` and `3.0` group together.
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Bool(b) => b.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// An immutable (value, recon) pair.
///
/// Cells are never edited in place by operations; a change builds a new
/// `Cell` and swaps it into the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recon: Option<Recon>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            recon: None,
        }
    }

    pub fn with_recon(value: CellValue, recon: Recon) -> Self {
        Self {
            value,
            recon: Some(recon),
        }
    }

    /// A cell is blank when its value is empty, regardless of recon.
    pub fn is_blank(&self) -> bool {
        self.value.is_empty()
    }
}

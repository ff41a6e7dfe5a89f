//! Model formulas and the design matrices built from them.
//!
//! Only additive formulas are supported: `response ~ a + b + c`, with an
//! implicit intercept that `- 1` or `+ 0` removes.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};

use crate::analysis::{column::Column, error::AnalysisError, types::DerivedFeatureRow};

/// Name given to the constant column.
pub const INTERCEPT: &str = "Intercept";

/// Formula used when none is configured.
pub const DEFAULT_FORMULA: &str = "confirmTime ~ hashpower_accepting + highgas2 + tx_atabove";

#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub response: Column,
    pub terms: Vec<Column>,
    pub intercept: bool,
}

impl Formula {
    pub fn parse(input: &str) -> Result<Self, AnalysisError> {
        let (lhs, rhs) = input
            .split_once('~')
            .ok_or_else(|| AnalysisError::invalid_formula(format!("missing '~' in {:?}", input)))?;

        let response_name = lhs.trim();
        if response_name.is_empty() {
            return Err(AnalysisError::invalid_formula("missing response"));
        }
        let response: Column = response_name.parse()?;

        let mut terms = Vec::new();
        let mut intercept = true;

        for (sign, token) in tokenize(rhs)? {
            match (sign, token) {
                ('-', "1") | ('+', "0") => intercept = false,
                ('+', "1") => intercept = true,
                ('-', other) => {
                    let column: Column = other.parse()?;
                    terms.retain(|c| *c != column);
                }
                (_, name) => {
                    let column: Column = name.parse()?;
                    if column == response {
                        return Err(AnalysisError::invalid_formula(format!(
                            "response {} also used as a predictor",
                            column
                        )));
                    }
                    if !terms.contains(&column) {
                        terms.push(column);
                    }
                }
            }
        }

        if terms.is_empty() && !intercept {
            return Err(AnalysisError::invalid_formula("formula has no predictors"));
        }

        Ok(Self {
            response,
            terms,
            intercept,
        })
    }

    /// Response followed by every predictor column.
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        std::iter::once(self.response).chain(self.terms.iter().copied())
    }

    /// Names of the design-matrix columns, intercept first.
    pub fn design_names(&self) -> Vec<String> {
        let intercept = self.intercept.then(|| INTERCEPT.to_string());
        intercept
            .into_iter()
            .chain(self.terms.iter().map(|c| c.name().to_string()))
            .collect()
    }
}

impl FromStr for Formula {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ ", self.response)?;
        let names: Vec<&str> = self.terms.iter().map(|c| c.name()).collect();
        if names.is_empty() {
            f.write_str("1")?;
        } else {
            f.write_str(&names.join(" + "))?;
        }
        if !self.intercept {
            f.write_str(" - 1")?;
        }
        Ok(())
    }
}

/// Split the right-hand side into signed tokens.
fn tokenize(rhs: &str) -> Result<Vec<(char, &str)>, AnalysisError> {
    let mut tokens = Vec::new();
    let mut sign = '+';
    let mut start = None;
    let mut awaiting_term = false;

    for (i, ch) in rhs.char_indices() {
        match ch {
            '+' | '-' => {
                match start.take() {
                    Some(s) => tokens.push((sign, rhs[s..i].trim())),
                    None if awaiting_term => {
                        return Err(AnalysisError::invalid_formula(format!(
                            "dangling operator near position {}",
                            i
                        )))
                    }
                    None => {}
                }
                sign = ch;
                awaiting_term = true;
            }
            c if c.is_whitespace() => {
                if let Some(s) = start {
                    // a token ends at whitespace only if another name follows
                    let rest = rhs[i..].trim_start();
                    if !rest.is_empty() && !rest.starts_with(&['+', '-'][..]) {
                        return Err(AnalysisError::invalid_formula(format!(
                            "missing operator after {:?}",
                            rhs[s..i].trim()
                        )));
                    }
                }
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                if start.is_none() {
                    start = Some(i);
                    awaiting_term = false;
                }
            }
            other => {
                return Err(AnalysisError::invalid_formula(format!(
                    "unsupported character {:?}",
                    other
                )))
            }
        }
    }

    match start {
        Some(s) => tokens.push((sign, rhs[s..].trim())),
        None => return Err(AnalysisError::invalid_formula("formula ends without a term")),
    }

    Ok(tokens)
}

/// Response vector and design matrix for one formula over one table.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub response_name: String,
    pub column_names: Vec<String>,
    pub y: DVector<f64>,
    pub x: DMatrix<f64>,
}

impl DesignMatrix {
    pub fn build(formula: &Formula, rows: &[DerivedFeatureRow]) -> Result<Self, AnalysisError> {
        if rows.is_empty() {
            return Err(AnalysisError::no_data("design matrix has no rows"));
        }

        let column_names = formula.design_names();
        let n = rows.len();
        let k = column_names.len();
        let offset = usize::from(formula.intercept);

        let mut y = DVector::zeros(n);
        let mut x = DMatrix::zeros(n, k);

        for (i, row) in rows.iter().enumerate() {
            y[i] = finite_value(row, formula.response, i)?;
            if formula.intercept {
                x[(i, 0)] = 1.0;
            }
            for (j, column) in formula.terms.iter().enumerate() {
                x[(i, j + offset)] = finite_value(row, *column, i)?;
            }
        }

        Ok(Self {
            response_name: formula.response.name().to_string(),
            column_names,
            y,
            x,
        })
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }
}

fn finite_value(row: &DerivedFeatureRow, column: Column, index: usize) -> Result<f64, AnalysisError> {
    let value = row.value(column).ok_or_else(|| AnalysisError::MissingValue {
        column: column.name().to_string(),
        row: index,
    })?;
    if !value.is_finite() {
        return Err(AnalysisError::non_finite(format!("{} in row {}", column, index)));
    }
    Ok(value)
}

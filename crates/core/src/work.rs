use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric element carried by a [`WorkItem`].
pub type Coefficient = i64;

/// An immutable ordered sequence of coefficients, lowest degree first.
///
/// Work items are created once (seeding or a completed combination) and
/// consumed whole when dispatched as an operand. There is no mutation API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItem(Vec<Coefficient>);

impl WorkItem {
    pub fn new(coefficients: Vec<Coefficient>) -> Self {
        Self(coefficients)
    }

    pub fn coefficients(&self) -> &[Coefficient] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Polynomial degree (`len - 1`), or `None` for an empty item.
    pub fn degree(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }

    pub fn into_coefficients(self) -> Vec<Coefficient> {
        self.0
    }
}

/// Renders the item as a polynomial in `x`, highest degree first,
/// e.g. `3x^2 - x + 7`. Zero terms are skipped; an all-zero item prints `0`.
impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote_any = false;
        for (power, &c) in self.0.iter().enumerate().rev() {
            if c == 0 {
                continue;
            }
            let magnitude = c.unsigned_abs();
            if wrote_any {
                f.write_str(if c < 0 { " - " } else { " + " })?;
            } else if c < 0 {
                f.write_str("-")?;
            }
            if magnitude != 1 || power == 0 {
                write!(f, "{magnitude}")?;
            }
            match power {
                0 => {}
                1 => f.write_str("x")?,
                _ => write!(f, "x^{power}")?,
            }
            wrote_any = true;
        }
        if !wrote_any {
            f.write_str("0")?;
        }
        Ok(())
    }
}

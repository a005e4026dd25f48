use crate::models::CellValue;

// ── HeaderNormalizer ──────────────────────────────────────────────────────────

/// Canonicalises raw column headers before rule matching.
pub struct HeaderNormalizer;

impl HeaderNormalizer {
    /// Trim surrounding whitespace and lowercase.
    ///
    /// ```
    /// use discount_core::data_processors::HeaderNormalizer;
    ///
    /// assert_eq!(HeaderNormalizer::normalize(" Chi_Location "), "chi_location");
    /// assert_eq!(HeaderNormalizer::normalize("DISCOUNT"), "discount");
    /// ```
    pub fn normalize(header: &str) -> String {
        header.trim().to_lowercase()
    }
}

// ── CellCoercer ───────────────────────────────────────────────────────────────

/// Converts raw cells into the typed values stored on a `DiscountRecord`.
pub struct CellCoercer;

impl CellCoercer {
    /// Coerce a cell to a finite number.
    ///
    /// * `Number` → itself
    /// * `Text`   → trimmed and parsed as `f64`
    /// * `Bool`   → `1.0` / `0.0`
    /// * `Empty`  → `None`
    ///
    /// NaN and infinities are rejected whatever their source, so a caller can
    /// treat `None` as "row fails coercion".
    pub fn to_number(cell: &CellValue) -> Option<f64> {
        let value = match cell {
            CellValue::Empty => return None,
            CellValue::Number(n) => *n,
            CellValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Coerce a cell to an optional categorical label.
    ///
    /// Blank cells yield `None`. Text is passed through untouched; whole
    /// numbers render without a fractional part so a band typed as `40` in
    /// one sheet and `"40"` in another compare equal.
    pub fn to_label(cell: &CellValue) -> Option<String> {
        match cell {
            CellValue::Empty => None,
            CellValue::Text(s) if s.is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) if n.is_nan() => None,
            CellValue::Number(n) => Some(Self::format_number(*n)),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }

    /// Render a number the way labels show it: whole values without a
    /// fractional part.
    pub fn format_number(n: f64) -> String {
        if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            format!("{}", n)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

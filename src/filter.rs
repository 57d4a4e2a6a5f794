//! Trace selection for `--select-traces` expressions
//!
//! Supports:
//! - Individual trace ids: `select=1,2,3`
//! - Inclusive ranges: `select=10-20`
//! - Everything: `select=all`

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Decides which traces get reconstructed
#[derive(Debug, Clone, Default)]
pub struct TraceIdFilter {
    /// Selected ids and ranges (None = all traces)
    include: Option<Selection>,
}

#[derive(Debug, Clone, Default)]
struct Selection {
    ids: HashSet<i64>,
    ranges: Vec<RangeInclusive<i64>>,
}

impl TraceIdFilter {
    /// Create a filter that selects every trace
    pub fn all() -> Self {
        Self { include: None }
    }

    /// Parse a selection expression like `select=1,2,3` or `select=10-20`
    pub fn from_expr(expr: &str) -> Result<Self> {
        if let Some(spec) = expr.strip_prefix("select=") {
            Self::from_select_spec(spec)
        } else {
            bail!(
                "Invalid trace selection: {}. Expected format: select=SPEC",
                expr
            );
        }
    }

    fn from_select_spec(spec: &str) -> Result<Self> {
        if spec.trim() == "all" {
            return Ok(Self::all());
        }

        let mut selection = Selection::default();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                bail!("Empty trace id in selection: {}", spec);
            }

            // A leading '-' belongs to a negative id, not a range
            let separator = part
                .char_indices()
                .skip(1)
                .find(|&(_, c)| c == '-')
                .map(|(pos, _)| pos);
            match separator {
                Some(pos) => {
                    let start = parse_id(&part[..pos])?;
                    let end = parse_id(&part[pos + 1..])?;
                    if start > end {
                        bail!("Empty trace id range: {}", part);
                    }
                    selection.ranges.push(start..=end);
                }
                None => {
                    selection.ids.insert(parse_id(part)?);
                }
            }
        }

        Ok(Self {
            include: Some(selection),
        })
    }

    /// Check whether a trace should be reconstructed
    pub fn should_process(&self, trace_id: i64) -> bool {
        match &self.include {
            None => true,
            Some(selection) => {
                selection.ids.contains(&trace_id)
                    || selection.ranges.iter().any(|r| r.contains(&trace_id))
            }
        }
    }

    /// True if the filter lets every trace through
    pub fn is_all(&self) -> bool {
        self.include.is_none()
    }
}

fn parse_id(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .with_context(|| format!("Invalid trace id: '{}'", text))
}

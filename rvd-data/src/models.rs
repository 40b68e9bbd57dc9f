//! Chart-ready output models.
//!
//! All structs derive `Serialize` so a view can be handed to the charting
//! layer as JSON.

use serde::Serialize;

/// A named pair of parallel x/y arrays, one line or bar group of a chart.
///
/// For time series `x` holds ISO dates (`YYYY-MM-DD`) in ascending order;
/// for demographic bars it holds category labels such as age groups.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Series {
    pub name: String,
    /// Sub-category the series belongs to (ward type, gender), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            color: None,
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }

    pub fn push(&mut self, x: impl Into<String>, y: f64) {
        self.x.push(x.into());
        self.y.push(y);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.y.iter().sum()
    }
}

/// A 2D numeric grid with row and column labels; `values[row][column]`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Matrix {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        self.values.get(r)?.get(c).copied()
    }
}

/// Upper and lower quartile lines for a band fill behind the plant series.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuartileBand {
    pub lower: Series,
    pub upper: Series,
    /// Translucent CSS fill colour.
    pub fill: String,
}

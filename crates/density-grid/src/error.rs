/// Errors that prevent a density grid from being built.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("no usable points to derive a grid extent from")]
    EmptyExtent,
    #[error("grid extent is not finite")]
    NonFiniteExtent,
    #[error("cell side must be positive and finite, got {side}")]
    InvalidCellSize { side: f64 },
    #[error("grid of {rows}x{cols} cells exceeds the {max} cell limit")]
    TooManyCells { rows: usize, cols: usize, max: usize },
}

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XCError {
    /// Density and output fields are not defined on the same points.
    LayoutMismatch(String),
    /// Spin-polarized input given to an unpolarized functional or vice versa.
    UnsupportedSpin,
}

impl fmt::Display for XCError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XCError::LayoutMismatch(what) => {
                write!(f, "{} does not match the density layout", what)
            }
            XCError::UnsupportedSpin => {
                write!(f, "functional does not support the requested spin configuration")
            }
        }
    }
}

impl std::error::Error for XCError {}

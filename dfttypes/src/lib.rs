mod field;
pub use field::*;

mod density;
pub use density::*;

mod wavefunction;
pub use wavefunction::*;

mod checkpoint;
pub use checkpoint::*;

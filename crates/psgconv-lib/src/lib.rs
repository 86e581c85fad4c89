pub mod detect;
pub mod filter;
pub mod io;
pub mod metrics;
pub mod segment;
pub mod signal;

pub use detect::*;
pub use filter::*;
pub use metrics::*;
pub use segment::*;
pub use signal::*;

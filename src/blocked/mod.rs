//! Cache-blocked multiply-accumulate.
//!
//! The kernel copies BLOCK_SIZE × BLOCK_SIZE tiles of the inputs into
//! aligned scratch buffers so the innermost loop works on data that is
//! already resident in cache, then runs a scalar-times-row update that the
//! compiler can vectorize.
//!
//! - `tiled`: row-band kernel used by the serial tiled path and by the
//!   static partition workers

pub mod tiled;

pub use tiled::{BLOCK_SIZE, multiply_region, multiply_region_with_block, multiply_tiled};

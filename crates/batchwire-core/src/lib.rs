//! Feature specs, typed values and the pure wire codec used by batchwire.

pub mod codec;
pub mod error;
pub mod record;
pub mod spec;
pub mod tensor;
pub mod value;

pub use codec::{decode_feature, decode_record, encode_feature, encode_record};
pub use error::*;
pub use record::*;
pub use spec::*;
pub use tensor::*;
pub use value::*;

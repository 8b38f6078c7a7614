//! Generated gRPC schemas plus the `TryFrom` conversions that turn wire
//! messages into `dikastes-core`'s transport-independent types. Keeping the
//! conversion boundary here means `dikastes-core` never has to know a
//! protobuf message exists.

pub mod authz {
    tonic::include_proto!("dikastes.authz.v1");
}

pub mod sync {
    tonic::include_proto!("dikastes.sync.v1");
}

mod convert;
mod error;

pub use convert::{check_request_from_wire, update_from_wire};
pub use error::ConversionError;
